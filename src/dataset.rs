use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use crate::error::{Result, VizError};

/// Number of genes measured per cell. Everything downstream is two-dimensional.
pub const GENE_COUNT: usize = 2;

/// Gene identifiers, in count-column order.
pub const GENE_NAMES: [&str; GENE_COUNT] = ["defA", "kilA"];

/// Field index of the cluster label; the gene counts follow it.
const LABEL_FIELD: usize = 1;

/// One cell: its true cluster and its gene counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    line: usize,
    label: usize,
    counts: [u64; GENE_COUNT],
}

impl Observation {
    pub fn new(line: usize, label: usize, counts: &[u64]) -> Result<Self> {
        let counts: [u64; GENE_COUNT] = counts.try_into().map_err(|_| {
            VizError::validation(format!(
                "observation at line {} has {} gene counts, expected {}",
                line,
                counts.len(),
                GENE_COUNT
            ))
        })?;
        Ok(Observation { line, label, counts })
    }

    /// 1-based line of the source file this observation came from.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn label(&self) -> usize {
        self.label
    }

    pub fn counts(&self) -> [u64; GENE_COUNT] {
        self.counts
    }
}

/// All parsed observations, in file order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
    q: usize,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        // Q comes from the largest label, so gaps in the label range still count.
        let q = observations
            .iter()
            .map(|o| o.label)
            .max()
            .map_or(0, |m| m.saturating_add(1));
        Dataset { observations, q }
    }

    /// Number of observations (N).
    pub fn n(&self) -> usize {
        self.observations.len()
    }

    /// Length of every count vector (G).
    pub fn g(&self) -> usize {
        GENE_COUNT
    }

    /// Number of clusters (Q), one more than the largest label.
    pub fn q(&self) -> usize {
        self.q
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn labels(&self) -> Vec<usize> {
        self.observations.iter().map(Observation::label).collect()
    }

    /// The (N, G) count matrix, one row per observation.
    pub fn counts(&self) -> Vec<[u64; GENE_COUNT]> {
        self.observations.iter().map(Observation::counts).collect()
    }

    /// Observations per label present in the data, by ascending label.
    /// Labels in `0..Q` that never occur have no entry.
    pub fn cluster_sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for obs in &self.observations {
            *sizes.entry(obs.label).or_insert(0) += 1;
        }
        sizes
    }
}

/// Read an observations table from a file.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    info!("Loading observations from {:?}...", path);
    let file = File::open(path)?;
    let dataset = parse_dataset(BufReader::new(file))?;
    info!(
        "Found {} observations over {} clusters ({} genes)",
        dataset.n(),
        dataset.q(),
        dataset.g()
    );
    Ok(dataset)
}

/// Parse an observations table.
///
/// Lines starting with `#` are comments and blank lines are skipped. Every
/// other line needs at least four whitespace-separated fields: an ignored
/// identifier, the cluster label, then one count per gene. Trailing fields
/// are ignored.
pub fn parse_dataset<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut observations = Vec::new();
    let mut comments = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => VizError::parse(line_no, "line is not valid UTF-8", ""),
            _ => VizError::Io(e),
        })?;
        if line.starts_with('#') {
            comments += 1;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        observations.push(parse_record(line_no, &line)?);
    }

    debug!("Skipped {} comment lines", comments);
    Ok(Dataset::new(observations))
}

fn parse_record(line_no: usize, line: &str) -> Result<Observation> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let needed = LABEL_FIELD + 1 + GENE_COUNT;
    if fields.len() < needed {
        return Err(VizError::parse(
            line_no,
            format!("expected at least {} fields, found {}", needed, fields.len()),
            line,
        ));
    }

    let label: u32 = fields[LABEL_FIELD].parse().map_err(|_| {
        VizError::parse(
            line_no,
            format!(
                "cluster label {:?} is not an integer in 0..={}",
                fields[LABEL_FIELD],
                u32::MAX
            ),
            line,
        )
    })?;

    let mut counts = [0u64; GENE_COUNT];
    for (g, count) in counts.iter_mut().enumerate() {
        let field = fields[LABEL_FIELD + 1 + g];
        *count = field.parse().map_err(|_| {
            VizError::parse(
                line_no,
                format!("{} count {:?} is not a non-negative integer", GENE_NAMES[g], field),
                line,
            )
        })?;
    }

    Observation::new(line_no, label as usize, &counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn parse(text: &str) -> Result<Dataset> {
        parse_dataset(Cursor::new(text))
    }

    #[test]
    fn comment_only_file_is_empty() {
        let ds = parse("# header\n#another one\n").unwrap();
        assert_eq!(ds.n(), 0);
        assert_eq!(ds.q(), 0);
        assert_eq!(ds.g(), 2);
        assert!(ds.cluster_sizes().is_empty());
    }

    #[test]
    fn q_counts_absent_labels() {
        let ds = parse("# comment\nx 0 3 100\nx 2 30 30\n").unwrap();
        assert_eq!(ds.n(), 2);
        assert_eq!(ds.g(), 2);
        assert_eq!(ds.q(), 3);
        assert_eq!(ds.labels(), vec![0, 2]);
        assert_eq!(ds.counts(), vec![[3, 100], [30, 30]]);
        assert_eq!(ds.cluster_sizes(), BTreeMap::from([(0, 1), (2, 1)]));
        assert!(ds.labels().iter().all(|&c| c < ds.q()));
    }

    #[test]
    fn extra_fields_and_blank_lines_are_ignored() {
        let ds = parse("cell1\t1\t5\t7\textra stuff\n\n   \ncell2 4 0 12\n").unwrap();
        assert_eq!(ds.n(), 2);
        assert_eq!(ds.q(), 5);
        assert_eq!(ds.observations()[0].counts(), [5, 7]);
        assert_eq!(ds.observations()[1].line(), 4);
        assert_eq!(ds.observations()[1].label(), 4);
    }

    #[test]
    fn only_column_zero_starts_a_comment() {
        let err = parse("  # not a comment\n").unwrap_err();
        assert!(matches!(err, VizError::Parse { line: 1, .. }));
    }

    #[test]
    fn missing_field_reports_line() {
        let err = parse("# c\nx 0 3 100\nx 1 3\n").unwrap_err();
        match err {
            VizError::Parse { line, reason, text } => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected at least 4 fields"));
                assert_eq!(text, "x 1 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_integer_fields_are_rejected() {
        let err = parse("x one 3 4\n").unwrap_err();
        assert!(matches!(err, VizError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("cluster label"));

        let err = parse("x 0 3 4.5\n").unwrap_err();
        assert!(err.to_string().contains("kilA count"));

        let err = parse("x -1 3 4\n").unwrap_err();
        assert!(matches!(err, VizError::Parse { .. }));

        let err = parse("x 0 -3 4\n").unwrap_err();
        assert!(err.to_string().contains("defA count"));
    }

    #[test]
    fn oversized_label_is_a_parse_error() {
        let err = parse(&format!("x 0 3 3\nx {} 3 3\n", usize::MAX)).unwrap_err();
        match err {
            VizError::Parse { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("cluster label"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn largest_label_sets_q_without_overflow() {
        let ds = parse(&format!("x 0 3 3\nx {} 3 3\n", u32::MAX)).unwrap();
        assert_eq!(ds.q(), u32::MAX as usize + 1);
        let sizes = ds.cluster_sizes();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[&(u32::MAX as usize)], 1);
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let err = parse_dataset(Cursor::new(b"x 0 3 3\nx \xff 1 1\n".to_vec())).unwrap_err();
        assert!(matches!(err, VizError::Parse { line: 2, .. }));
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn observation_rejects_wrong_dimension() {
        let err = Observation::new(7, 0, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, VizError::Validation(_)));
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# cell type defA kilA").unwrap();
        writeln!(file, "c0 3 3 3").unwrap();
        writeln!(file, "c1 4 100 3").unwrap();
        let ds = read_dataset(file.path()).unwrap();
        assert_eq!(ds.n(), 2);
        assert_eq!(ds.q(), 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(&dir.path().join("nope.tbl")).unwrap_err();
        assert!(matches!(err, VizError::Io(_)));
    }
}
