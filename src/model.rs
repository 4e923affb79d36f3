use crate::dataset::GENE_COUNT;
use crate::error::{Result, VizError};

/// Number of components in the reference mixture.
pub const TRUE_COMPONENTS: usize = 5;

/// Mixture coefficients of the reference model, by cluster index.
pub const TRUE_WEIGHTS: [f64; TRUE_COMPONENTS] = [0.1, 0.2, 0.4, 0.2, 0.1];

/// Mean counts of the reference model, by cluster index then gene.
pub const TRUE_MEANS: [[f64; GENE_COUNT]; TRUE_COMPONENTS] = [
    [3.0, 100.0],
    [100.0, 100.0],
    [30.0, 30.0],
    [3.0, 3.0],
    [100.0, 3.0],
];

/// One mixture component: a centroid and its mixture coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureComponent {
    mean: [f64; GENE_COUNT],
    weight: f64,
}

impl MixtureComponent {
    pub fn new(mean: &[f64], weight: f64) -> Result<Self> {
        let mean: [f64; GENE_COUNT] = mean.try_into().map_err(|_| {
            VizError::validation(format!(
                "mixture mean has {} dimensions but observations have {}",
                mean.len(),
                GENE_COUNT
            ))
        })?;
        if let Some(bad) = mean.iter().find(|m| !m.is_finite() || **m < 0.0) {
            return Err(VizError::validation(format!(
                "mixture mean {} is not a finite non-negative count",
                bad
            )));
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(VizError::validation(format!(
                "mixture weight {} is outside [0, 1]",
                weight
            )));
        }
        Ok(MixtureComponent { mean, weight })
    }

    pub fn mean(&self) -> [f64; GENE_COUNT] {
        self.mean
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// The ground-truth mixture the data were sampled from. Component `q`
/// corresponds to cluster label `q`.
pub fn true_mixture() -> Result<Vec<MixtureComponent>> {
    TRUE_MEANS
        .iter()
        .zip(TRUE_WEIGHTS.iter())
        .map(|(mean, &weight)| MixtureComponent::new(mean, weight))
        .collect()
}

pub fn weight_sum(components: &[MixtureComponent]) -> f64 {
    components.iter().map(|c| c.weight).sum()
}
