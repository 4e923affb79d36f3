use clap::ValueEnum;
use image::{ImageError, ImageFormat, RgbImage};
use log::{debug, info};
use std::f64::consts::PI;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::dataset::{GENE_COUNT, GENE_NAMES};
use crate::error::{Result, VizError};
use crate::font::{glyph, GLYPH_SIZE};
use crate::model::MixtureComponent;

pub type Rgb = (u8, u8, u8);

/// Largest number of distinct cluster labels that can be colored.
pub const PALETTE_CAPACITY: usize = 10;

/// Outline colors for cluster labels 0..10 (xkcd names in comments).
pub const CLUSTER_PALETTE: [Rgb; PALETTE_CAPACITY] = [
    (249, 115, 6),   // orange
    (110, 117, 14),  // olive
    (6, 154, 243),   // azure
    (207, 98, 117),  // rose
    (206, 179, 1),   // mustard
    (255, 176, 124), // peach
    (6, 194, 172),   // turquoise
    (199, 159, 239), // lavender
    (168, 60, 9),    // rust
    (229, 0, 0),     // red
];

/// Where a zero count lands on a log axis under [`ZeroPolicy::Clamp`].
pub const ZERO_FLOOR: f64 = 0.5;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const MIN_WIDTH: u32 = 200;
pub const MIN_HEIGHT: u32 = 150;

pub const WHITE: Rgb = (255, 255, 255);
pub const BLACK: Rgb = (0, 0, 0);

const MARGIN_LEFT: u32 = 84;
const MARGIN_RIGHT: u32 = 24;
const MARGIN_TOP: u32 = 24;
const MARGIN_BOTTOM: u32 = 60;

const MARKER_RADIUS: f64 = 5.0;
const MARKER_EDGE: f64 = 1.5;
const STAR_RADIUS: f64 = 6.0;
const STAR_INNER_RATIO: f64 = 0.4;

const MAJOR_TICK: i64 = 6;
const MINOR_TICK: i64 = 3;
const TICK_CHAR_SIZE: u32 = 8;
const LABEL_CHAR_SIZE: u32 = 16;

/// Fraction of the log span added on both sides of an axis.
const AXIS_PAD: f64 = 0.05;

/// How a zero coordinate is placed on a logarithmic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ZeroPolicy {
    /// Draw zero counts at [`ZERO_FLOOR`].
    #[default]
    Clamp,
    /// Fail the render when any coordinate is zero.
    Reject,
}

/// Color and coordinate rules for one render.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub width: u32,
    pub height: u32,
    pub zero_policy: ZeroPolicy,
    pub palette: &'static [Rgb],
    pub axis_names: [&'static str; GENE_COUNT],
}

impl Default for RenderSpec {
    fn default() -> Self {
        RenderSpec {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            zero_policy: ZeroPolicy::default(),
            palette: &CLUSTER_PALETTE,
            axis_names: GENE_NAMES,
        }
    }
}

impl RenderSpec {
    pub fn new(width: u32, height: u32, zero_policy: ZeroPolicy) -> Result<Self> {
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            return Err(VizError::validation(format!(
                "image size {}x{} is below the minimum {}x{}",
                width, height, MIN_WIDTH, MIN_HEIGHT
            )));
        }
        Ok(RenderSpec {
            width,
            height,
            zero_policy,
            ..RenderSpec::default()
        })
    }

    /// Outline color for a cluster label.
    pub fn color_for(&self, label: usize) -> Result<Rgb> {
        self.palette.get(label).copied().ok_or_else(|| {
            VizError::validation(format!(
                "cluster label {} exceeds the palette capacity of {} colors",
                label,
                self.palette.len()
            ))
        })
    }

    /// Apply the zero policy to a count headed for a log axis.
    fn log_coordinate(&self, value: f64, what: impl FnOnce() -> String) -> Result<f64> {
        if value > 0.0 {
            return Ok(value);
        }
        match self.zero_policy {
            ZeroPolicy::Clamp => Ok(ZERO_FLOOR),
            ZeroPolicy::Reject => Err(VizError::validation(format!(
                "{} is {}, which has no position on a log axis",
                what(),
                value
            ))),
        }
    }

    fn axis_label(&self, axis: usize) -> String {
        format!("{} (counts)", self.axis_names[axis])
    }
}

/// A log10 axis range, stored as exponents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogAxis {
    lo: f64,
    hi: f64,
}

impl LogAxis {
    /// Whole decades around `values` (at least one), padded on both sides.
    /// With no values the axis spans 1..100.
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in values {
            let l = v.log10();
            min = min.min(l);
            max = max.max(l);
        }
        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 2.0;
        }
        let lo = min.floor();
        let mut hi = max.ceil();
        if hi - lo < 1.0 {
            hi = lo + 1.0;
        }
        let pad = (hi - lo) * AXIS_PAD;
        LogAxis {
            lo: lo - pad,
            hi: hi + pad,
        }
    }

    fn fraction(&self, value: f64) -> f64 {
        (value.log10() - self.lo) / (self.hi - self.lo)
    }

    fn contains(&self, value: f64) -> bool {
        (self.lo..=self.hi).contains(&value.log10())
    }

    /// Exponents of the powers of ten inside the range.
    pub fn decades(&self) -> RangeInclusive<i32> {
        self.lo.ceil() as i32..=self.hi.floor() as i32
    }

    /// Values at 2..9 times each decade that fall inside the range.
    fn minor_ticks(&self) -> Vec<f64> {
        let mut ticks = Vec::new();
        for k in (self.lo.floor() as i32)..=(self.hi.ceil() as i32) {
            for m in 2..=9 {
                let v = m as f64 * 10f64.powi(k);
                if self.contains(v) {
                    ticks.push(v);
                }
            }
        }
        ticks
    }
}

/// Text for the major tick at 10^k.
fn decade_label(k: i32) -> String {
    match k {
        0..=5 => 10u64.pow(k as u32).to_string(),
        -1 => "0.1".to_string(),
        -2 => "0.01".to_string(),
        -3 => "0.001".to_string(),
        _ => format!("1e{}", k),
    }
}

/// Pixel placement of the plotting area and its two axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotFrame {
    pub x: LogAxis,
    pub y: LogAxis,
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
}

impl PlotFrame {
    fn new(spec: &RenderSpec, points: &[[f64; GENE_COUNT]]) -> Self {
        PlotFrame {
            x: LogAxis::fit(points.iter().map(|p| p[0])),
            y: LogAxis::fit(points.iter().map(|p| p[1])),
            left: MARGIN_LEFT as i64,
            right: (spec.width - MARGIN_RIGHT) as i64 - 1,
            top: MARGIN_TOP as i64,
            bottom: (spec.height - MARGIN_BOTTOM) as i64 - 1,
        }
    }

    fn x_pixel(&self, value: f64) -> i64 {
        let span = (self.right - self.left) as f64;
        (self.left as f64 + self.x.fraction(value) * span).round() as i64
    }

    fn y_pixel(&self, value: f64) -> i64 {
        let span = (self.bottom - self.top) as f64;
        (self.bottom as f64 - self.y.fraction(value) * span).round() as i64
    }

    /// Pixel center of a positive (gene 0, gene 1) point.
    pub fn to_pixel(&self, point: [f64; GENE_COUNT]) -> (i64, i64) {
        (self.x_pixel(point[0]), self.y_pixel(point[1]))
    }
}

/// RGB raster, row-major, three bytes per pixel.
struct Canvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Canvas {
            width,
            height,
            buffer: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    fn set_pixel(&mut self, x: i64, y: i64, (r, g, b): Rgb) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        self.buffer[idx] = r;
        self.buffer[idx + 1] = g;
        self.buffer[idx + 2] = b;
    }

    fn fill_block(&mut self, x: i64, y: i64, size: i64, rgb: Rgb) {
        for dy in 0..size {
            for dx in 0..size {
                self.set_pixel(x + dx, y + dy, rgb);
            }
        }
    }

    fn hline(&mut self, x0: i64, x1: i64, y: i64, rgb: Rgb) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.set_pixel(x, y, rgb);
        }
    }

    fn vline(&mut self, x: i64, y0: i64, y1: i64, rgb: Rgb) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.set_pixel(x, y, rgb);
        }
    }

    /// Ring of width `MARKER_EDGE` around a white disc.
    fn open_circle(&mut self, (cx, cy): (i64, i64), edge: Rgb) {
        let reach = MARKER_RADIUS.ceil() as i64;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                if d <= MARKER_RADIUS - MARKER_EDGE {
                    self.set_pixel(cx + dx, cy + dy, WHITE);
                } else if d <= MARKER_RADIUS {
                    self.set_pixel(cx + dx, cy + dy, edge);
                }
            }
        }
    }

    /// Filled five-pointed star, one point straight up.
    fn star(&mut self, (cx, cy): (i64, i64), rgb: Rgb) {
        let vertices: Vec<(f64, f64)> = (0..10)
            .map(|i| {
                let angle = -PI / 2.0 + i as f64 * PI / 5.0;
                let r = if i % 2 == 0 {
                    STAR_RADIUS
                } else {
                    STAR_RADIUS * STAR_INNER_RATIO
                };
                (r * angle.cos(), r * angle.sin())
            })
            .collect();
        let reach = STAR_RADIUS.ceil() as i64;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if inside_polygon(dx as f64, dy as f64, &vertices) {
                    self.set_pixel(cx + dx, cy + dy, rgb);
                }
            }
        }
    }

    /// Left-to-right text with its top-left corner at (x, y).
    fn text(&mut self, x: i64, y: i64, text: &str, char_size: u32, rgb: Rgb) {
        let ratio = (char_size / GLYPH_SIZE) as i64;
        for (i, c) in text.chars().enumerate() {
            let base_x = x + i as i64 * char_size as i64;
            for (j, row) in glyph(c).iter().enumerate() {
                for z in (0..8i64).rev() {
                    if (row >> z) & 1 == 1 {
                        let px = base_x + (7 - z) * ratio;
                        let py = y + j as i64 * ratio;
                        self.fill_block(px, py, ratio, rgb);
                    }
                }
            }
        }
    }

    /// Text rotated a quarter turn counter-clockwise, reading upward from
    /// its bottom-left corner at (x, y).
    fn text_vertical(&mut self, x: i64, y: i64, text: &str, char_size: u32, rgb: Rgb) {
        let ratio = (char_size / GLYPH_SIZE) as i64;
        for (i, c) in text.chars().enumerate() {
            let cell_top = y - (i as i64 + 1) * char_size as i64;
            for (j, row) in glyph(c).iter().enumerate() {
                for z in (0..8i64).rev() {
                    if (row >> z) & 1 == 1 {
                        let col = 7 - z;
                        let px = x + j as i64 * ratio;
                        let py = cell_top + (7 - col) * ratio;
                        self.fill_block(px, py, ratio, rgb);
                    }
                }
            }
        }
    }

    fn into_image(self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.buffer)
            .ok_or_else(|| VizError::validation("pixel buffer does not match image size"))
    }
}

/// Even-odd rule point-in-polygon test.
fn inside_polygon(x: f64, y: f64, vertices: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn text_width(text: &str, char_size: u32) -> i64 {
    text.chars().count() as i64 * char_size as i64
}

fn draw_axes(canvas: &mut Canvas, frame: &PlotFrame, spec: &RenderSpec) {
    canvas.hline(frame.left, frame.right, frame.top, BLACK);
    canvas.hline(frame.left, frame.right, frame.bottom, BLACK);
    canvas.vline(frame.left, frame.top, frame.bottom, BLACK);
    canvas.vline(frame.right, frame.top, frame.bottom, BLACK);

    for v in frame.x.minor_ticks() {
        let px = frame.x_pixel(v);
        canvas.vline(px, frame.bottom, frame.bottom + MINOR_TICK, BLACK);
    }
    for v in frame.y.minor_ticks() {
        let py = frame.y_pixel(v);
        canvas.hline(frame.left - MINOR_TICK, frame.left, py, BLACK);
    }

    let tick_text_gap = 4;
    for k in frame.x.decades() {
        let px = frame.x_pixel(10f64.powi(k));
        canvas.vline(px, frame.bottom, frame.bottom + MAJOR_TICK, BLACK);
        let label = decade_label(k);
        let w = text_width(&label, TICK_CHAR_SIZE);
        canvas.text(
            px - w / 2,
            frame.bottom + MAJOR_TICK + tick_text_gap,
            &label,
            TICK_CHAR_SIZE,
            BLACK,
        );
    }
    for k in frame.y.decades() {
        let py = frame.y_pixel(10f64.powi(k));
        canvas.hline(frame.left - MAJOR_TICK, frame.left, py, BLACK);
        let label = decade_label(k);
        let w = text_width(&label, TICK_CHAR_SIZE);
        canvas.text(
            frame.left - MAJOR_TICK - tick_text_gap - w,
            py - TICK_CHAR_SIZE as i64 / 2,
            &label,
            TICK_CHAR_SIZE,
            BLACK,
        );
    }

    let x_label = spec.axis_label(0);
    let w = text_width(&x_label, LABEL_CHAR_SIZE);
    canvas.text(
        (frame.left + frame.right) / 2 - w / 2,
        frame.bottom + MAJOR_TICK + tick_text_gap + TICK_CHAR_SIZE as i64 + 10,
        &x_label,
        LABEL_CHAR_SIZE,
        BLACK,
    );

    let y_label = spec.axis_label(1);
    let h = text_width(&y_label, LABEL_CHAR_SIZE);
    canvas.text_vertical(8, (frame.top + frame.bottom) / 2 + h / 2, &y_label, LABEL_CHAR_SIZE, BLACK);
}

/// A rendered plot and the layout its pixels were placed with.
#[derive(Debug)]
pub struct Scene {
    pub image: RgbImage,
    pub frame: PlotFrame,
}

/// Rasterize observations (open circles colored by label) and reference
/// centroids (black stars) on log-log axes.
///
/// All inputs are checked before anything is drawn.
pub fn render_scene(
    counts: &[[u64; GENE_COUNT]],
    labels: &[usize],
    centroids: &[MixtureComponent],
    spec: &RenderSpec,
) -> Result<Scene> {
    if labels.len() != counts.len() {
        return Err(VizError::validation(format!(
            "{} cluster labels given for {} observations",
            labels.len(),
            counts.len()
        )));
    }

    let mut markers = Vec::with_capacity(counts.len());
    for (i, (row, &label)) in counts.iter().zip(labels).enumerate() {
        let color = spec.color_for(label)?;
        let mut point = [0.0; GENE_COUNT];
        for g in 0..GENE_COUNT {
            point[g] = spec.log_coordinate(row[g] as f64, || {
                format!("{} count of observation {}", spec.axis_names[g], i + 1)
            })?;
        }
        markers.push((point, color));
    }

    let mut stars = Vec::with_capacity(centroids.len());
    for (q, component) in centroids.iter().enumerate() {
        let mean = component.mean();
        let mut point = [0.0; GENE_COUNT];
        for g in 0..GENE_COUNT {
            point[g] = spec.log_coordinate(mean[g], || {
                format!("{} mean of mixture component {}", spec.axis_names[g], q)
            })?;
        }
        stars.push(point);
    }

    let all_points: Vec<[f64; GENE_COUNT]> = markers
        .iter()
        .map(|(p, _)| *p)
        .chain(stars.iter().copied())
        .collect();
    let frame = PlotFrame::new(spec, &all_points);
    debug!(
        "Axis decades: x {:?}, y {:?}",
        frame.x.decades(),
        frame.y.decades()
    );

    let mut canvas = Canvas::new(spec.width, spec.height);
    draw_axes(&mut canvas, &frame, spec);
    for (point, color) in &markers {
        canvas.open_circle(frame.to_pixel(*point), *color);
    }
    for point in &stars {
        canvas.star(frame.to_pixel(*point), BLACK);
    }
    debug!("Drew {} observations and {} centroids", markers.len(), stars.len());

    Ok(Scene {
        image: canvas.into_image()?,
        frame,
    })
}

/// Image encoding implied by the extension of `path`.
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    let format = ImageFormat::from_path(path).map_err(|_| {
        VizError::validation(format!("cannot determine an image format for {:?}", path))
    })?;
    if !format.writing_enabled() {
        return Err(VizError::validation(format!(
            "writing {:?} images is not supported",
            format
        )));
    }
    Ok(format)
}

/// Render the plot and write it to `path`.
///
/// Nothing is created at `path` unless the whole image was encoded.
pub fn write_scene(
    counts: &[[u64; GENE_COUNT]],
    labels: &[usize],
    centroids: &[MixtureComponent],
    spec: &RenderSpec,
    path: &Path,
) -> Result<()> {
    let format = output_format(path)?;
    info!("Rendering image...");
    let scene = render_scene(counts, labels, centroids, spec)?;
    info!("Saving to {:?}...", path);
    save_atomically(&scene.image, path, format)
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn save_atomically(image: &RgbImage, path: &Path, format: ImageFormat) -> Result<()> {
    let tmp = temporary_path(path);
    if let Err(e) = image.save_with_format(&tmp, format) {
        let _ = fs::remove_file(&tmp);
        return Err(match e {
            ImageError::IoError(io) => VizError::Io(io),
            other => VizError::Image(other),
        });
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_dataset;
    use crate::model::{true_mixture, TRUE_MEANS};
    use std::io::Cursor;

    fn pixel(image: &RgbImage, (x, y): (i64, i64)) -> Rgb {
        let p = image.get_pixel(x as u32, y as u32).0;
        (p[0], p[1], p[2])
    }

    fn below(center: (i64, i64), by: i64) -> (i64, i64) {
        (center.0, center.1 + by)
    }

    #[test]
    fn scenario_places_circles_and_stars() {
        let ds = parse_dataset(Cursor::new("# comment\nx 0 3 100\nx 2 30 30\n")).unwrap();
        let spec = RenderSpec::default();
        let scene = render_scene(&ds.counts(), &ds.labels(), &true_mixture().unwrap(), &spec).unwrap();

        let first = scene.frame.to_pixel([3.0, 100.0]);
        let second = scene.frame.to_pixel([30.0, 30.0]);
        // Each observation sits under a star; its ring still shows below the star.
        assert_eq!(pixel(&scene.image, below(first, 4)), CLUSTER_PALETTE[0]);
        assert_eq!(pixel(&scene.image, below(second, 4)), CLUSTER_PALETTE[2]);
        for mean in TRUE_MEANS {
            assert_eq!(pixel(&scene.image, scene.frame.to_pixel(mean)), BLACK);
        }
    }

    #[test]
    fn circles_are_open() {
        let spec = RenderSpec::default();
        let scene = render_scene(&[[10, 10]], &[1], &true_mixture().unwrap(), &spec).unwrap();
        let (cx, cy) = scene.frame.to_pixel([10.0, 10.0]);
        assert_eq!(pixel(&scene.image, (cx, cy)), WHITE);
        assert_eq!(pixel(&scene.image, (cx + 4, cy)), CLUSTER_PALETTE[1]);
        assert_eq!(pixel(&scene.image, (cx, cy - 5)), CLUSTER_PALETTE[1]);
        assert_eq!(pixel(&scene.image, (cx + 7, cy)), WHITE);
    }

    #[test]
    fn empty_dataset_draws_only_stars() {
        let spec = RenderSpec::default();
        let scene = render_scene(&[], &[], &true_mixture().unwrap(), &spec).unwrap();
        for mean in TRUE_MEANS {
            assert_eq!(pixel(&scene.image, scene.frame.to_pixel(mean)), BLACK);
        }
        assert!(scene
            .image
            .pixels()
            .all(|p| p.0 == [255, 255, 255] || p.0 == [0, 0, 0]));
    }

    #[test]
    fn nothing_to_plot_spans_two_decades() {
        let spec = RenderSpec::default();
        let scene = render_scene(&[], &[], &[], &spec).unwrap();
        assert_eq!(scene.frame.x.decades(), 0..=2);
        assert_eq!(scene.frame.y.decades(), 0..=2);
    }

    #[test]
    fn label_beyond_palette_is_rejected() {
        let spec = RenderSpec::default();
        let err = render_scene(&[[1, 1]], &[PALETTE_CAPACITY], &[], &spec).unwrap_err();
        assert!(matches!(err, VizError::Validation(_)));
        assert!(render_scene(&[[1, 1]], &[PALETTE_CAPACITY - 1], &[], &spec).is_ok());
    }

    #[test]
    fn label_count_must_match() {
        let spec = RenderSpec::default();
        let err = render_scene(&[[1, 1], [2, 2]], &[0], &[], &spec).unwrap_err();
        assert!(err.to_string().contains("1 cluster labels given for 2 observations"));
    }

    #[test]
    fn zero_counts_follow_policy() {
        let clamp = RenderSpec::default();
        let scene = render_scene(&[[0, 10]], &[3], &[], &clamp).unwrap();
        let center = scene.frame.to_pixel([ZERO_FLOOR, 10.0]);
        assert_eq!(pixel(&scene.image, (center.0 + 4, center.1)), CLUSTER_PALETTE[3]);

        let reject = RenderSpec::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, ZeroPolicy::Reject).unwrap();
        let err = render_scene(&[[5, 5], [0, 10]], &[3, 3], &[], &reject).unwrap_err();
        assert!(matches!(err, VizError::Validation(_)));
        assert!(err.to_string().contains("defA count of observation 2"));

        let zero_mean = MixtureComponent::new(&[3.0, 0.0], 0.5).unwrap();
        let err = render_scene(&[], &[], &[zero_mean], &reject).unwrap_err();
        assert!(err.to_string().contains("kilA mean of mixture component 0"));
    }

    #[test]
    fn axis_range_covers_data_decades() {
        let axis = LogAxis::fit([3.0, 100.0, 30.0].into_iter());
        assert_eq!(axis.decades(), 0..=2);
        assert!(axis.contains(1.0) && axis.contains(100.0));
        assert!(axis.fraction(3.0) > 0.0 && axis.fraction(100.0) < 1.0);

        let single = LogAxis::fit([10.0].into_iter());
        assert_eq!(single.decades(), 1..=2);

        // Padding pulls 0.9 onto the axis below the first decade.
        let minor = LogAxis::fit([1.0, 10.0].into_iter()).minor_ticks();
        assert_eq!(minor.len(), 9);
        assert!(minor.iter().any(|v| (v - 0.9).abs() < 1e-12));
        assert!(minor.iter().all(|v| *v < 10.0));
    }

    #[test]
    fn decade_labels() {
        assert_eq!(decade_label(0), "1");
        assert_eq!(decade_label(2), "100");
        assert_eq!(decade_label(-1), "0.1");
        assert_eq!(decade_label(-3), "0.001");
        assert_eq!(decade_label(7), "1e7");
        assert_eq!(decade_label(-4), "1e-4");
    }

    #[test]
    fn axis_labels_are_drawn() {
        let spec = RenderSpec::default();
        let scene = render_scene(&[], &[], &true_mixture().unwrap(), &spec).unwrap();
        let bottom_text = (spec.height - 30..spec.height)
            .flat_map(|y| (0..spec.width).map(move |x| (x, y)))
            .any(|(x, y)| scene.image.get_pixel(x, y).0 == [0, 0, 0]);
        assert!(bottom_text);
        let left_text = (0..24)
            .flat_map(|x| (0..spec.height).map(move |y| (x, y)))
            .any(|(x, y)| scene.image.get_pixel(x, y).0 == [0, 0, 0]);
        assert!(left_text);
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        assert!(RenderSpec::new(100, 480, ZeroPolicy::Clamp).is_err());
        assert!(RenderSpec::new(MIN_WIDTH, MIN_HEIGHT, ZeroPolicy::Clamp).is_ok());
    }

    #[test]
    fn repeated_renders_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let counts = [[3, 100], [30, 30], [0, 7]];
        let labels = [0, 2, 9];
        let spec = RenderSpec::default();
        write_scene(&counts, &labels, &true_mixture().unwrap(), &spec, &a).unwrap();
        write_scene(&counts, &labels, &true_mixture().unwrap(), &spec, &b).unwrap();
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn written_image_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.png");
        write_scene(&[], &[], &true_mixture().unwrap(), &RenderSpec::default(), &out).unwrap();
        let decoded = image::open(&out).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert!(!temporary_path(&out).exists());
    }

    #[test]
    fn failed_renders_leave_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bad.png");
        let err = write_scene(&[[1, 1]], &[10], &[], &RenderSpec::default(), &out).unwrap_err();
        assert!(matches!(err, VizError::Validation(_)));
        assert!(!out.exists());
        assert!(!temporary_path(&out).exists());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plot.xyz");
        let err = write_scene(&[], &[], &[], &RenderSpec::default(), &out).unwrap_err();
        assert!(matches!(err, VizError::Validation(_)));
        assert!(!out.exists());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("no/such/dir/plot.png");
        let err = write_scene(&[], &[], &[], &RenderSpec::default(), &out).unwrap_err();
        assert!(matches!(err, VizError::Io(_)));
    }
}
