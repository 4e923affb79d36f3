mod dataset;
mod error;
mod font;
mod model;
mod render;

use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::dataset::read_dataset;
use crate::error::VizError;
use crate::model::{true_mixture, weight_sum};
use crate::render::{write_scene, RenderSpec, ZeroPolicy, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Parser)]
#[command(name = "clusterlook")]
#[command(about = "Plot per-cell gene counts by true cluster over the reference mixture.", long_about = None)]
struct Args {
    /// Load cell observations from this FILE.
    #[arg(value_name = "INFILE")]
    infile: PathBuf,

    /// Write the plot to this FILE (format chosen by extension, e.g. PNG).
    #[arg(value_name = "OUTFIG")]
    outfig: PathBuf,

    /// How zero counts are placed on the log axes.
    #[arg(short = 'z', long = "zero-policy", value_enum, default_value_t = ZeroPolicy::Clamp)]
    zero_policy: ZeroPolicy,

    /// Set the width in pixels of the output image.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Set the height in pixels of the output image.
    #[arg(short = 'y', long = "height", value_name = "N", default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

/// Pipeline stage that failed, with its cause.
#[derive(Debug)]
struct StageError {
    stage: &'static str,
    source: VizError,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {}: {}", self.stage, self.source)
    }
}

fn stage(name: &'static str) -> impl FnOnce(VizError) -> StageError {
    move |source| StageError { stage: name, source }
}

fn run(args: &Args) -> Result<(), StageError> {
    let dataset = read_dataset(&args.infile).map_err(stage("reading observations"))?;
    if dataset.n() == 0 {
        warn!("No observations found in {:?}; plotting reference centroids only.", args.infile);
    }
    debug!("Cluster sizes: {:?}", dataset.cluster_sizes());

    let centroids = true_mixture().map_err(stage("loading reference model"))?;
    let total = weight_sum(&centroids);
    if (total - 1.0).abs() > 1e-9 {
        warn!("Reference mixture weights sum to {}, not 1", total);
    }
    for (q, c) in centroids.iter().enumerate() {
        debug!("Component {}: mean {:?}, weight {}", q, c.mean(), c.weight());
    }
    if dataset.q() != centroids.len() {
        warn!(
            "Data has {} clusters but the reference mixture has {} components",
            dataset.q(),
            centroids.len()
        );
    }
    if let Some(obs) = dataset
        .observations()
        .iter()
        .find(|o| o.label() >= centroids.len())
    {
        warn!(
            "line {}: cluster {} has no reference centroid",
            obs.line(),
            obs.label()
        );
    }

    let spec = RenderSpec::new(args.width, args.height, args.zero_policy)
        .map_err(stage("configuring plot"))?;
    write_scene(
        &dataset.counts(),
        &dataset.labels(),
        &centroids,
        &spec,
        &args.outfig,
    )
    .map_err(stage("rendering plot"))?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    info!("Starting visualization...");

    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    info!("Done.");
}
