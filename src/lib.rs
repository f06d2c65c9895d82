//! Cocolens: aggregation and sampling over COCO-style annotations.
//!
//! Cocolens reads a corpus of per-object annotation records and derives
//! compact, visualization-ready summaries from it: a best-example image,
//! per-category statistics, spatial density grids, log-scale size histograms,
//! a category co-occurrence graph, a stratified sample and pose statistics.
//!
//! # Modules
//!
//! - [`ir`]: Dataset model and the COCO JSON reader
//! - [`index`]: Id resolution and per-image grouping shared by every pass
//! - [`candidate`]: Multi-criteria best-example selection
//! - [`stats`]: Per-category running statistics
//! - [`spatial`]: Density grids over normalized box centers
//! - [`histogram`]: Log-scale size histograms
//! - [`graph`]: Category co-occurrence graph
//! - [`sample`]: Quota-balanced stratified sampling
//! - [`pose`]: Person keypoint statistics
//! - [`overview`]: The combined spatial overview bundle
//! - [`output`]: JSON output
//! - [`error`]: Error types for cocolens operations

pub mod candidate;
pub mod error;
pub mod graph;
pub mod histogram;
pub mod index;
pub mod ir;
pub mod output;
pub mod overview;
pub mod pose;
pub mod sample;
pub mod spatial;
pub mod stats;

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

pub use error::CocolensError;

/// The cocolens CLI application.
#[derive(Parser)]
#[command(name = "cocolens")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Pick the image that best shows people among varied objects.
    Candidate(CandidateArgs),
    /// Category statistics, density grids, size histograms and a sample.
    Overview(OverviewArgs),
    /// Category co-occurrence graph.
    Graph(GraphArgs),
    /// Mean pose and keypoint visibility from person keypoints.
    Pose(PoseArgs),
}

/// Where and how results are written.
#[derive(clap::Args)]
struct OutputArgs {
    /// Write JSON to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output format for stdout ('text' or 'json').
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    output: String,
}

#[derive(clap::Args)]
struct CandidateArgs {
    /// COCO instances JSON file.
    input: PathBuf,

    /// COCO person-keypoints file to take poses from.
    #[arg(long)]
    keypoints: Option<PathBuf>,

    /// COCO captions file.
    #[arg(long)]
    captions: Option<PathBuf>,

    /// Fewest people an image may show (inclusive).
    #[arg(long, default_value_t = 3)]
    min_persons: usize,

    /// Most people an image may show (inclusive).
    #[arg(long, default_value_t = 6)]
    max_persons: usize,

    /// Minimum number of distinct categories.
    #[arg(long, default_value_t = 4)]
    min_categories: usize,

    /// Minimum number of annotated objects.
    #[arg(long, default_value_t = 8)]
    min_objects: usize,

    /// Category name counted as a person.
    #[arg(long, default_value = "person")]
    person_category: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct OverviewArgs {
    /// COCO instances JSON file.
    input: PathBuf,

    /// Cells per side of the density grids.
    #[arg(long, default_value_t = 20)]
    grid_size: usize,

    /// Number of most frequent categories that get their own grid.
    #[arg(long, default_value_t = 10)]
    top_grids: usize,

    /// Histogram bins.
    #[arg(long, default_value_t = 30)]
    bins: usize,

    /// Number of most frequent categories that get a histogram.
    #[arg(long, default_value_t = 20)]
    top_histograms: usize,

    /// Maximum number of sampled annotations.
    #[arg(long, default_value_t = 8000)]
    budget: usize,

    /// Minimum per-category quota.
    #[arg(long, default_value_t = 50)]
    floor_min: usize,

    /// Random seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct GraphArgs {
    /// COCO instances JSON file.
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct PoseArgs {
    /// COCO person-keypoints JSON file.
    input: PathBuf,

    /// Maximum number of annotations to examine.
    #[arg(long, default_value_t = 5000)]
    max_samples: usize,

    /// Random seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    output: OutputArgs,
}

/// Run the cocolens CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CocolensError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Candidate(args)) => run_candidate(args),
        Some(Commands::Overview(args)) => run_overview(args),
        Some(Commands::Graph(args)) => run_graph(args),
        Some(Commands::Pose(args)) => run_pose(args),
        None => {
            println!("cocolens {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Aggregation and sampling over COCO-style annotations.");
            println!();
            println!("Run 'cocolens --help' for usage information.");
            Ok(())
        }
    }
}

/// Writes JSON to `--out` or stdout, or prints the text rendering.
fn emit<T: Serialize + fmt::Display>(value: &T, args: &OutputArgs) -> Result<(), CocolensError> {
    match (&args.out, args.output.as_str()) {
        (Some(path), format) => {
            output::write_json(Some(path.as_path()), value)?;
            if format == "text" {
                print!("{}", value);
            }
            Ok(())
        }
        (None, "json") => output::write_json(None, value),
        (None, _) => {
            print!("{}", value);
            Ok(())
        }
    }
}

fn run_candidate(args: CandidateArgs) -> Result<(), CocolensError> {
    let opts = candidate::CandidateOptions {
        min_persons: args.min_persons,
        max_persons: args.max_persons,
        min_categories: args.min_categories,
        min_objects: args.min_objects,
        person_category: args.person_category,
    };
    candidate::validate_candidate_options(&opts)?;

    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;
    let captions = match &args.captions {
        Some(path) => ir::io_coco_json::read_coco_captions(path)?,
        None => Vec::new(),
    };
    let keypoints = args
        .keypoints
        .as_deref()
        .map(ir::io_coco_json::read_coco_json)
        .transpose()?;

    let index = index::AnnotationIndex::build(&dataset);
    let best = candidate::select_candidate(&index, &opts).ok_or(CocolensError::NoCandidate {
        images_considered: index.groups().len(),
    })?;
    let report = candidate::build_candidate_report(
        &index,
        &best,
        &captions,
        keypoints.as_ref().map(|kp| kp.annotations.as_slice()),
    );
    emit(&report, &args.output)
}

fn run_overview(args: OverviewArgs) -> Result<(), CocolensError> {
    let opts = overview::OverviewOptions {
        spatial: spatial::SpatialOptions {
            grid_size: args.grid_size,
            top_categories: args.top_grids,
        },
        histogram: histogram::HistogramOptions {
            bins: args.bins,
            top_categories: args.top_histograms,
        },
        sample: sample::SampleOptions {
            budget: args.budget,
            floor_min: args.floor_min,
            seed: args.seed,
        },
    };
    overview::validate_overview_options(&opts)?;

    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;
    let bundle = if let Some(seed) = opts.sample.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        overview::build_overview(&dataset, &opts, &mut rng)?
    } else {
        let mut rng = rand::rng();
        overview::build_overview(&dataset, &opts, &mut rng)?
    };
    emit(&bundle, &args.output)
}

fn run_graph(args: GraphArgs) -> Result<(), CocolensError> {
    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;
    let index = index::AnnotationIndex::build(&dataset);
    let graph = graph::CoOccurrenceGraph::build(&index);
    emit(&graph, &args.output)
}

fn run_pose(args: PoseArgs) -> Result<(), CocolensError> {
    let opts = pose::PoseOptions {
        max_samples: args.max_samples,
        seed: args.seed,
    };
    pose::validate_pose_options(&opts)?;

    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;
    let report = if let Some(seed) = opts.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        pose::aggregate_poses(&dataset, &opts, &mut rng)?
    } else {
        let mut rng = rand::rng();
        pose::aggregate_poses(&dataset, &opts, &mut rng)?
    };
    emit(&report, &args.output)
}
