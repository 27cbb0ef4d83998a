use anyhow::Result;
use clap::{Parser, ValueEnum};
use copairs_common::{CommonError, DatasetVariant, Diagnose, GroupingMode, JobConfig};
use copairs_core::{PairsContext, PairsError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Count co-occurring well-rated item pairs across users.
#[derive(Parser, Debug)]
#[command(name = "copairs", version)]
struct Args {
    /// Ratings file or directory
    input: PathBuf,
    /// Output directory, must not exist
    output: PathBuf,
    /// Dataset name: "100K" reads tab separated input, anything else "::"
    dataset: Option<String>,
    /// JSON job configuration, flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ratings strictly above this value qualify
    #[arg(long)]
    threshold: Option<i32>,
    /// Field separator, overrides the dataset layout
    #[arg(long)]
    separator: Option<String>,
    #[arg(long)]
    map_tasks: Option<usize>,
    #[arg(long)]
    reducers: Option<u32>,
    /// Worker threads
    #[arg(long)]
    threads: Option<usize>,
    /// Skip the map-side combine pass
    #[arg(long)]
    no_combine: bool,
    #[arg(long, value_enum)]
    grouping: Option<Grouping>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Grouping {
    ExactPair,
    LowItem,
}

impl From<Grouping> for GroupingMode {
    fn from(grouping: Grouping) -> Self {
        match grouping {
            Grouping::ExactPair => GroupingMode::ExactPair,
            Grouping::LowItem => GroupingMode::LowItem,
        }
    }
}

fn build_config(args: &Args) -> Result<JobConfig> {
    let mut config = match &args.config {
        Some(path) => JobConfig::from_json_file(path)?,
        None => JobConfig::default(),
    };
    if let Some(dataset) = &args.dataset {
        config.dataset = DatasetVariant::from_name(dataset);
    }
    if let Some(threshold) = args.threshold {
        config.quality_threshold = threshold;
    }
    if let Some(separator) = &args.separator {
        config.separator = Some(separator.clone());
    }
    if let Some(map_tasks) = args.map_tasks {
        config.num_map_tasks = map_tasks;
    }
    if let Some(reducers) = args.reducers {
        config.num_reducers = reducers;
    }
    if let Some(threads) = args.threads {
        config.num_threads = Some(threads);
    }
    if args.no_combine {
        config.combine = false;
    }
    if let Some(grouping) = args.grouping {
        config.grouping = grouping.into();
    }
    config.validate()?;
    Ok(config)
}

/// Operator hints for failures that carry them.
fn suggestions(e: &anyhow::Error) -> Vec<String> {
    if let Some(PairsError::Common(common)) = e.downcast_ref::<PairsError>() {
        return common.suggestions();
    }
    e.downcast_ref::<CommonError>()
        .map(|common| common.suggestions())
        .unwrap_or_default()
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let context = PairsContext::new(config)?;
    let output = context.run_path(&args.input, &args.output)?;
    info!(
        output = %args.output.display(),
        pairs = output.pairs.len(),
        "Wrote pair counts"
    );
    println!("{}", output.counters);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("copairs failed: {:#}", e);
            for hint in suggestions(&e) {
                warn!("hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
