use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wdi_core::config::{self, PipelineConfig};
use wdi_core::{cluster, country_meta, loader, outputs, pipeline, snapshot};

#[derive(Parser, Debug)]
#[command(author, version, about = "World Bank indicator merge-and-snapshot pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a merge pipeline, by built-in name or from a TOML config
    Run(RunArgs),
    /// List the built-in pipelines
    List,
    /// Fetch country metadata from the World Bank API
    FetchMeta(FetchMetaArgs),
    /// Cluster a snapshot CSV with k-means over selected features
    Cluster(ClusterArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Built-in pipeline name (see `wdi list`)
    pipeline: Option<String>,
    /// TOML pipeline definition, instead of a built-in name
    #[arg(long, conflicts_with = "pipeline")]
    config: Option<PathBuf>,
    /// Directory holding the source CSV files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// Override the configured output path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Country metadata CSV to join onto the result
    #[arg(long)]
    country_meta: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FetchMetaArgs {
    #[arg(long, default_value = "country_meta.csv")]
    output: PathBuf,
    #[arg(long, default_value = country_meta::WORLD_BANK_COUNTRY_URL)]
    url: String,
}

#[derive(Args, Debug)]
struct ClusterArgs {
    /// Snapshot CSV produced by a pipeline run
    input: PathBuf,
    /// Feature column to cluster on (repeat for each feature)
    #[arg(long = "feature", required = true)]
    features: Vec<String>,
    #[arg(long, default_value_t = 4)]
    clusters: usize,
    /// Restrict to one year instead of the latest row per country
    #[arg(long)]
    year: Option<i64>,
    #[arg(long, default_value = "country_clusters.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_pipeline(args),
        Command::List => {
            for config in config::builtin_pipelines() {
                println!("{}  ->  {}", config.name, config.output);
            }
            Ok(())
        }
        Command::FetchMeta(args) => {
            let records = country_meta::fetch(&args.url)
                .context("failed to fetch country metadata")?;
            country_meta::write_meta_csv(&records, &args.output)?;
            info!(path = %args.output.display(), "Saved country metadata");
            Ok(())
        }
        Command::Cluster(args) => run_cluster(args),
    }
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    let owned;
    let config: &PipelineConfig = match (&args.pipeline, &args.config) {
        (Some(name), None) => config::find_builtin(name)
            .ok_or_else(|| anyhow!("unknown pipeline '{name}', try `wdi list`"))?,
        (None, Some(path)) => {
            owned = PipelineConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            &owned
        }
        _ => return Err(anyhow!("pass a built-in pipeline name or --config <file>")),
    };

    let outcome = pipeline::run(
        config,
        &args.data_dir,
        args.output.as_deref(),
        args.country_meta.as_deref(),
    )?;

    info!(
        rows = outcome.frame.height(),
        columns = outcome.frame.width(),
        output = %outcome.output_path.display(),
        "Pipeline finished"
    );
    Ok(())
}

fn run_cluster(args: ClusterArgs) -> Result<()> {
    let df = loader::read_csv_file(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let selected = match args.year {
        Some(year) => snapshot::filter_year(&df, year)?,
        None => snapshot::latest_per_country(&df)?,
    };

    let outcome = cluster::cluster_snapshot(&selected, &args.features, args.clusters)?;
    println!("{}", cluster::summary_table(&outcome));

    let mut frame = outcome.frame.clone();
    outputs::write_csv(&mut frame, &args.output)?;
    info!(
        countries = outcome.frame.height(),
        path = %args.output.display(),
        "Saved cluster assignments"
    );
    Ok(())
}
