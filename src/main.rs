use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use orgaplex_analyzer_lib::config::{AnalysisKind, Config};
use orgaplex_analyzer_lib::oneway::OutputMode;
use orgaplex_analyzer_lib::{run_analysis, Catalog, RunContext};

const DEFAULT_CONFIG: &str = "config.toml";

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Orgaplex-Analyzer - Organelle contact and distribution analysis")]
struct Args {
    /// Dataset directory (overwrites config)
    #[clap(short, long)]
    input: Option<String>,

    /// Output directory (overwrites config)
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file [default: config.toml when present]
    #[clap(short, long)]
    config: Option<String>,

    /// Analysis to run (overwrites config)
    #[clap(short, long, value_enum)]
    analysis: Option<AnalysisArg>,

    /// Bait organelle; repeat for several. Omit to use every organelle
    #[clap(short, long)]
    bait: Vec<String>,

    /// Contact threshold in um; a distance <= threshold is a contact
    #[clap(short, long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// Organelle for radial analysis, or restrict metrics to it
    #[clap(long)]
    organelle: Option<String>,

    /// Radial bin width in um
    #[clap(long)]
    bin_width: Option<f64>,

    /// Radial maximum distance in um
    #[clap(long)]
    max_distance: Option<f64>,

    /// One-way analysis: write one file per cell
    #[clap(long)]
    per_cell: bool,

    /// List detected organelles and exit
    #[clap(long)]
    list_organelles: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnalysisArg {
    Nway,
    Radial,
    Metrics,
    Oneway,
}

impl From<AnalysisArg> for AnalysisKind {
    fn from(arg: AnalysisArg) -> Self {
        match arg {
            AnalysisArg::Nway => AnalysisKind::Nway,
            AnalysisArg::Radial => AnalysisKind::Radial,
            AnalysisArg::Metrics => AnalysisKind::Metrics,
            AnalysisArg::Oneway => AnalysisKind::Oneway,
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading config {}", path)),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            Config::from_file(DEFAULT_CONFIG).context("loading config.toml")
        }
        None => {
            warn!("No config file given and no {} found; using defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(analysis) = args.analysis {
        config.analysis = analysis.into();
    }

    if !args.bait.is_empty() {
        config.bait_organelles = args.bait.clone();
    }

    if let Some(threshold) = args.threshold {
        config.contact_threshold = threshold;
    }

    if let Some(organelle) = args.organelle.clone() {
        match config.analysis {
            AnalysisKind::Metrics => config.metrics_organelles = vec![organelle],
            _ => config.radial_organelle = Some(organelle),
        }
    }

    if let Some(bin_width) = args.bin_width {
        config.radial_bin_width = bin_width;
    }

    if let Some(max_distance) = args.max_distance {
        config.radial_max_distance = max_distance;
    }

    if args.per_cell {
        config.oneway_output_mode = OutputMode::PerCell;
    }
}

fn list_organelles(input: &str) -> Result<()> {
    let catalog = Catalog::build(input).with_context(|| format!("scanning {}", input))?;
    println!("Detected organelles in {}:", input);
    for organelle in catalog.all_organelles() {
        println!("  {:<12} {} cells", organelle, catalog.cells_by_organelle(organelle).len());
    }
    for warning in catalog.parse_warnings() {
        println!("  skipped {}: {}", warning.path.display(), warning.message);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = load_config(&args)?;
    apply_overrides(&mut config, &args);

    if args.list_organelles {
        return list_organelles(&config.input_path);
    }

    config.validate().context("invalid configuration")?;

    let start_time = Instant::now();
    info!("Input directory: {}", config.input_path);
    info!("Output directory: {}", config.output_base_dir);

    let ctx = RunContext::new(&config.input_path);
    run_analysis(&config, &ctx).with_context(|| format!("{} analysis failed", config.analysis))?;

    info!("Processing completed in {:.2} seconds", start_time.elapsed().as_secs_f64());

    Ok(())
}
