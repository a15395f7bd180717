//! Distribution Prompts CLI
//!
//! Generates few-shot statistics prompts about sampled and real-world distributions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use distribution_prompts::{
    generate_prompts, generate_real_world_percentile_prompts, render_inspection, sample_for_task,
    DistributionSpec, Family, GenerationConfig, ReportBuilder, SampleOptions, ShotSource, Task,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "distribution-prompts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate prompts about sampled distributions
    Generate {
        /// Task: percentiles, sampling or probabilities
        #[arg(long)]
        task: Task,

        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Shot counts (overrides config)
        #[arg(long, value_delimiter = ',')]
        shots: Vec<usize>,

        /// Copies of each prompt (overrides config)
        #[arg(long)]
        sample_count: Option<usize>,

        /// Few-shot source: examples, distribution_stats or intermediate_stats
        #[arg(long)]
        shot_source: Option<ShotSource>,

        /// Use the nearest-shot percentile templates
        #[arg(long)]
        nearest_shot: bool,

        /// Run seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Values drawn per distribution (overrides config)
        #[arg(long)]
        sample_size: Option<usize>,

        /// Example distributions per family (overrides config)
        #[arg(long)]
        num_examples: Option<usize>,

        /// Describe question distributions by a normal approximation
        #[arg(long)]
        approximate_as_normal: bool,

        /// Output JSON file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate zero-shot prompts about real-world datasets
    RealWorld {
        /// Copies of each prompt
        #[arg(long, default_value = "10")]
        sample_count: usize,

        /// Output JSON file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the statistics of one question distribution
    Inspect {
        /// Distribution family
        #[arg(long)]
        family: Family,

        /// Task whose statistics to show
        #[arg(long, default_value = "percentiles")]
        task: Task,

        /// YAML configuration file holding the question parameters
        #[arg(long)]
        config: Option<PathBuf>,

        /// Sampling seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Values to draw (overrides config)
        #[arg(long)]
        sample_size: Option<usize>,

        /// Describe the distribution by a normal approximation
        #[arg(long)]
        approximate_as_normal: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<GenerationConfig> {
    match path {
        Some(path) => GenerationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(GenerationConfig::default()),
    }
}

fn write_output(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote prompts");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            task,
            config,
            shots,
            sample_count,
            shot_source,
            nearest_shot,
            seed,
            sample_size,
            num_examples,
            approximate_as_normal,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if !shots.is_empty() {
                config.shots = shots;
            }
            if let Some(count) = sample_count {
                config.sample_count = count;
            }
            if let Some(source) = shot_source {
                config.shot_source = source;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(size) = sample_size {
                config.sample_size = size;
            }
            if let Some(n) = num_examples {
                config.num_examples = n;
            }
            config.nearest_shot |= nearest_shot;
            config.approximate_as_normal |= approximate_as_normal;
            config.debug |= cli.verbose;

            tracing::info!(
                task = %task,
                seed = config.seed,
                sample_size = config.sample_size,
                shots = ?config.shots,
                shot_source = ?config.shot_source,
                "Generating prompts"
            );

            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            let prompts = generate_prompts(&config, task, &mut rng)?;
            let report = ReportBuilder::new(task.name())
                .with_config(&config)
                .build(prompts);
            tracing::info!(
                groups = report.summary.total_groups,
                prompts = report.summary.total_prompts,
                "Generated prompts"
            );
            write_output(&report.to_json()?, output.as_deref())?;
        }
        Commands::RealWorld {
            sample_count,
            output,
        } => {
            let prompts = generate_real_world_percentile_prompts(sample_count);
            let report = ReportBuilder::new("real_world_percentiles").build(prompts);
            tracing::info!(
                groups = report.summary.total_groups,
                prompts = report.summary.total_prompts,
                "Generated real-world prompts"
            );
            write_output(&report.to_json()?, output.as_deref())?;
        }
        Commands::Inspect {
            family,
            task,
            config,
            seed,
            sample_size,
            approximate_as_normal,
        } => {
            let config = load_config(config.as_deref())?;
            let question = config
                .question(family)
                .with_context(|| format!("No question configured for the {family} family"))?;
            let spec = DistributionSpec::new(family, question.params.clone())
                .with_sample_size(sample_size.unwrap_or(config.sample_size))
                .with_seed(seed.unwrap_or(config.seed));
            let options = SampleOptions {
                debug: cli.verbose,
                approximate_as_normal,
            };
            let output = sample_for_task(&spec, task, options)?;
            println!("{}", render_inspection(&output));
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
