//! Image variations CLI
//!
//! `image_variations N` generates one batch of `N` variations and saves them to
//! the output folder. Without `N`, runs an interactive probe of the pipeline's
//! memory footprint.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use image_variations::logging::{init_logging, LogConfig, LogLevel};
use image_variations::{save_sample, ColorMode, ImageVariations, PipelineConfig, SourceMode};

/// Batches of randomly varied image crops, as fed to a training loop
#[derive(Parser, Debug)]
#[command(name = "image_variations")]
#[command(version)]
#[command(about = "Generate augmented image variations", long_about = None)]
struct Cli {
    /// Number of variations to generate and save. Omit to run the memory probe.
    count: Option<usize>,

    /// Folder with source images
    #[arg(short, long, default_value = "data/input")]
    input: PathBuf,

    /// Folder the variations are written to
    #[arg(short, long, default_value = "data/output")]
    output: PathBuf,

    /// Side length of the generated square images
    #[arg(short, long, default_value = "64")]
    size: u32,

    /// Batch size used by the memory probe
    #[arg(short, long, default_value = "16")]
    batch_size: usize,

    /// Produce single-channel images
    #[arg(long, default_value = "false")]
    grayscale: bool,

    /// Number of worker threads (defaults to the CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Random seed for reproducible variations
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Minimum log level (trace, debug, info, warn, error); overrides --verbose/--quiet
    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let mut config = if self.verbose {
            LogConfig::verbose()
        } else if self.quiet {
            LogConfig::quiet()
        } else {
            LogConfig::default()
        };
        if let Some(level) = self.log_level {
            config.level = level;
        }
        config
    }

    fn pipeline_config(&self, source_mode: SourceMode, batch_size: usize) -> PipelineConfig {
        let color_mode = if self.grayscale {
            ColorMode::Grayscale
        } else {
            ColorMode::Color
        };

        let mut builder = PipelineConfig::builder()
            .input_folder(&self.input)
            .output_folder(&self.output)
            .image_size(self.size)
            .batch_size(batch_size)
            .color_mode(color_mode)
            .source_mode(source_mode);
        if let Some(workers) = self.workers {
            builder = builder.num_workers(workers);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = cli.log_config();
    init_logging(&log_config)?;
    debug!(level = %log_config.level, "logging initialized");

    match cli.count {
        Some(count) => generate(&cli, count),
        None => memory_probe(&cli),
    }
}

/// Streams one batch of `count` variations and saves each as `variant_<i>`.
fn generate(cli: &Cli, count: usize) -> Result<()> {
    let config = cli.pipeline_config(SourceMode::Streaming, count);
    let mut variations = ImageVariations::new(config)?;

    let batch = variations.get_batch(count)?;
    variations.close();

    let config = variations.config();
    for (i, sample) in batch.iter().enumerate() {
        save_sample(
            sample,
            config.image_size,
            config.color_mode,
            &config.output_folder,
            Some(&format!("variant_{}", i)),
        )
        .with_context(|| format!("Failed to save variation {}", i))?;
    }
    info!(folder = %config.output_folder.display(), "saved {} variations", batch.len());

    println!(
        "Generated {} image variations as they are when fed to the network",
        count
    );
    Ok(())
}

/// Loads every image into memory, then holds four batches, pausing so the
/// process footprint can be inspected at each step.
fn memory_probe(cli: &Cli) -> Result<()> {
    println!("Testing memory requirements");
    let config = cli.pipeline_config(SourceMode::InMemory, cli.batch_size);
    let batch_size = config.batch_size;
    let mut variations = ImageVariations::new(config)?;

    wait_for_enter("Press Enter to continue... (all images loaded)")?;

    let mut batches = Vec::with_capacity(4);
    for _ in 0..4 {
        batches.push(variations.get_batch(batch_size)?);
    }
    info!(
        batches = batches.len(),
        queued = variations.queued(),
        "holding batches"
    );

    wait_for_enter("Press Enter to continue... (also four batches)")?;
    variations.join();
    Ok(())
}

fn wait_for_enter(prompt: &str) -> Result<()> {
    print!("{}", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(())
}
