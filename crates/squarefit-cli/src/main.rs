//! squarefit CLI - square, padded JPEGs under a size limit
//!
//! Pads every photo in a directory (or a single photo) to a square with a
//! constant-colour border and writes JPEGs no larger than `--max-size` into a
//! `square_resized` directory beside the inputs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use squarefit_core::batch::{collect_inputs, default_workers, run_batch, BatchOptions};
use squarefit_core::encode::{
    ShrinkOptions, DEFAULT_MAX_MEGABYTES, DEFAULT_QUALITY_MIN, DEFAULT_QUALITY_START,
};
use squarefit_core::transform::{PaddingSpec, DEFAULT_MARGIN};

/// Pad photos to squares that fit under a file size limit.
///
/// Supports JPEG input, and HEIF/HEIC when built with the `heif` feature.
#[derive(Parser, Debug)]
#[command(name = "squarefit")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    squarefit ~/Pictures/trip               Pad every photo in a directory
    squarefit IMG_0042.HEIC -m 50           Single photo with a 50px border
    squarefit . --max-size 8 -w 4           8 MiB limit on four workers
    squarefit . --background 000000         Black border instead of white")]
struct Args {
    /// Directory of photos or a single photo (default: the executable's directory)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Extra border added on every side, in pixels
    #[arg(short, long, default_value_t = DEFAULT_MARGIN)]
    margin: u32,

    /// Parallel workers (default: available cores minus one)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum output size in megabytes (MiB)
    #[arg(long, default_value_t = DEFAULT_MAX_MEGABYTES)]
    max_size: f64,

    /// Lowest JPEG quality the size search will try
    #[arg(long, default_value_t = DEFAULT_QUALITY_MIN, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality_min: u8,

    /// JPEG quality the size search starts from
    #[arg(long, default_value_t = DEFAULT_QUALITY_START, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality_start: u8,

    /// Border colour as RRGGBB hex
    #[arg(long, value_name = "RRGGBB", default_value = "ffffff", value_parser = parse_hex_color)]
    background: [u8; 3],

    /// Show each quality attempt
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn batch_options(&self) -> Result<BatchOptions> {
        let shrink = ShrinkOptions {
            quality_start: self.quality_start,
            quality_min: self.quality_min,
            ..ShrinkOptions::default()
        }
        .with_max_megabytes(self.max_size)?;
        shrink.validate()?;

        Ok(BatchOptions {
            padding: PaddingSpec::new(self.background, self.margin),
            shrink,
            workers: self.workers.unwrap_or_else(default_workers).max(1),
        })
    }
}

fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected six hex digits like ffffff, got '{s}'"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| format!("invalid hex colour '{s}'"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn default_input_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("executable has no parent directory")
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let options = args.batch_options()?;
    let input = match &args.input {
        Some(path) => path.clone(),
        None => default_input_dir()?,
    };

    let inputs = collect_inputs(&input)?;
    log::info!(
        "Found {} file(s), using {} worker(s)",
        inputs.files.len(),
        options.workers
    );

    let report = run_batch(&inputs, &options)?;

    log::info!(
        "{} written, {} over the size limit, {} failed",
        report.succeeded(),
        report.over_budget(),
        report.failed()
    );
    log::info!(
        "Processing completed. Resized images are saved in '{}'.",
        report.output_dir.display()
    );
    Ok(())
}
