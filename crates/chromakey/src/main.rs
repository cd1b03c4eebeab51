//! chromakey: remove a solid background color from an image.
//!
//! Reads an image file, keys out the chosen color with
//! [`chromakey_pipeline`], and writes the result as a transparent PNG.
//! Optionally writes the final alpha mask and prints per-stage
//! diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin chromakey -- [OPTIONS] <INPUT> --output <OUTPUT>
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use chromakey_pipeline::KeyParams;
use chromakey_pipeline::diagnostics::{Clock, process_staged_with_diagnostics};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Remove a solid background color from an image.
///
/// Pixels close to the key color (in hue, saturation, and brightness)
/// become transparent; everything else keeps its original color and
/// opacity. The output is always a PNG with an alpha channel.
#[derive(Debug, Parser)]
#[command(name = "chromakey", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output PNG path.
    #[arg(short, long)]
    output: PathBuf,

    /// Key color as 6 hex digits, with or without a leading '#'.
    #[arg(long, default_value = KeyParams::DEFAULT_COLOR)]
    color: String,

    /// Tolerance around the key color (nominally 0-100).
    #[arg(long, default_value_t = KeyParams::DEFAULT_SENSITIVITY, allow_negative_numbers = true)]
    sensitivity: f64,

    /// Edge softening strength (nominally 0-100, 0 disables).
    #[arg(long, default_value_t = KeyParams::DEFAULT_SMOOTHING, allow_negative_numbers = true)]
    smoothing: f64,

    /// Full key parameters as a JSON object, e.g. '{"color": "#0000FF"}'.
    ///
    /// When provided, --color, --sensitivity, and --smoothing are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    params_json: Option<String>,

    /// Also write the final alpha mask as a grayscale PNG.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Print the per-stage diagnostics report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    /// Implies --diagnostics.
    #[arg(long)]
    json: bool,
}

/// Build [`KeyParams`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn params_from_cli(cli: &Cli) -> anyhow::Result<KeyParams> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).context("parsing --params-json");
    }

    Ok(KeyParams {
        color: cli.color.clone(),
        sensitivity: cli.sensitivity,
        smoothing: cli.smoothing,
    })
}

/// Wall-clock stage timing for native runs.
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let params = params_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    tracing::info!(
        input = %cli.input.display(),
        bytes = image_bytes.len(),
        color = %params.color,
        sensitivity = params.sensitivity,
        smoothing = params.smoothing,
        "keying image",
    );

    let (staged, diagnostics) = process_staged_with_diagnostics(&image_bytes, &params, &StdClock)
        .with_context(|| format!("keying {}", cli.input.display()))?;

    tracing::debug!(
        hue = staged.target.hue,
        saturation = staged.target.saturation,
        value = staged.target.value,
        bounds = ?staged.bounds,
        "key color resolved",
    );
    if let Some(kernel) = staged.blur_kernel {
        tracing::debug!(kernel, "alpha mask blurred");
    }

    std::fs::write(&cli.output, &staged.png)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    tracing::info!(
        output = %cli.output.display(),
        bytes = staged.png.len(),
        width = staged.dimensions.width,
        height = staged.dimensions.height,
        keyed = diagnostics.summary.keyed_pixel_count,
        "wrote keyed image",
    );

    if let Some(ref mask_path) = cli.mask {
        let mask_png = chromakey_pipeline::codec::encode_gray_png(&staged.alpha_mask)
            .context("encoding alpha mask")?;
        std::fs::write(mask_path, &mask_png)
            .with_context(|| format!("writing {}", mask_path.display()))?;
        tracing::info!(mask = %mask_path.display(), bytes = mask_png.len(), "wrote alpha mask");
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics).context("serializing diagnostics")?;
        println!("{json}");
    } else if cli.diagnostics {
        println!("{}", diagnostics.report());
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
