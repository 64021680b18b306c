//! stitchwork: convert a raster image into an embroidery machine file.
//!
//! Decodes the image, runs the conversion pipeline with per-stage timing,
//! prints a diagnostics report and writes the encoded pattern. Useful for:
//!
//! - Producing DST/PES/JEF/... files from the command line
//! - Tuning edge threshold, density, smoothing and thresholding
//! - Measuring per-stage durations to identify bottlenecks
//! - Seeing how settings change contour, zone and stitch counts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin stitchwork -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant, SystemTime};

use clap::{ArgAction, Parser, ValueEnum};
use jiff::Timestamp;
use stitchwork_export::{FormatTag, encode_pattern};
use stitchwork_pipeline::diagnostics::{Clock, PipelineDiagnostics, convert_with_diagnostics};
use stitchwork_pipeline::{
    BlurKernel, ConversionSettings, ContourTracerKind, PixelBuffer, StitchPattern, ThreadColor,
    ThresholdMode,
};
use tracing::{debug, info};

/// Convert an image into a machine embroidery file.
///
/// Runs the conversion pipeline with configurable settings, prints
/// per-stage timing and count diagnostics, and writes the pattern in
/// the requested machine format.
#[derive(Parser)]
#[command(name = "stitchwork", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Output format: dst, pes, jef, exp, vp3, hus, pat or qcc.
    #[arg(short, long, default_value = "dst")]
    format: FormatTag,

    /// Output file. Defaults to the image path with the format's extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip writing the machine file.
    #[arg(long)]
    no_output: bool,

    /// Design width in millimetres.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_TARGET_WIDTH)]
    width: f64,

    /// Design height in millimetres.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_TARGET_HEIGHT)]
    height: f64,

    /// Stitches per millimetre.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_DENSITY)]
    density: f64,

    /// Edge detector high threshold (0-255). The low threshold is half.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_EDGE_THRESHOLD)]
    edge_threshold: u8,

    /// Fill scan-line angle in degrees.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_FILL_ANGLE)]
    fill_angle: f64,

    /// Do not lay underlay stitches under fills.
    #[arg(long)]
    no_underlay: bool,

    /// Pull compensation as a fraction of the row spacing (0-1).
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_PULL_COMPENSATION)]
    pull_compensation: f64,

    /// Thread color as `#rrggbb`.
    #[arg(long, default_value = "#000000")]
    color: ThreadColor,

    /// Smoothing kernel applied before thresholding.
    #[arg(long, value_enum, default_value_t = Blur::Binomial5)]
    blur: Blur,

    /// Binarization mode.
    #[arg(long, value_enum, default_value_t = Threshold::Global)]
    threshold: Threshold,

    /// Adaptive threshold window (odd, >= 3).
    #[arg(long, default_value_t = ThresholdMode::DEFAULT_WINDOW)]
    adaptive_window: u32,

    /// Adaptive threshold bias subtracted from the local mean.
    #[arg(long, default_value_t = ThresholdMode::DEFAULT_BIAS, allow_negative_numbers = true)]
    adaptive_bias: f64,

    /// Remove ink regions smaller than this many pixels (0 disables).
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_MIN_COMPONENT_AREA)]
    min_component_area: u32,

    /// Contour tracing algorithm.
    #[arg(long, value_enum, default_value_t = Tracer::Moore)]
    tracer: Tracer,

    /// RDP simplification tolerance in pixels.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Skip contour smoothing after simplification.
    #[arg(long)]
    no_smooth: bool,

    /// Satin column width in millimetres.
    #[arg(long, default_value_t = ConversionSettings::DEFAULT_SATIN_WIDTH)]
    satin_width: f64,

    /// Pattern name. Defaults to the image file stem.
    #[arg(long)]
    name: Option<String>,

    /// Full conversion settings as a JSON string.
    ///
    /// When provided, all other settings flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long, conflicts_with = "config")]
    config_json: Option<String>,

    /// Read conversion settings from a JSON file. Same rules as `--config-json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Creation timestamp stamped into the pattern. Defaults to now (UTC).
    #[arg(long)]
    created_at: Option<String>,

    /// Write the stitch pattern as JSON, for preview tools.
    #[arg(long)]
    pattern_json: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Smoothing kernel selection.
#[derive(Clone, Copy, ValueEnum)]
enum Blur {
    /// No smoothing.
    None,
    /// 3×3 binomial.
    Binomial3,
    /// 5×5 binomial.
    Binomial5,
}

/// Binarization selection.
#[derive(Clone, Copy, ValueEnum)]
enum Threshold {
    /// Fixed cut-off at the edge threshold.
    Global,
    /// Local mean minus bias.
    Adaptive,
    /// Feed grayscale straight to the edge detector.
    None,
}

/// Contour tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// Greedy 8-connected walk.
    Moore,
    /// Suzuki-Abe border following.
    Border,
}

/// Build [`ConversionSettings`] from CLI arguments.
///
/// If `--config-json` or `--config` is provided, the JSON is parsed
/// directly and all individual settings flags are ignored. Otherwise,
/// settings are assembled from the individual flags.
fn settings_from_cli(cli: &Cli) -> Result<ConversionSettings, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    if let Some(ref path) = cli.config {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&json)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }

    Ok(ConversionSettings {
        target_width: cli.width,
        target_height: cli.height,
        density: cli.density,
        edge_threshold: cli.edge_threshold,
        fill_angle: cli.fill_angle,
        use_underlay: !cli.no_underlay,
        pull_compensation: cli.pull_compensation,
        color: cli.color,
        blur_kernel: match cli.blur {
            Blur::None => BlurKernel::None,
            Blur::Binomial3 => BlurKernel::Binomial3,
            Blur::Binomial5 => BlurKernel::Binomial5,
        },
        threshold: match cli.threshold {
            Threshold::Global => ThresholdMode::Global {
                level: cli.edge_threshold,
            },
            Threshold::Adaptive => ThresholdMode::Adaptive {
                window: cli.adaptive_window,
                bias: cli.adaptive_bias,
            },
            Threshold::None => ThresholdMode::None,
        },
        min_component_area: cli.min_component_area,
        contour_tracer: match cli.tracer {
            Tracer::Moore => ContourTracerKind::MooreNeighbor,
            Tracer::Border => ContourTracerKind::BorderFollowing,
        },
        simplify_tolerance: cli.simplify_tolerance,
        smooth_contours: !cli.no_smooth,
        satin_width: cli.satin_width,
        name: cli.name.clone().unwrap_or_else(|| file_stem(&cli.image_path)),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pattern")
        .to_string()
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let pixels = match PixelBuffer::from_image_bytes(&image_bytes) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        width = pixels.width(),
        height = pixels.height(),
        "image decoded"
    );
    debug!(?settings, "conversion settings");

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut pattern = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match convert_with_diagnostics(&pixels, &settings, &StdClock) {
            Ok((converted, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                if pattern.is_none() {
                    pattern = Some(converted);
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error ({}): {e}", e.stage());
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    let Some(pattern) = pattern else {
        return ExitCode::FAILURE;
    };
    let created_at = cli
        .created_at
        .clone()
        .unwrap_or_else(|| iso8601_utc(SystemTime::now()));
    let pattern = pattern.with_created_at(created_at);

    if let Some(ref path) = cli.pattern_json
        && let Err(msg) = write_pattern_json(path, &pattern)
    {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if !cli.no_output {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.image_path.with_extension(cli.format.extension()));
        if let Err(msg) = write_machine_file(&output, &pattern, cli.format) {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn write_machine_file(
    path: &Path,
    pattern: &StitchPattern,
    format: FormatTag,
) -> Result<(), String> {
    let bytes = encode_pattern(pattern, format)
        .map_err(|e| format!("Error encoding {format} ({}): {e}", e.stage()))?;
    std::fs::write(path, &bytes)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!(
        "{} written to {} ({} bytes, {} stitches, {} colors)",
        format.extension().to_uppercase(),
        path.display(),
        bytes.len(),
        pattern.stitches.len(),
        pattern.colors.len(),
    );
    Ok(())
}

fn write_pattern_json(path: &Path, pattern: &StitchPattern) -> Result<(), String> {
    let json = serde_json::to_string_pretty(pattern)
        .map_err(|e| format!("Error serializing pattern: {e}"))?;
    std::fs::write(path, &json).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Pattern JSON written to {} ({} bytes)", path.display(), json.len());
    Ok(())
}

/// Format `time` as `YYYY-MM-DDTHH:MM:SSZ`, truncated to whole seconds.
///
/// Times outside the representable range fall back to the Unix epoch.
fn iso8601_utc(time: SystemTime) -> String {
    Timestamp::try_from(time)
        .unwrap_or(Timestamp::UNIX_EPOCH)
        .strftime("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
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

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let to_ms = |d: Duration| d.as_secs_f64() * 1000.0;
    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| to_ms(d.total_duration))
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (i, (name, _)) in first.stages().iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| to_ms(d.stages()[i].1.duration))
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stitchwork").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_build_settings() {
        let c = cli(&[
            "flower.png",
            "--width",
            "80",
            "--density",
            "3",
            "--color",
            "#cc3366",
            "--threshold",
            "adaptive",
            "--tracer",
            "border",
            "--no-underlay",
        ]);
        let s = settings_from_cli(&c).unwrap();
        assert!((s.target_width - 80.0).abs() < f64::EPSILON);
        assert!((s.density - 3.0).abs() < f64::EPSILON);
        assert_eq!(s.color, ThreadColor::new(0xcc, 0x33, 0x66));
        assert!(matches!(s.threshold, ThresholdMode::Adaptive { window: 11, .. }));
        assert_eq!(s.contour_tracer, ContourTracerKind::BorderFollowing);
        assert!(!s.use_underlay);
        assert_eq!(s.name, "flower");
    }

    #[test]
    fn defaults_match_library_defaults() {
        let mut s = settings_from_cli(&cli(&["in.png"])).unwrap();
        s.name = ConversionSettings::default().name;
        assert_eq!(s, ConversionSettings::default());
    }

    #[test]
    fn config_json_overrides_flags() {
        let c = cli(&["in.png", "--width", "80", "--config-json", r#"{"targetWidth": 120}"#]);
        let s = settings_from_cli(&c).unwrap();
        assert!((s.target_width - 120.0).abs() < f64::EPSILON);
        assert!((s.target_height - ConversionSettings::DEFAULT_TARGET_HEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let c = cli(&["in.png", "--config-json", "{not json"]);
        assert!(settings_from_cli(&c).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn format_flag_parses_tags() {
        assert_eq!(cli(&["in.png", "-f", "pes"]).format, FormatTag::Pes);
        assert!(Cli::try_parse_from(["stitchwork", "in.png", "-f", "svg"]).is_err());
    }

    #[test]
    fn timestamps() {
        assert_eq!(iso8601_utc(UNIX_EPOCH), "1970-01-01T00:00:00Z");
        let t = UNIX_EPOCH + Duration::from_secs(1_709_210_096);
        assert_eq!(iso8601_utc(t), "2024-02-29T12:34:56Z");
        let t = UNIX_EPOCH + Duration::from_secs(951_782_400);
        assert_eq!(iso8601_utc(t), "2000-02-29T00:00:00Z");
    }

    #[test]
    fn timestamps_drop_fractions_and_allow_pre_epoch() {
        let t = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(iso8601_utc(t), "1970-01-01T00:00:01Z");
        let t = UNIX_EPOCH - Duration::from_secs(86_400);
        assert_eq!(iso8601_utc(t), "1969-12-31T00:00:00Z");
    }
}
