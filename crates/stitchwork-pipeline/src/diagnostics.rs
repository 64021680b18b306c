//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`convert_with_diagnostics`] runs the staged pipeline and times every
//! transition with a caller-supplied [`Clock`], so this crate never
//! touches a platform clock itself. The CLI passes a
//! `std::time::Instant`-backed clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blur::BlurKernel;
use crate::contour::ContourTracerKind;
use crate::pattern::StitchPattern;
use crate::pipeline::{Pipeline, PipelineStage};
use crate::threshold::ThresholdMode;
use crate::types::{ConversionSettings, Contour, PixelBuffer, ProcessingError};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Grayscale, blur, threshold and component filtering.
    pub preprocess: StageDiagnostics,
    /// Sobel, non-maximum suppression and hysteresis.
    pub edge_detection: StageDiagnostics,
    /// Tracing, simplification and smoothing.
    pub contour_tracing: StageDiagnostics,
    /// Scaling to millimetres and zone classification.
    pub classification: StageDiagnostics,
    /// Fill, satin, running and underlay generation.
    pub stitch_generation: StageDiagnostics,
    /// Stitch length and color-stop normalization.
    pub optimization: StageDiagnostics,
    /// Total wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Preprocessing metrics.
    Preprocess {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Smoothing kernel applied.
        blur_kernel: BlurKernel,
        /// Binarization mode applied.
        threshold: ThresholdMode,
        /// Foreground pixels after component filtering.
        ink_pixel_count: usize,
        /// Connected components found before filtering.
        components_found: usize,
        /// Components removed as too small.
        components_removed: usize,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Hysteresis low threshold.
        low_threshold: f32,
        /// Hysteresis high threshold.
        high_threshold: f32,
        /// Number of edge pixels in the output.
        edge_pixel_count: usize,
        /// Total pixel count for computing edge density.
        total_pixel_count: usize,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Which tracer was used.
        tracer: ContourTracerKind,
        /// Contours that passed the minimum length filter.
        traced_count: usize,
        /// Contours that fell below three points after simplification.
        discarded_count: usize,
        /// Contours kept.
        contour_count: usize,
        /// Points before simplification.
        points_before: usize,
        /// Points across all kept contours.
        total_point_count: usize,
        /// Minimum points in any kept contour.
        min_contour_points: usize,
        /// Maximum points in any kept contour.
        max_contour_points: usize,
        /// Mean points per kept contour.
        mean_contour_points: f64,
    },
    /// Zone classification metrics.
    Classification {
        /// Millimetres per pixel along x.
        scale_x: f64,
        /// Millimetres per pixel along y.
        scale_y: f64,
        /// Zones classified as fill.
        fill_count: usize,
        /// Zones classified as satin.
        satin_count: usize,
        /// Zones classified as running.
        running_count: usize,
    },
    /// Stitch generation metrics.
    StitchGeneration {
        /// Underlay stitches.
        underlay: usize,
        /// Fill stitches.
        fill: usize,
        /// Satin stitches.
        satin: usize,
        /// Running stitches.
        running: usize,
    },
    /// Optimizer metrics.
    Optimization {
        /// Stitches entering the optimizer.
        input_count: usize,
        /// Stitches leaving it.
        output_count: usize,
        /// Stitches dropped as too short.
        dropped: usize,
        /// Normal stitches turned into jumps.
        converted_to_jump: usize,
        /// Stops inserted for color changes.
        stops_inserted: usize,
    },
}

/// High-level summary counts for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Contours that reached classification.
    pub contour_count: usize,
    /// Stitches in the final pattern.
    pub stitch_count: usize,
    /// Thread colors in the final pattern.
    pub color_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Stitches: {}  |  Colors: {}",
            self.summary.contour_count, self.summary.stitch_count, self.summary.color_count,
        ));

        lines.join("\n")
    }

    /// Every stage in execution order, with its display name.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 6] {
        [
            ("Preprocess", &self.preprocess),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Classification", &self.classification),
            ("Stitch Generation", &self.stitch_generation),
            ("Optimization", &self.optimization),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preprocess {
            width,
            height,
            blur_kernel,
            ink_pixel_count,
            components_found,
            components_removed,
            ..
        } => format!(
            "{width}x{height} blur={blur_kernel:?} ink={ink_pixel_count} components={components_found} (-{components_removed})",
        ),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::ContourTracing {
            contour_count,
            discarded_count,
            points_before,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
            ..
        } => format!(
            "{contour_count} contours (-{discarded_count}), {points_before}->{total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
        ),
        StageMetrics::Classification {
            scale_x,
            scale_y,
            fill_count,
            satin_count,
            running_count,
        } => format!(
            "scale={scale_x:.3}x{scale_y:.3}mm/px fill={fill_count} satin={satin_count} running={running_count}",
        ),
        StageMetrics::StitchGeneration {
            underlay,
            fill,
            satin,
            running,
        } => format!("underlay={underlay} fill={fill} satin={satin} running={running}"),
        StageMetrics::Optimization {
            input_count,
            output_count,
            dropped,
            converted_to_jump,
            stops_inserted,
        } => format!(
            "{input_count}->{output_count} stitches, dropped={dropped} jumps={converted_to_jump} stops={stops_inserted}",
        ),
    }
}

/// Statistics for a set of contours.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute contour statistics.
pub(crate) fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Time one stage transition.
fn timed<C: Clock, T>(clock: &C, step: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let out = step();
    (out, clock.elapsed(&start))
}

/// Stage metrics, which every stage past `Pending` provides.
fn metrics_of<S: PipelineStage>(stage: &S) -> Result<StageMetrics, ProcessingError> {
    stage.metrics().ok_or_else(|| {
        ProcessingError::InvalidInput(format!("stage {} produced no metrics", S::NAME))
    })
}

/// Run the whole conversion, timing every stage.
///
/// # Errors
///
/// Returns the same errors as [`crate::convert_image_to_pattern`].
pub fn convert_with_diagnostics<C: Clock>(
    pixels: &PixelBuffer,
    settings: &ConversionSettings,
    clock: &C,
) -> Result<(StitchPattern, PipelineDiagnostics), ProcessingError> {
    let run_start = clock.now();
    let pending = Pipeline::new(pixels, settings.clone())?;

    let (preprocessed, preprocess_duration) = timed(clock, || pending.preprocess());
    let preprocess = StageDiagnostics {
        duration: preprocess_duration,
        metrics: metrics_of(&preprocessed)?,
    };

    let (edges, edge_duration) = timed(clock, || preprocessed.detect_edges());
    let edge_detection = StageDiagnostics {
        duration: edge_duration,
        metrics: metrics_of(&edges)?,
    };

    let (contours, contour_duration) = timed(clock, || edges.trace_contours());
    let contours = contours?;
    let contour_count = contours.contours().len();
    let contour_tracing = StageDiagnostics {
        duration: contour_duration,
        metrics: metrics_of(&contours)?,
    };

    let (classified, classify_duration) = timed(clock, || contours.classify());
    let classification = StageDiagnostics {
        duration: classify_duration,
        metrics: metrics_of(&classified)?,
    };

    let (generated, generate_duration) = timed(clock, || classified.generate_stitches());
    let generated = generated?;
    let stitch_generation = StageDiagnostics {
        duration: generate_duration,
        metrics: metrics_of(&generated)?,
    };

    let (optimized, optimize_duration) = timed(clock, || generated.optimize());
    let optimization = StageDiagnostics {
        duration: optimize_duration,
        metrics: metrics_of(&optimized)?,
    };

    let pattern = optimized.into_pattern()?;
    let total_duration = clock.elapsed(&run_start);

    let summary = PipelineSummary {
        image_width: pixels.width(),
        image_height: pixels.height(),
        pixel_count: u64::from(pixels.width()) * u64::from(pixels.height()),
        contour_count,
        stitch_count: pattern.stitches.len(),
        color_count: pattern.colors.len(),
    };

    Ok((
        pattern,
        PipelineDiagnostics {
            preprocess,
            edge_detection,
            contour_tracing,
            classification,
            stitch_generation,
            optimization,
            total_duration,
            summary,
        },
    ))
}
