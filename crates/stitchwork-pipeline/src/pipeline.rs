//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::convert_image_to_pattern`] runs every stage in one call.
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use stitchwork_pipeline::{ConversionSettings, PixelBuffer, ProcessingError};
//! # use stitchwork_pipeline::pipeline::Pipeline;
//! # fn run(pixels: &PixelBuffer) -> Result<(), ProcessingError> {
//! let pattern = Pipeline::new(pixels, ConversionSettings::default())?
//!     .preprocess()
//!     .detect_edges()
//!     .trace_contours()?
//!     .classify()
//!     .generate_stitches()?
//!     .optimize()
//!     .into_pattern()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages). Raster intermediates are dropped as
//! soon as the vector stages no longer need them, so only the current
//! stage's output is held.
//!
//! [`convert_with_progress`] drives the same stages through the
//! [`Stage`] enum, reporting `(stage name, percent)` after each one and
//! honoring a cooperative cancellation flag between stages.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::components::{ComponentStats, remove_small_components};
use crate::contour::ContourTracer;
use crate::diagnostics::{StageMetrics, contour_stats};
use crate::edge::{EdgeThresholds, detect_edges, edge_pixel_count};
use crate::optimize::{OptimizeStats, optimize};
use crate::pattern::{PatternDimensions, PatternMetadata, StitchPattern, StitchPoint};
use crate::smooth::Topology;
use crate::stitch::{GenerationParams, GenerationSummary};
use crate::threshold::INK;
use crate::types::{
    ConversionSettings, Contour, Dimensions, GrayImage, PixelBuffer, ProcessingError,
};
use crate::zone::{StitchZone, ZoneKind, build_zones};

/// Value recorded in [`PatternMetadata::source_format`] for raster input.
pub const SOURCE_FORMAT: &str = "image";

/// Entry point for the typed stage API.
pub struct Pipeline;

impl Pipeline {
    /// Validate `settings` and wrap the caller's pixels in the first stage.
    ///
    /// The buffer is borrowed only until [`Pending::preprocess`] runs.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidInput`] if the settings are out
    /// of range.
    pub fn new(
        pixels: &PixelBuffer,
        settings: ConversionSettings,
    ) -> Result<Pending<'_>, ProcessingError> {
        settings.validate()?;
        Ok(Pending { settings, pixels })
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing, call .preprocess() to continue"]
pub struct Pending<'a> {
    settings: ConversionSettings,
    pixels: &'a PixelBuffer,
}

impl Pending<'_> {
    /// The caller's pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &PixelBuffer {
        self.pixels
    }

    /// The validated settings for this run.
    #[must_use]
    pub const fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Grayscale, smooth, binarize and drop specks.
    ///
    /// Component filtering only runs when the threshold mode produces a
    /// bitmap.
    pub fn preprocess(self) -> Preprocessed {
        let settings = self.settings;
        let gray = crate::grayscale::to_grayscale(self.pixels);
        let smoothed = crate::blur::smooth(&gray, settings.blur_kernel);
        let binary = crate::threshold::binarize(&smoothed, settings.threshold);

        let (bitmap, components) = if settings.threshold.is_binary() {
            remove_small_components(&binary, settings.min_component_area)
        } else {
            (
                binary,
                ComponentStats {
                    found: 0,
                    removed: 0,
                },
            )
        };
        let ink_pixels = bitmap.pixels().filter(|p| p.0[0] == INK).count();

        debug!(
            width = bitmap.width(),
            height = bitmap.height(),
            ink_pixels,
            components = components.found,
            removed = components.removed,
            "preprocessed image"
        );
        Preprocessed {
            settings,
            dimensions: self.pixels.dimensions(),
            bitmap,
            ink_pixels,
            components,
        }
    }
}

// ───────────────────────── Stage 1: Preprocessed ─────────────────────

/// Pipeline state after grayscale, smoothing and thresholding.
#[must_use = "pipeline stages are consumed by advancing, call .detect_edges() to continue"]
pub struct Preprocessed {
    settings: ConversionSettings,
    dimensions: Dimensions,
    bitmap: GrayImage,
    ink_pixels: usize,
    components: ComponentStats,
}

impl Preprocessed {
    /// The binary bitmap (or smoothed grayscale when thresholding is off).
    #[must_use]
    pub const fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }

    /// Source image size in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Advance to edge detection.
    pub fn detect_edges(self) -> EdgesDetected {
        let thresholds = EdgeThresholds::from_edge_threshold(self.settings.edge_threshold);
        let edges = detect_edges(&self.bitmap, thresholds);
        let edge_pixels = edge_pixel_count(&edges);
        debug!(
            high = thresholds.high,
            low = thresholds.low,
            edge_pixels,
            "detected edges"
        );
        EdgesDetected {
            settings: self.settings,
            dimensions: self.dimensions,
            edges,
            edge_pixels,
            thresholds,
        }
    }
}

// ───────────────────────── Stage 2: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
#[must_use = "pipeline stages are consumed by advancing, call .trace_contours() to continue"]
pub struct EdgesDetected {
    settings: ConversionSettings,
    dimensions: Dimensions,
    edges: GrayImage,
    edge_pixels: usize,
    thresholds: EdgeThresholds,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Trace, simplify and smooth contours.
    ///
    /// Contours that fall below three points after simplification are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::NoContoursFound`] if no contour
    /// survives.
    pub fn trace_contours(self) -> Result<ContoursTraced, ProcessingError> {
        let settings = self.settings;
        let traced = settings.contour_tracer.trace(&self.edges);
        let traced_count = traced.len();
        let points_before = traced.iter().map(Contour::len).sum();

        let mut discarded = 0;
        let contours: Vec<Contour> = traced
            .iter()
            .filter_map(|raw| {
                let simplified = crate::simplify::simplify(raw, settings.simplify_tolerance);
                let contour = if settings.smooth_contours {
                    crate::smooth::smooth(&simplified, Topology::Closed)
                } else {
                    simplified
                };
                if contour.len() < 3 {
                    warn!(
                        traced_points = raw.len(),
                        points = contour.len(),
                        "contour collapsed below three points, discarding"
                    );
                    discarded += 1;
                    return None;
                }
                Some(contour)
            })
            .collect();

        debug!(
            tracer = ?settings.contour_tracer,
            traced = traced_count,
            kept = contours.len(),
            discarded,
            "traced contours"
        );
        if contours.is_empty() {
            return Err(ProcessingError::NoContoursFound);
        }

        Ok(ContoursTraced {
            settings,
            dimensions: self.dimensions,
            contours,
            traced_count,
            discarded,
            points_before,
        })
    }
}

// ───────────────────────── Stage 3: ContoursTraced ───────────────────

/// Pipeline state after contour extraction. Coordinates are pixels.
#[must_use = "pipeline stages are consumed by advancing, call .classify() to continue"]
pub struct ContoursTraced {
    settings: ConversionSettings,
    dimensions: Dimensions,
    contours: Vec<Contour>,
    traced_count: usize,
    discarded: usize,
    points_before: usize,
}

impl ContoursTraced {
    /// The simplified, smoothed contours in pixel space.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Millimetres per pixel along each axis.
    #[must_use]
    pub fn scale(&self) -> (f64, f64) {
        (
            self.settings.target_width / f64::from(self.dimensions.width),
            self.settings.target_height / f64::from(self.dimensions.height),
        )
    }

    /// Scale to the target size and classify each contour.
    pub fn classify(self) -> Classified {
        let scale = self.scale();
        let zones = build_zones(
            &self.contours,
            scale,
            self.settings.fill_angle,
            self.settings.density,
        );
        debug!(zones = zones.len(), "classified zones");
        Classified {
            settings: self.settings,
            zones,
            scale,
        }
    }
}

// ───────────────────────── Stage 4: Classified ───────────────────────

/// Pipeline state after zone classification. Coordinates are millimetres.
#[must_use = "pipeline stages are consumed by advancing, call .generate_stitches() to continue"]
pub struct Classified {
    settings: ConversionSettings,
    zones: Vec<StitchZone>,
    scale: (f64, f64),
}

impl Classified {
    /// The classified zones in trace order.
    #[must_use]
    pub fn zones(&self) -> &[StitchZone] {
        &self.zones
    }

    fn count(&self, kind: ZoneKind) -> usize {
        self.zones.iter().filter(|z| z.kind == kind).count()
    }

    /// Generate stitches for every zone.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::NoStitchesGenerated`] if the zones
    /// produce an empty sequence.
    pub fn generate_stitches(self) -> Result<StitchesGenerated, ProcessingError> {
        let params = GenerationParams::from(&self.settings);
        let (stitches, summary) = crate::stitch::generate_stitches(&self.zones, &params);
        if stitches.is_empty() {
            return Err(ProcessingError::NoStitchesGenerated);
        }
        Ok(StitchesGenerated {
            settings: self.settings,
            stitches,
            summary,
        })
    }
}

// ───────────────────────── Stage 5: StitchesGenerated ────────────────

/// Pipeline state after stitch generation.
#[must_use = "pipeline stages are consumed by advancing, call .optimize() to continue"]
pub struct StitchesGenerated {
    settings: ConversionSettings,
    stitches: Vec<StitchPoint>,
    summary: GenerationSummary,
}

impl StitchesGenerated {
    /// The raw generated stitches.
    #[must_use]
    pub fn stitches(&self) -> &[StitchPoint] {
        &self.stitches
    }

    /// Stitch counts per layer.
    #[must_use]
    pub const fn summary(&self) -> GenerationSummary {
        self.summary
    }

    /// Enforce machine stitch-length limits and color stops.
    pub fn optimize(self) -> Optimized {
        let input_count = self.stitches.len();
        let (stitches, stats) = optimize(&self.stitches);
        Optimized {
            settings: self.settings,
            stitches,
            stats,
            input_count,
        }
    }
}

// ───────────────────────── Stage 6: Optimized ────────────────────────

/// Final pipeline state: the machine-ready stitch sequence.
#[must_use = "call .into_pattern() to obtain the stitch pattern"]
pub struct Optimized {
    settings: ConversionSettings,
    stitches: Vec<StitchPoint>,
    stats: OptimizeStats,
    input_count: usize,
}

impl Optimized {
    /// The optimized stitches.
    #[must_use]
    pub fn stitches(&self) -> &[StitchPoint] {
        &self.stitches
    }

    /// What the optimizer changed.
    #[must_use]
    pub const fn stats(&self) -> OptimizeStats {
        self.stats
    }

    /// Assemble the final pattern, sized to the target dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidPattern`] if the result breaks
    /// a pattern invariant.
    pub fn into_pattern(self) -> Result<StitchPattern, ProcessingError> {
        StitchPattern::new(
            self.stitches,
            PatternDimensions {
                width: self.settings.target_width,
                height: self.settings.target_height,
            },
            PatternMetadata {
                name: self.settings.name,
                created_at: None,
                source_format: SOURCE_FORMAT.to_string(),
            },
        )
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 7;

/// The output produced by a single pipeline stage.
#[must_use]
pub enum StageOutput<'a> {
    /// Caller pixels (not yet processed).
    Source {
        /// The input buffer.
        pixels: &'a PixelBuffer,
    },
    /// Preprocessing result.
    Preprocessed {
        /// The binary bitmap.
        bitmap: &'a GrayImage,
    },
    /// Edge detection result.
    EdgesDetected {
        /// The binary edge map.
        edges: &'a GrayImage,
    },
    /// Contour extraction result.
    ContoursTraced {
        /// Contours in pixel space.
        contours: &'a [Contour],
    },
    /// Classification result.
    Classified {
        /// Zones in millimetres.
        zones: &'a [StitchZone],
    },
    /// Generation result.
    StitchesGenerated {
        /// Raw stitches.
        stitches: &'a [StitchPoint],
    },
    /// Optimizer result.
    Optimized {
        /// Final stitches.
        stitches: &'a [StitchPoint],
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// # Loop pattern
///
/// ```rust
/// # use stitchwork_pipeline::{ConversionSettings, PixelBuffer, ProcessingError};
/// # use stitchwork_pipeline::pipeline::{Advance, Pipeline, Stage};
/// # fn run(pixels: &PixelBuffer) -> Result<(), ProcessingError> {
/// let mut stage: Stage = Pipeline::new(pixels, ConversionSettings::default())?.into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let pattern = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Short stage name reported to progress callbacks (e.g. `"edges"`).
    const NAME: &'static str;

    /// Zero-based index of this stage (`0` for Pending through `6` for
    /// Optimized).
    const INDEX: usize;

    /// Overall completion once this stage has been reached, `0..=100`.
    const PERCENT: u8;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for [`Pending`], which has not done any work.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(None)` if already at the final stage. The next stage
    /// never borrows the input pixels.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::NoContoursFound`] or
    /// [`ProcessingError::NoStitchesGenerated`] from the fallible stages.
    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError>;

    /// Run all remaining stages and assemble the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] if any remaining stage fails.
    fn complete(self) -> Result<StitchPattern, ProcessingError>;
}

impl PipelineStage for Pending<'_> {
    const NAME: &'static str = "source";
    const INDEX: usize = 0;
    const PERCENT: u8 = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            pixels: self.pixels,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::Preprocessed(self.preprocess())))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.preprocess().complete()
    }
}

impl PipelineStage for Preprocessed {
    const NAME: &'static str = "preprocess";
    const INDEX: usize = 1;
    const PERCENT: u8 = 15;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Preprocessed {
            bitmap: &self.bitmap,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Preprocess {
            width: self.dimensions.width,
            height: self.dimensions.height,
            blur_kernel: self.settings.blur_kernel,
            threshold: self.settings.threshold,
            ink_pixel_count: self.ink_pixels,
            components_found: self.components.found,
            components_removed: self.components.removed,
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::EdgesDetected(self.detect_edges())))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.detect_edges().complete()
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &'static str = "edges";
    const INDEX: usize = 2;
    const PERCENT: u8 = 30;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::EdgesDetected { edges: &self.edges }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let (w, h) = self.edges.dimensions();
        Some(StageMetrics::EdgeDetection {
            low_threshold: self.thresholds.low,
            high_threshold: self.thresholds.high,
            edge_pixel_count: self.edge_pixels,
            total_pixel_count: w as usize * h as usize,
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::ContoursTraced(self.trace_contours()?)))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.trace_contours()?.complete()
    }
}

impl PipelineStage for ContoursTraced {
    const NAME: &'static str = "contours";
    const INDEX: usize = 3;
    const PERCENT: u8 = 50;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::ContoursTraced {
            contours: &self.contours,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let stats = contour_stats(&self.contours);
        Some(StageMetrics::ContourTracing {
            tracer: self.settings.contour_tracer,
            traced_count: self.traced_count,
            discarded_count: self.discarded,
            contour_count: self.contours.len(),
            points_before: self.points_before,
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::Classified(self.classify())))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.classify().complete()
    }
}

impl PipelineStage for Classified {
    const NAME: &'static str = "zones";
    const INDEX: usize = 4;
    const PERCENT: u8 = 60;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Classified { zones: &self.zones }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Classification {
            scale_x: self.scale.0,
            scale_y: self.scale.1,
            fill_count: self.count(ZoneKind::Fill),
            satin_count: self.count(ZoneKind::Satin),
            running_count: self.count(ZoneKind::Running),
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::StitchesGenerated(self.generate_stitches()?)))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.generate_stitches()?.complete()
    }
}

impl PipelineStage for StitchesGenerated {
    const NAME: &'static str = "stitches";
    const INDEX: usize = 5;
    const PERCENT: u8 = 85;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::StitchesGenerated {
            stitches: &self.stitches,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::StitchGeneration {
            underlay: self.summary.underlay,
            fill: self.summary.fill,
            satin: self.summary.satin,
            running: self.summary.running,
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(Some(Stage::Optimized(self.optimize())))
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.optimize().complete()
    }
}

impl PipelineStage for Optimized {
    const NAME: &'static str = "optimize";
    const INDEX: usize = 6;
    const PERCENT: u8 = 100;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Optimized {
            stitches: &self.stitches,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Optimization {
            input_count: self.input_count,
            output_count: self.stitches.len(),
            dropped: self.stats.dropped,
            converted_to_jump: self.stats.converted_to_jump,
            stops_inserted: self.stats.stops_inserted,
        })
    }

    fn next(self) -> Result<Option<Stage<'static>>, ProcessingError> {
        Ok(None)
    }

    fn complete(self) -> Result<StitchPattern, ProcessingError> {
        self.into_pattern()
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Only [`Stage::Pending`] borrows the caller's pixels; every later
/// stage owns its data.
#[must_use]
pub enum Stage<'a> {
    /// See [`Pending`].
    Pending(Pending<'a>),
    /// See [`Preprocessed`].
    Preprocessed(Preprocessed),
    /// See [`EdgesDetected`].
    EdgesDetected(EdgesDetected),
    /// See [`ContoursTraced`].
    ContoursTraced(ContoursTraced),
    /// See [`Classified`].
    Classified(Classified),
    /// See [`StitchesGenerated`].
    StitchesGenerated(StitchesGenerated),
    /// See [`Optimized`].
    Optimized(Optimized),
}

/// Compile-time guard: adding a [`Stage`] variant makes this match
/// non-exhaustive until [`STAGE_COUNT`] is revisited.
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage<'_>) {
    match s {
        Stage::Pending(_)
        | Stage::Preprocessed(_)
        | Stage::EdgesDetected(_)
        | Stage::ContoursTraced(_)
        | Stage::Classified(_)
        | Stage::StitchesGenerated(_)
        | Stage::Optimized(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance<'a> {
    /// The pipeline advanced to this next stage.
    Next(Stage<'a>),
    /// The pipeline was already at the final stage.
    Complete(Stage<'a>),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Preprocessed(s) => s.$method($($arg),*),
            Self::EdgesDetected(s) => s.$method($($arg),*),
            Self::ContoursTraced(s) => s.$method($($arg),*),
            Self::Classified(s) => s.$method($($arg),*),
            Self::StitchesGenerated(s) => s.$method($($arg),*),
            Self::Optimized(s) => s.$method($($arg),*),
        }
    };
}

impl<'a> Stage<'a> {
    /// Name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// Overall completion at the current stage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        delegate!(self, percent)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Optimized(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(None)` if already complete (the final stage is
    /// consumed).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, ProcessingError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance<'a>, ProcessingError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete stages always return Ok(Some(_)) from next().
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] if any remaining stage fails.
    pub fn complete(self) -> Result<StitchPattern, ProcessingError> {
        delegate!(self, complete)
    }
}

// Lets the macro call `.name()` etc. on `&self`; associated constants
// aren't reachable as `self.NAME`.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
    fn percent(&self) -> u8;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }

    fn percent(&self) -> u8 {
        T::PERCENT
    }
}

impl<'a> From<Pending<'a>> for Stage<'a> {
    fn from(s: Pending<'a>) -> Self {
        Self::Pending(s)
    }
}

impl From<Preprocessed> for Stage<'_> {
    fn from(s: Preprocessed) -> Self {
        Self::Preprocessed(s)
    }
}

impl From<EdgesDetected> for Stage<'_> {
    fn from(s: EdgesDetected) -> Self {
        Self::EdgesDetected(s)
    }
}

impl From<ContoursTraced> for Stage<'_> {
    fn from(s: ContoursTraced) -> Self {
        Self::ContoursTraced(s)
    }
}

impl From<Classified> for Stage<'_> {
    fn from(s: Classified) -> Self {
        Self::Classified(s)
    }
}

impl From<StitchesGenerated> for Stage<'_> {
    fn from(s: StitchesGenerated) -> Self {
        Self::StitchesGenerated(s)
    }
}

impl From<Optimized> for Stage<'_> {
    fn from(s: Optimized) -> Self {
        Self::Optimized(s)
    }
}

/// Run the whole conversion, reporting progress and honoring cancellation.
///
/// `on_progress(stage, percent)` is called after each stage completes,
/// ending with `("optimize", 100)`. `cancel` is checked before every
/// stage; once set, the run stops and all partial state is dropped.
///
/// # Errors
///
/// Returns [`ProcessingError::Cancelled`] if `cancel` was observed set,
/// otherwise the same errors as [`crate::convert_image_to_pattern`].
pub fn convert_with_progress(
    pixels: &PixelBuffer,
    settings: &ConversionSettings,
    mut on_progress: impl FnMut(&'static str, u8),
    cancel: &AtomicBool,
) -> Result<StitchPattern, ProcessingError> {
    let mut stage: Stage<'_> = Pipeline::new(pixels, settings.clone())?.into();
    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!(stage = stage.name(), "conversion cancelled");
            return Err(ProcessingError::Cancelled);
        }
        match stage.advance()? {
            Advance::Next(next) => {
                on_progress(next.name(), next.percent());
                stage = next;
            }
            Advance::Complete(done) => return done.complete(),
        }
    }
}
