//! stitchwork-pipeline: Pure image-to-stitch conversion pipeline (sans-IO).
//!
//! Converts a raster image into an ordered embroidery stitch sequence
//! through:
//! grayscale -> smoothing -> threshold -> speck removal -> edge detection ->
//! contour tracing -> simplification -> smoothing -> zone classification ->
//! stitch generation -> optimization.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Encoding to machine file
//! formats lives in `stitchwork-export`.

pub mod blur;
pub mod components;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod optimize;
pub mod pattern;
pub mod pipeline;
pub mod simplify;
pub mod smooth;
pub mod stitch;
pub mod threshold;
pub mod types;
pub mod zone;

pub use blur::BlurKernel;
pub use contour::{ContourTracer, ContourTracerKind};
pub use pattern::{PatternDimensions, PatternMetadata, StitchKind, StitchPattern, StitchPoint};
pub use pipeline::{Pipeline, convert_with_progress};
pub use threshold::ThresholdMode;
pub use types::{
    ConversionSettings, Contour, Dimensions, PixelBuffer, PixelFormat, Point, ProcessingError,
    ThreadColor,
};
pub use zone::{StitchZone, ZoneKind};

/// Run the full conversion pipeline.
///
/// Takes a caller-owned pixel buffer and settings, and produces a
/// [`StitchPattern`] sized to `target_width × target_height` millimetres.
///
/// # Pipeline steps
///
/// 1. Validate settings
/// 2. Grayscale (Rec. 601 weights), smoothing, threshold, speck removal
/// 3. Sobel gradients, non-maximum suppression, hysteresis
/// 4. Contour tracing, Ramer-Douglas-Peucker simplification, smoothing
/// 5. Scale to millimetres and classify each contour as fill, satin or running
/// 6. Generate underlay and top stitches
/// 7. Drop too-short stitches, convert too-long ones to jumps, insert color stops
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidInput`] if the settings are out of range.
/// Returns [`ProcessingError::NoContoursFound`] if no contour survives tracing.
/// Returns [`ProcessingError::NoStitchesGenerated`] if the zones produce no stitches.
pub fn convert_image_to_pattern(
    pixels: &PixelBuffer,
    settings: &ConversionSettings,
) -> Result<StitchPattern, ProcessingError> {
    Pipeline::new(pixels, settings.clone())?
        .preprocess()
        .detect_edges()
        .trace_contours()?
        .classify()
        .generate_stitches()?
        .optimize()
        .into_pattern()
}
