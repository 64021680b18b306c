//! Shared types for the stitchwork conversion pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blur::BlurKernel;
use crate::contour::ContourTracerKind;
use crate::threshold::ThresholdMode;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point.
///
/// Coordinates are pixels while the point belongs to a traced contour and
/// millimetres once the stitch generators have scaled it to the target
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position (grows downward, like image rows).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            (other.x - self.x).mul_add(t, self.x),
            (other.y - self.y).mul_add(t, self.y),
        )
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box of a set of points, or `None` when the set is empty.
    #[must_use]
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(points.iter().fold(init, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            f64::midpoint(self.min_x, self.max_x),
            f64::midpoint(self.min_y, self.max_y),
        )
    }

    /// Length of the diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }
}

/// An implicitly closed ring of points.
///
/// The last point is *not* a repeat of the first; consumers that need
/// the closing edge must wrap around (see [`Contour::edges`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Every edge of the ring including the closing edge `last -> first`.
    ///
    /// A contour with fewer than two points has no edges.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = if self.0.len() < 2 { 0 } else { self.0.len() };
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Enclosed area via the shoelace formula (always non-negative).
    #[must_use]
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(a, b)| a.x.mul_add(b.y, -(b.x * a.y)))
            .sum();
        twice.abs() / 2.0
    }

    /// Sum of all edge lengths including the closing edge.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| a.distance(b)).sum()
    }

    /// Compactness ratio `4π·area / perimeter²`; 1.0 for a circle.
    ///
    /// Degenerate contours (zero perimeter) report 0.0.
    #[must_use]
    pub fn compactness(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter)
    }

    /// Bounding box, or `None` for an empty contour.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.0)
    }

    /// A copy with every coordinate multiplied by `(sx, sy)`.
    #[must_use]
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|p| Point::new(p.x * sx, p.y * sy))
                .collect(),
        )
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Four samples per pixel: red, green, blue, alpha.
    #[default]
    Rgba,
    /// One luminance sample per pixel.
    Gray,
}

impl PixelFormat {
    /// Number of samples per pixel.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Gray => 1,
        }
    }
}

/// Caller-owned raw pixels, row-major.
///
/// The pipeline only borrows the buffer for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw samples.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidInput`] if either dimension is
    /// zero or `samples` does not hold exactly
    /// `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        samples: Vec<u8>,
    ) -> Result<Self, ProcessingError> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidInput(format!(
                "pixel buffer must be non-empty, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.channels()))
            .ok_or_else(|| {
                ProcessingError::InvalidInput(format!("pixel buffer {width}x{height} is too large"))
            })?;
        if samples.len() != expected {
            return Err(ProcessingError::InvalidInput(format!(
                "expected {expected} samples for {width}x{height} {format:?}, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            samples,
        })
    }

    /// Decode PNG, JPEG, BMP or WebP bytes into an RGBA buffer.
    ///
    /// # Errors
    ///
    /// See [`crate::grayscale::decode_image`].
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, ProcessingError> {
        crate::grayscale::decode_image(bytes)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw samples.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Dimensions in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// An sRGB thread color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl ThreadColor {
    /// Black, the default thread.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a color from channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for ThreadColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for ThreadColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for ThreadColor {
    type Err = ProcessingError;

    /// Parse `#rrggbb` or `rrggbb` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || ProcessingError::InvalidInput(format!("invalid color {s:?}"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for ThreadColor {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThreadColor> for String {
    fn from(color: ThreadColor) -> Self {
        color.to_string()
    }
}

/// Settings for one image-to-pattern conversion.
///
/// Field names serialize in camelCase so settings documents written by
/// a browser front end load unchanged. Every field is defaulted, so a
/// partial document is valid JSON input.
///
/// # Validation
///
/// [`validate`](Self::validate) enforces the ranges the settings form
/// is expected to enforce before calling the core:
/// `target_width, target_height ∈ [10, 200]` mm, `density ∈ [1, 10]`,
/// and the stitch budget `width × height × density² ≤ 100000`.
/// [`crate::convert_image_to_pattern`] calls it again on entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionSettings {
    /// Output width in millimetres.
    pub target_width: f64,

    /// Output height in millimetres.
    pub target_height: f64,

    /// Stitches per millimetre. Fill row spacing and stitch spacing are
    /// both `1 / density`.
    pub density: f64,

    /// Hysteresis high threshold for the edge detector (gradient
    /// magnitude). The low threshold is half of it.
    pub edge_threshold: u8,

    /// Fill scan-line angle in degrees.
    pub fill_angle: f64,

    /// Lay a sparse perpendicular fill under the top stitching.
    pub use_underlay: bool,

    /// Fraction of the row spacing by which fill runs are extended at
    /// both ends to counter fabric pull. `0.0..=1.0`.
    pub pull_compensation: f64,

    /// Thread color applied to every generated stitch.
    pub color: ThreadColor,

    /// Smoothing kernel applied before binarization.
    pub blur_kernel: BlurKernel,

    /// How the smoothed grayscale image is binarized.
    pub threshold: ThresholdMode,

    /// Connected foreground regions smaller than this many pixels are
    /// removed from the bitmap. 0 disables the filter.
    pub min_component_area: u32,

    /// Which contour tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,

    /// Ramer-Douglas-Peucker tolerance in pixels.
    pub simplify_tolerance: f64,

    /// Apply a circular 3-point moving average after simplification.
    pub smooth_contours: bool,

    /// Satin column width in millimetres.
    pub satin_width: f64,

    /// Pattern name recorded in metadata and file headers.
    pub name: String,
}

impl ConversionSettings {
    /// Smallest accepted target dimension, millimetres.
    pub const MIN_TARGET_MM: f64 = 10.0;
    /// Largest accepted target dimension, millimetres.
    pub const MAX_TARGET_MM: f64 = 200.0;
    /// Smallest accepted density, stitches per millimetre.
    pub const MIN_DENSITY: f64 = 1.0;
    /// Largest accepted density, stitches per millimetre.
    pub const MAX_DENSITY: f64 = 10.0;
    /// Upper bound on `width × height × density²`.
    pub const MAX_STITCH_BUDGET: f64 = 100_000.0;

    /// Default target width.
    pub const DEFAULT_TARGET_WIDTH: f64 = 50.0;
    /// Default target height.
    pub const DEFAULT_TARGET_HEIGHT: f64 = 50.0;
    /// Default density.
    pub const DEFAULT_DENSITY: f64 = 2.0;
    /// Default edge threshold.
    pub const DEFAULT_EDGE_THRESHOLD: u8 = 128;
    /// Default fill angle.
    pub const DEFAULT_FILL_ANGLE: f64 = 45.0;
    /// Default pull compensation.
    pub const DEFAULT_PULL_COMPENSATION: f64 = 0.15;
    /// Default simplification tolerance.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 1.0;
    /// Default minimum component area.
    pub const DEFAULT_MIN_COMPONENT_AREA: u32 = 4;
    /// Default satin width.
    pub const DEFAULT_SATIN_WIDTH: f64 = 2.0;

    /// Spacing between fill rows and between consecutive stitches, mm.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        1.0 / self.density
    }

    /// Check every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidInput`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), ProcessingError> {
        let size_range = Self::MIN_TARGET_MM..=Self::MAX_TARGET_MM;
        if !size_range.contains(&self.target_width) {
            return Err(out_of_range("targetWidth", self.target_width, &size_range));
        }
        if !size_range.contains(&self.target_height) {
            return Err(out_of_range(
                "targetHeight",
                self.target_height,
                &size_range,
            ));
        }
        let density_range = Self::MIN_DENSITY..=Self::MAX_DENSITY;
        if !density_range.contains(&self.density) {
            return Err(out_of_range("density", self.density, &density_range));
        }
        if !(0.0..=1.0).contains(&self.pull_compensation) {
            return Err(out_of_range(
                "pullCompensation",
                self.pull_compensation,
                &(0.0..=1.0),
            ));
        }
        if !self.fill_angle.is_finite() {
            return Err(ProcessingError::InvalidInput(
                "fillAngle must be finite".to_string(),
            ));
        }
        if !(self.simplify_tolerance.is_finite() && self.simplify_tolerance >= 0.0) {
            return Err(ProcessingError::InvalidInput(
                "simplifyTolerance must be a non-negative number".to_string(),
            ));
        }
        if !(self.satin_width.is_finite() && self.satin_width > 0.0) {
            return Err(ProcessingError::InvalidInput(
                "satinWidth must be positive".to_string(),
            ));
        }
        self.threshold.validate()?;

        let budget = self.target_width * self.target_height * self.density * self.density;
        if budget > Self::MAX_STITCH_BUDGET {
            return Err(ProcessingError::InvalidInput(format!(
                "{}x{} mm at {} st/mm exceeds the stitch budget ({budget:.0} > {})",
                self.target_width,
                self.target_height,
                self.density,
                Self::MAX_STITCH_BUDGET,
            )));
        }
        Ok(())
    }
}

fn out_of_range(
    field: &str,
    value: f64,
    range: &std::ops::RangeInclusive<f64>,
) -> ProcessingError {
    ProcessingError::InvalidInput(format!(
        "{field} must be within [{}, {}], got {value}",
        range.start(),
        range.end(),
    ))
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            target_width: Self::DEFAULT_TARGET_WIDTH,
            target_height: Self::DEFAULT_TARGET_HEIGHT,
            density: Self::DEFAULT_DENSITY,
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
            fill_angle: Self::DEFAULT_FILL_ANGLE,
            use_underlay: true,
            pull_compensation: Self::DEFAULT_PULL_COMPENSATION,
            color: ThreadColor::BLACK,
            blur_kernel: BlurKernel::default(),
            threshold: ThresholdMode::default(),
            min_component_area: Self::DEFAULT_MIN_COMPONENT_AREA,
            contour_tracer: ContourTracerKind::default(),
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            smooth_contours: true,
            satin_width: Self::DEFAULT_SATIN_WIDTH,
            name: "Converted Pattern".to_string(),
        }
    }
}

/// Errors that can occur during conversion or encoding.
///
/// Every variant is a user-actionable condition; nothing is retried.
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// Malformed pixel buffer or out-of-range settings.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failed to decode image bytes into a pixel buffer.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Edge detection and tracing left no usable contour.
    #[error("no contours found in the image; try adjusting the edge threshold")]
    NoContoursFound,

    /// The stitch generators produced an empty sequence.
    #[error("no stitches generated from the traced contours")]
    NoStitchesGenerated,

    /// A pattern failed validation.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// The requested output format tag is not known.
    #[error("unsupported format: {0:?}")]
    UnsupportedFormat(String),

    /// The run was cancelled between stages.
    #[error("conversion cancelled")]
    Cancelled,
}

impl ProcessingError {
    /// Name of the stage that raised the error.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::ImageDecode(_) => "decode",
            Self::NoContoursFound => "contours",
            Self::NoStitchesGenerated => "stitches",
            Self::InvalidPattern(_) => "pattern",
            Self::UnsupportedFormat(_) => "encode",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Serde-compatible proxy for `ProcessingError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead and deserializes as
/// [`ProcessingError::InvalidInput`] carrying that message.
#[derive(Serialize, Deserialize)]
enum ProcessingErrorProxy {
    InvalidInput(String),
    ImageDecode(String),
    NoContoursFound,
    NoStitchesGenerated,
    InvalidPattern(String),
    UnsupportedFormat(String),
    Cancelled,
}

impl Serialize for ProcessingError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::InvalidInput(s) => ProcessingErrorProxy::InvalidInput(s.clone()),
            Self::ImageDecode(e) => ProcessingErrorProxy::ImageDecode(e.to_string()),
            Self::NoContoursFound => ProcessingErrorProxy::NoContoursFound,
            Self::NoStitchesGenerated => ProcessingErrorProxy::NoStitchesGenerated,
            Self::InvalidPattern(s) => ProcessingErrorProxy::InvalidPattern(s.clone()),
            Self::UnsupportedFormat(s) => ProcessingErrorProxy::UnsupportedFormat(s.clone()),
            Self::Cancelled => ProcessingErrorProxy::Cancelled,
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProcessingError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = ProcessingErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            ProcessingErrorProxy::InvalidInput(s) => Self::InvalidInput(s),
            ProcessingErrorProxy::ImageDecode(msg) => {
                Self::InvalidInput(format!("image decode error: {msg}"))
            }
            ProcessingErrorProxy::NoContoursFound => Self::NoContoursFound,
            ProcessingErrorProxy::NoStitchesGenerated => Self::NoStitchesGenerated,
            ProcessingErrorProxy::InvalidPattern(s) => Self::InvalidPattern(s),
            ProcessingErrorProxy::UnsupportedFormat(s) => Self::UnsupportedFormat(s),
            ProcessingErrorProxy::Cancelled => Self::Cancelled,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(side: f64) -> Contour {
        Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ])
    }

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_lerp_endpoints_and_midpoint() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(3.0, 5.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Point::new(2.0, 3.0));
    }

    #[test]
    fn point_non_finite_detected() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, f64::INFINITY).is_finite());
    }

    // --- Contour tests ---

    #[test]
    fn contour_edges_wrap_around() {
        let edges: Vec<_> = square(1.0).edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3], (Point::new(0.0, 1.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn contour_with_one_point_has_no_edges() {
        let c = Contour::new(vec![Point::new(1.0, 1.0)]);
        assert_eq!(c.edges().count(), 0);
        assert!(c.area().abs() < f64::EPSILON);
        assert!(c.compactness().abs() < f64::EPSILON);
    }

    #[test]
    fn square_area_perimeter_compactness() {
        let c = square(10.0);
        assert!((c.area() - 100.0).abs() < 1e-9);
        assert!((c.perimeter() - 40.0).abs() < 1e-9);
        let expected = std::f64::consts::PI / 4.0;
        assert!((c.compactness() - expected).abs() < 1e-9);
    }

    #[test]
    fn area_independent_of_winding() {
        let mut pts = square(4.0).into_points();
        pts.reverse();
        assert!((Contour::new(pts).area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_and_scaling() {
        let c = square(2.0).scaled(3.0, 0.5);
        let b = c.bounds().unwrap();
        assert!((b.width() - 6.0).abs() < f64::EPSILON);
        assert!((b.height() - 1.0).abs() < f64::EPSILON);
        assert_eq!(b.center(), Point::new(3.0, 0.5));
        assert!(Contour::new(vec![]).bounds().is_none());
    }

    // --- PixelBuffer tests ---

    #[test]
    fn pixel_buffer_rejects_zero_dimensions() {
        let result = PixelBuffer::new(0, 10, PixelFormat::Gray, vec![]);
        assert!(matches!(result, Err(ProcessingError::InvalidInput(_))));
    }

    #[test]
    fn pixel_buffer_rejects_wrong_sample_count() {
        let result = PixelBuffer::new(2, 2, PixelFormat::Rgba, vec![0; 15]);
        assert!(matches!(result, Err(ProcessingError::InvalidInput(_))));
    }

    #[test]
    fn pixel_buffer_accepts_exact_sample_count() {
        let buf = PixelBuffer::new(3, 2, PixelFormat::Gray, vec![7; 6]).unwrap();
        assert_eq!(
            buf.dimensions(),
            Dimensions {
                width: 3,
                height: 2
            }
        );
        assert_eq!(buf.samples().len(), 6);
    }

    // --- ThreadColor tests ---

    #[test]
    fn thread_color_parses_with_and_without_hash() {
        assert_eq!(
            "#FF8000".parse::<ThreadColor>().unwrap(),
            ThreadColor::new(255, 128, 0)
        );
        assert_eq!(
            "0a0b0c".parse::<ThreadColor>().unwrap(),
            ThreadColor::new(10, 11, 12)
        );
    }

    #[test]
    fn thread_color_rejects_garbage() {
        for bad in ["", "#12345", "#1234567", "#zzzzzz", "#ééé"] {
            assert!(bad.parse::<ThreadColor>().is_err(), "{bad:?} parsed");
        }
    }

    #[test]
    fn thread_color_displays_lowercase_hex() {
        assert_eq!(ThreadColor::new(255, 0, 171).to_string(), "#ff00ab");
    }

    #[test]
    fn thread_color_serde_as_string() {
        let json = serde_json::to_string(&ThreadColor::new(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: ThreadColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ThreadColor::new(1, 2, 3));
    }

    // --- ConversionSettings tests ---

    #[test]
    fn default_settings_match_reference_dialog() {
        let s = ConversionSettings::default();
        assert!((s.target_width - 50.0).abs() < f64::EPSILON);
        assert!((s.target_height - 50.0).abs() < f64::EPSILON);
        assert!((s.density - 2.0).abs() < f64::EPSILON);
        assert_eq!(s.edge_threshold, 128);
        assert!((s.fill_angle - 45.0).abs() < f64::EPSILON);
        assert!(s.use_underlay);
        assert!((s.pull_compensation - 0.15).abs() < f64::EPSILON);
        assert_eq!(s.color, ThreadColor::BLACK);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn settings_reject_out_of_range_size() {
        let s = ConversionSettings {
            target_width: 5.0,
            ..ConversionSettings::default()
        };
        assert!(matches!(s.validate(), Err(ProcessingError::InvalidInput(_))));
        let s = ConversionSettings {
            target_height: 201.0,
            ..ConversionSettings::default()
        };
        assert!(matches!(s.validate(), Err(ProcessingError::InvalidInput(_))));
    }

    #[test]
    fn settings_reject_out_of_range_density() {
        let s = ConversionSettings {
            density: 0.5,
            ..ConversionSettings::default()
        };
        assert!(s.validate().is_err());
        let s = ConversionSettings {
            density: f64::NAN,
            ..ConversionSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn settings_reject_excessive_stitch_budget() {
        // 100 * 100 * 4^2 = 160000 > 100000
        let s = ConversionSettings {
            target_width: 100.0,
            target_height: 100.0,
            density: 4.0,
            ..ConversionSettings::default()
        };
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("stitch budget"), "{err}");
    }

    #[test]
    fn settings_budget_boundary_is_inclusive() {
        // 200 * 125 * 2^2 = 100000 exactly
        let s = ConversionSettings {
            target_width: 200.0,
            target_height: 125.0,
            density: 2.0,
            ..ConversionSettings::default()
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn settings_deserialize_camel_case_partial_document() {
        let json = r##"{"targetWidth": 80, "density": 3, "useUnderlay": false, "color": "#ff0000"}"##;
        let s: ConversionSettings = serde_json::from_str(json).unwrap();
        assert!((s.target_width - 80.0).abs() < f64::EPSILON);
        assert!((s.target_height - 50.0).abs() < f64::EPSILON);
        assert!((s.density - 3.0).abs() < f64::EPSILON);
        assert!(!s.use_underlay);
        assert_eq!(s.color, ThreadColor::new(255, 0, 0));
    }

    #[test]
    fn settings_serde_round_trip() {
        let s = ConversionSettings {
            fill_angle: 30.0,
            threshold: ThresholdMode::Adaptive {
                window: 15,
                bias: 5.0,
            },
            ..ConversionSettings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: ConversionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    // --- ProcessingError tests ---

    #[test]
    fn error_stage_names() {
        assert_eq!(ProcessingError::NoContoursFound.stage(), "contours");
        assert_eq!(ProcessingError::NoStitchesGenerated.stage(), "stitches");
        assert_eq!(
            ProcessingError::UnsupportedFormat("xyz".into()).stage(),
            "encode"
        );
        assert_eq!(ProcessingError::InvalidPattern(String::new()).stage(), "pattern");
    }

    #[test]
    fn error_no_contours_display_suggests_threshold() {
        let msg = ProcessingError::NoContoursFound.to_string();
        assert!(msg.contains("edge threshold"));
    }

    #[test]
    fn error_serde_round_trip() {
        let err = ProcessingError::UnsupportedFormat("xyz".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: ProcessingError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ProcessingError::UnsupportedFormat(ref s) if s == "xyz"));

        let result: Result<(), ProcessingError> = Err(ProcessingError::Cancelled);
        let json = serde_json::to_string(&result).unwrap();
        let back: Result<(), ProcessingError> = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Err(ProcessingError::Cancelled)));
    }
}
