//! The stitch pattern model handed to encoders and previewers.

use serde::{Deserialize, Serialize};

use crate::types::{Point, ProcessingError, ThreadColor};

/// What the machine does at a stitch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchKind {
    /// Needle penetration, thread laid from the previous point.
    Normal,
    /// Move with the needle raised.
    Jump,
    /// Cut the thread.
    Trim,
    /// Pause for a thread change.
    Stop,
    /// End of design.
    End,
}

/// One entry in the machine stitch sequence, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StitchPoint {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Stitch type.
    pub kind: StitchKind,
    /// Thread color in use at this point.
    pub color: ThreadColor,
}

impl StitchPoint {
    /// Create a stitch point.
    #[must_use]
    pub const fn new(x: f64, y: f64, kind: StitchKind, color: ThreadColor) -> Self {
        Self { x, y, kind, color }
    }

    /// Create a stitch point at `p`.
    #[must_use]
    pub const fn at(p: Point, kind: StitchKind, color: ThreadColor) -> Self {
        Self::new(p.x, p.y, kind, color)
    }

    /// Position as a [`Point`].
    #[must_use]
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Same position and color, different kind.
    #[must_use]
    pub const fn with_kind(self, kind: StitchKind) -> Self {
        Self { kind, ..self }
    }
}

/// Physical design size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternDimensions {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Descriptive pattern data carried into file headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMetadata {
    /// Design name.
    pub name: String,
    /// ISO-8601 creation timestamp, if the caller supplied one.
    pub created_at: Option<String>,
    /// Where the pattern came from (`"image"` for converted rasters).
    pub source_format: String,
}

/// An ordered stitch sequence plus the data encoders need around it.
///
/// Sequence order is the literal machine order. Invariants, checked by
/// [`validate`](Self::validate): stitches and colors are non-empty, both
/// dimensions are positive, and every coordinate is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchPattern {
    /// Stitches in machine order.
    pub stitches: Vec<StitchPoint>,
    /// Distinct thread colors in order of first use.
    pub colors: Vec<ThreadColor>,
    /// Physical design size.
    pub dimensions: PatternDimensions,
    /// Name, timestamp and source.
    pub metadata: PatternMetadata,
}

impl StitchPattern {
    /// Build a pattern, deriving the color list from the stitches.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidPattern`] if the result breaks
    /// any invariant.
    pub fn new(
        stitches: Vec<StitchPoint>,
        dimensions: PatternDimensions,
        metadata: PatternMetadata,
    ) -> Result<Self, ProcessingError> {
        let colors = colors_in_first_use_order(&stitches);
        let pattern = Self {
            stitches,
            colors,
            dimensions,
            metadata,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Attach a creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, timestamp: impl Into<String>) -> Self {
        self.metadata.created_at = Some(timestamp.into());
        self
    }

    /// Check every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidPattern`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.stitches.is_empty() {
            return Err(ProcessingError::InvalidPattern(
                "pattern has no stitches".to_string(),
            ));
        }
        if self.colors.is_empty() {
            return Err(ProcessingError::InvalidPattern(
                "pattern has no colors".to_string(),
            ));
        }
        let PatternDimensions { width, height } = self.dimensions;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(ProcessingError::InvalidPattern(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if let Some(i) = self.stitches.iter().position(|s| !s.point().is_finite()) {
            return Err(ProcessingError::InvalidPattern(format!(
                "stitch {i} has a non-finite coordinate"
            )));
        }
        Ok(())
    }

    /// Number of stitches of the given kind.
    #[must_use]
    pub fn count(&self, kind: StitchKind) -> usize {
        self.stitches.iter().filter(|s| s.kind == kind).count()
    }

    /// Index of `color` in the palette, if present.
    #[must_use]
    pub fn color_index(&self, color: ThreadColor) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }
}

/// Distinct colors of `stitches`, first use first.
#[must_use]
pub fn colors_in_first_use_order(stitches: &[StitchPoint]) -> Vec<ThreadColor> {
    let mut colors: Vec<ThreadColor> = Vec::new();
    for s in stitches {
        if !colors.contains(&s.color) {
            colors.push(s.color);
        }
    }
    colors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: ThreadColor = ThreadColor::new(255, 0, 0);
    const BLUE: ThreadColor = ThreadColor::new(0, 0, 255);

    fn metadata() -> PatternMetadata {
        PatternMetadata {
            name: "test".to_string(),
            created_at: None,
            source_format: "image".to_string(),
        }
    }

    fn dims() -> PatternDimensions {
        PatternDimensions {
            width: 10.0,
            height: 10.0,
        }
    }

    #[test]
    fn colors_follow_first_use() {
        let stitches = vec![
            StitchPoint::new(0.0, 0.0, StitchKind::Jump, BLUE),
            StitchPoint::new(1.0, 0.0, StitchKind::Normal, RED),
            StitchPoint::new(2.0, 0.0, StitchKind::Normal, BLUE),
        ];
        let pattern = StitchPattern::new(stitches, dims(), metadata()).unwrap();
        assert_eq!(pattern.colors, vec![BLUE, RED]);
        assert_eq!(pattern.color_index(RED), Some(1));
    }

    #[test]
    fn empty_stitches_rejected() {
        let result = StitchPattern::new(vec![], dims(), metadata());
        assert!(matches!(result, Err(ProcessingError::InvalidPattern(_))));
    }

    #[test]
    fn non_positive_dimensions_rejected() {
        let stitches = vec![StitchPoint::new(0.0, 0.0, StitchKind::Normal, RED)];
        let zero = PatternDimensions {
            width: 0.0,
            height: 5.0,
        };
        assert!(StitchPattern::new(stitches, zero, metadata()).is_err());
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        let stitches = vec![
            StitchPoint::new(0.0, 0.0, StitchKind::Normal, RED),
            StitchPoint::new(f64::NAN, 0.0, StitchKind::Normal, RED),
        ];
        let err = StitchPattern::new(stitches, dims(), metadata()).unwrap_err();
        assert!(err.to_string().contains("stitch 1"), "{err}");
    }

    #[test]
    fn empty_colors_rejected_by_validate() {
        let mut pattern = StitchPattern::new(
            vec![StitchPoint::new(0.0, 0.0, StitchKind::Normal, RED)],
            dims(),
            metadata(),
        )
        .unwrap();
        pattern.colors.clear();
        assert!(pattern.validate().is_err());
    }

    #[test]
    fn created_at_attached() {
        let pattern = StitchPattern::new(
            vec![StitchPoint::new(0.0, 0.0, StitchKind::Normal, RED)],
            dims(),
            metadata(),
        )
        .unwrap()
        .with_created_at("2024-01-01T00:00:00Z");
        assert_eq!(
            pattern.metadata.created_at.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn stitch_kind_serializes_lowercase() {
        let s = StitchPoint::new(1.0, 2.0, StitchKind::Jump, RED);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r##"{"x":1.0,"y":2.0,"kind":"jump","color":"#ff0000"}"##);
    }
}
