//! Millimetre patterns to integer machine units.
//!
//! Every writer starts from the same normalized view: the pattern is
//! translated so its smallest x and y are zero, then scaled to 0.1 mm
//! units with `round(value * 10)`. Dimensions go through the same
//! scaling without the translation.

use stitchwork_pipeline::{ProcessingError, StitchKind, StitchPattern, ThreadColor};

/// Machine units per millimetre.
pub const UNITS_PER_MM: f64 = 10.0;

/// One stitch in 0.1 mm units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineStitch {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Stitch type, unchanged from the source pattern.
    pub kind: StitchKind,
    /// Index into [`MachinePattern::colors`].
    pub color: usize,
}

/// Extent of the stitch positions, in machine units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineBounds {
    /// Smallest x; 0 after normalization.
    pub min_x: i32,
    /// Largest x, in 0.1 mm.
    pub max_x: i32,
    /// Smallest y; 0 after normalization.
    pub min_y: i32,
    /// Largest y, in 0.1 mm.
    pub max_y: i32,
}

/// A validated pattern in machine units, ready for a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachinePattern {
    /// Stitches in machine order.
    pub stitches: Vec<MachineStitch>,
    /// Thread colors, first use first.
    pub colors: Vec<ThreadColor>,
    /// Design width in 0.1 mm.
    pub width: i32,
    /// Design height in 0.1 mm.
    pub height: i32,
    /// Design name.
    pub name: String,
}

impl MachinePattern {
    /// Bounding box of every stitch position.
    #[must_use]
    pub fn bounds(&self) -> MachineBounds {
        let xs = || self.stitches.iter().map(|s| s.x);
        let ys = || self.stitches.iter().map(|s| s.y);
        MachineBounds {
            min_x: xs().min().unwrap_or(0),
            max_x: xs().max().unwrap_or(0),
            min_y: ys().min().unwrap_or(0),
            max_y: ys().max().unwrap_or(0),
        }
    }
}

/// Convert a millimetre value to machine units.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] if the rounded value does
/// not fit in an `i32`.
#[allow(clippy::cast_possible_truncation)]
pub fn to_units(mm: f64) -> Result<i32, ProcessingError> {
    let units = (mm * UNITS_PER_MM).round();
    if units.is_finite() && units >= f64::from(i32::MIN) && units <= f64::from(i32::MAX) {
        Ok(units as i32)
    } else {
        Err(ProcessingError::InvalidPattern(format!(
            "{mm} mm is outside the machine coordinate range"
        )))
    }
}

/// Validate `pattern` and convert it to machine units.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] if the pattern breaks an
/// invariant, a coordinate overflows, or a stitch uses a color missing
/// from the pattern's color list.
pub fn normalize(pattern: &StitchPattern) -> Result<MachinePattern, ProcessingError> {
    pattern.validate()?;

    let min_x = pattern.stitches.iter().map(|s| s.x).fold(f64::INFINITY, f64::min);
    let min_y = pattern.stitches.iter().map(|s| s.y).fold(f64::INFINITY, f64::min);

    let stitches = pattern
        .stitches
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let color = pattern.color_index(s.color).ok_or_else(|| {
                ProcessingError::InvalidPattern(format!(
                    "stitch {i} uses color {} missing from the pattern colors",
                    s.color
                ))
            })?;
            Ok(MachineStitch {
                x: to_units(s.x - min_x)?,
                y: to_units(s.y - min_y)?,
                kind: s.kind,
                color,
            })
        })
        .collect::<Result<Vec<_>, ProcessingError>>()?;

    Ok(MachinePattern {
        stitches,
        colors: pattern.colors.clone(),
        width: to_units(pattern.dimensions.width)?,
        height: to_units(pattern.dimensions.height)?,
        name: pattern.metadata.name.clone(),
    })
}
