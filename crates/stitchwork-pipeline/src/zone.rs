//! Stitch zone classification.
//!
//! Each traced contour is scaled from pixels to millimetres and labelled
//! with the stitch type that suits its shape, judged by compactness
//! `4π·area / perimeter²`:
//!
//! | compactness   | kind      |
//! |---------------|-----------|
//! | > 0.8         | `Fill`    |
//! | < 0.2         | `Satin`   |
//! | otherwise     | `Running` |
//!
//! A square scores π/4 ≈ 0.785 and therefore runs as an outline.

use serde::{Deserialize, Serialize};

use crate::types::Contour;

/// Compactness above which a shape is filled.
pub const FILL_COMPACTNESS: f64 = 0.8;

/// Compactness below which a shape is stitched as a satin column.
pub const SATIN_COMPACTNESS: f64 = 0.2;

/// How a zone is stitched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Parallel tatami rows covering the area.
    Fill,
    /// Zig-zag column along the outline.
    Satin,
    /// Single running stitch along the outline.
    Running,
}

impl ZoneKind {
    /// Classify a ring by its compactness.
    #[must_use]
    pub fn classify(contour: &Contour) -> Self {
        let ratio = contour.compactness();
        if ratio > FILL_COMPACTNESS {
            Self::Fill
        } else if ratio < SATIN_COMPACTNESS {
            Self::Satin
        } else {
            Self::Running
        }
    }
}

/// A contour in millimetres plus the way it will be stitched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchZone {
    /// Outline in millimetres.
    pub contour: Contour,
    /// Derived stitch type.
    pub kind: ZoneKind,
    /// Fill row angle in degrees; set for `Fill` zones.
    pub angle: Option<f64>,
    /// Stitches per millimetre; set for `Fill` zones.
    pub density: Option<f64>,
}

/// Scale pixel contours to the target size and classify them.
///
/// Classification happens after scaling, so a non-uniform aspect change
/// can move a shape between kinds.
#[must_use]
pub fn build_zones(
    contours: &[Contour],
    (sx, sy): (f64, f64),
    fill_angle: f64,
    density: f64,
) -> Vec<StitchZone> {
    contours
        .iter()
        .map(|c| {
            let contour = c.scaled(sx, sy);
            let kind = ZoneKind::classify(&contour);
            let fill = kind == ZoneKind::Fill;
            StitchZone {
                contour,
                kind,
                angle: fill.then_some(fill_angle),
                density: fill.then_some(density),
            }
        })
        .collect()
}
