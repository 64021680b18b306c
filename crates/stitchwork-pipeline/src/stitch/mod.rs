//! Stitch generation: turn classified zones into an ordered stitch list.
//!
//! Output order is machine order:
//!
//! 1. Underlay (when enabled): a sparse fill under every `Fill` zone at
//!    `fill_angle + 90°` and half the density, so the top rows anchor
//!    over it.
//! 2. Each zone in trace order, stitched by its kind.
//!
//! Every generated stitch carries the configured thread color. All
//! coordinates are millimetres.

pub mod fill;
pub mod running;
pub mod satin;

use tracing::debug;

use crate::pattern::StitchPoint;
use crate::types::{ConversionSettings, ThreadColor};
use crate::zone::{StitchZone, ZoneKind};

pub use fill::FillParams;

/// The subset of [`ConversionSettings`] the generators read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Stitches per millimetre.
    pub density: f64,
    /// Fill row angle in degrees.
    pub fill_angle: f64,
    /// Emit an underlay layer first.
    pub use_underlay: bool,
    /// Fill run extension as a fraction of the row spacing.
    pub pull_compensation: f64,
    /// Satin column width in millimetres.
    pub satin_width: f64,
    /// Thread color.
    pub color: ThreadColor,
}

impl From<&ConversionSettings> for GenerationParams {
    fn from(s: &ConversionSettings) -> Self {
        Self {
            density: s.density,
            fill_angle: s.fill_angle,
            use_underlay: s.use_underlay,
            pull_compensation: s.pull_compensation,
            satin_width: s.satin_width,
            color: s.color,
        }
    }
}

impl GenerationParams {
    /// Distance between consecutive stitches and between fill rows.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        1.0 / self.density
    }

    /// Fill settings for the top layer of a zone.
    #[must_use]
    pub fn top_fill(&self, zone: &StitchZone) -> FillParams {
        let density = zone.density.unwrap_or(self.density);
        let spacing = 1.0 / density;
        FillParams {
            angle: zone.angle.unwrap_or(self.fill_angle),
            spacing,
            pull_extension: self.pull_compensation * spacing,
        }
    }

    /// Fill settings for the underlay: perpendicular rows at half density.
    #[must_use]
    pub fn underlay_fill(&self) -> FillParams {
        FillParams {
            angle: (self.fill_angle + 90.0) % 360.0,
            spacing: 1.0 / (self.density * 0.5),
            pull_extension: 0.0,
        }
    }
}

/// Stitch counts per layer, kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Underlay stitches.
    pub underlay: usize,
    /// Fill stitches.
    pub fill: usize,
    /// Satin stitches.
    pub satin: usize,
    /// Running stitches.
    pub running: usize,
}

impl GenerationSummary {
    /// Sum over all layers.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.underlay + self.fill + self.satin + self.running
    }
}

/// Generate the full stitch sequence for `zones`.
///
/// An empty result is returned as-is; the caller decides whether that
/// is an error.
#[must_use = "returns the generated stitches"]
pub fn generate_stitches(
    zones: &[StitchZone],
    params: &GenerationParams,
) -> (Vec<StitchPoint>, GenerationSummary) {
    let mut stitches = Vec::new();
    let mut summary = GenerationSummary::default();

    if params.use_underlay {
        let underlay = params.underlay_fill();
        for zone in zones.iter().filter(|z| z.kind == ZoneKind::Fill) {
            let layer = fill::fill(&zone.contour, &underlay, params.color);
            summary.underlay += layer.len();
            stitches.extend(layer);
        }
    }

    for zone in zones {
        let layer = match zone.kind {
            ZoneKind::Fill => {
                let layer = fill::fill(&zone.contour, &params.top_fill(zone), params.color);
                summary.fill += layer.len();
                layer
            }
            ZoneKind::Satin => {
                let layer = satin::satin(
                    &zone.contour,
                    params.spacing(),
                    params.satin_width,
                    params.color,
                );
                summary.satin += layer.len();
                layer
            }
            ZoneKind::Running => {
                let layer = running::running(&zone.contour, params.spacing(), params.color);
                summary.running += layer.len();
                layer
            }
        };
        stitches.extend(layer);
    }

    debug!(
        underlay = summary.underlay,
        fill = summary.fill,
        satin = summary.satin,
        running = summary.running,
        "generated stitches"
    );
    (stitches, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::StitchKind;
    use crate::types::{Contour, Point};

    fn params(use_underlay: bool) -> GenerationParams {
        GenerationParams {
            density: 2.0,
            fill_angle: 45.0,
            use_underlay,
            pull_compensation: 0.0,
            satin_width: 2.0,
            color: ThreadColor::new(10, 20, 30),
        }
    }

    fn circle_zone(radius: f64) -> StitchZone {
        let contour = Contour::new(
            (0..48)
                .map(|i| {
                    let t = std::f64::consts::TAU * f64::from(i) / 48.0;
                    Point::new(radius.mul_add(t.cos(), 20.0), radius.mul_add(t.sin(), 20.0))
                })
                .collect(),
        );
        StitchZone {
            contour,
            kind: ZoneKind::Fill,
            angle: Some(45.0),
            density: Some(2.0),
        }
    }

    fn square_zone() -> StitchZone {
        StitchZone {
            contour: Contour::new(vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ]),
            kind: ZoneKind::Running,
            angle: None,
            density: None,
        }
    }

    #[test]
    fn underlay_params_are_perpendicular_and_sparser() {
        let u = params(true).underlay_fill();
        assert!((u.angle - 135.0).abs() < f64::EPSILON);
        assert!((u.spacing - 1.0).abs() < f64::EPSILON);
        let wrapped = GenerationParams {
            fill_angle: 300.0,
            ..params(true)
        };
        assert!((wrapped.underlay_fill().angle - 30.0).abs() < 1e-9);
    }

    #[test]
    fn underlay_comes_first() {
        let zones = [circle_zone(8.0)];
        let (without, s0) = generate_stitches(&zones, &params(false));
        let (with, s1) = generate_stitches(&zones, &params(true));
        assert_eq!(s0.underlay, 0);
        assert!(s1.underlay > 0);
        assert_eq!(with.len(), without.len() + s1.underlay);
        // The top layer is unchanged and sits after the underlay.
        assert_eq!(&with[s1.underlay..], &without[..]);
    }

    #[test]
    fn underlay_skips_non_fill_zones() {
        let (_, summary) = generate_stitches(&[square_zone()], &params(true));
        assert_eq!(summary.underlay, 0);
        assert!(summary.running > 0);
    }

    #[test]
    fn every_stitch_carries_the_color() {
        let (stitches, summary) =
            generate_stitches(&[circle_zone(5.0), square_zone()], &params(true));
        assert_eq!(stitches.len(), summary.total());
        assert!(stitches.iter().all(|s| s.color == ThreadColor::new(10, 20, 30)));
    }

    #[test]
    fn running_zone_starts_with_jump() {
        let (stitches, _) = generate_stitches(&[square_zone()], &params(false));
        assert_eq!(stitches[0].kind, StitchKind::Jump);
        assert!(stitches[1..].iter().all(|s| s.kind == StitchKind::Normal));
    }

    #[test]
    fn no_zones_no_stitches() {
        let (stitches, summary) = generate_stitches(&[], &params(true));
        assert!(stitches.is_empty());
        assert_eq!(summary.total(), 0);
    }
}
