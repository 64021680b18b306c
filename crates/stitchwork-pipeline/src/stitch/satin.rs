//! Satin: a plain zig-zag along the outline.
//!
//! The outline is re-sampled like a running stitch and every sample is
//! pushed half the column width off the path, alternating sides. There
//! is no column-width modelling and no pull compensation.

use crate::pattern::{StitchKind, StitchPoint};
use crate::stitch::running::resample_closed;
use crate::types::{Contour, Point, ThreadColor};

/// Zig-zag `width` wide along `contour`, one swing per `spacing`.
///
/// The first stitch is a `Jump`; the rest are `Normal`.
#[must_use = "returns the satin stitches"]
pub fn satin(contour: &Contour, spacing: f64, width: f64, color: ThreadColor) -> Vec<StitchPoint> {
    let samples = resample_closed(contour, spacing);
    let n = samples.len();
    if n < 2 {
        return Vec::new();
    }
    let half = width / 2.0;

    samples
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            // Central difference; the ring's duplicated endpoint is skipped
            // so the seam sees its true neighbors.
            let prev = if i == 0 { samples[n - 2] } else { samples[i - 1] };
            let next = if i == n - 1 { samples[1] } else { samples[i + 1] };
            let offset = perpendicular(prev, next) * if i % 2 == 0 { half } else { -half };
            let swung = Point::new(p.x + offset.0, p.y + offset.1);
            let kind = if i == 0 {
                StitchKind::Jump
            } else {
                StitchKind::Normal
            };
            StitchPoint::at(swung, kind, color)
        })
        .collect()
}

/// Unit normal of the direction `a -> b`, or zero when they coincide.
fn perpendicular(a: Point, b: Point) -> Normal {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len > 0.0 {
        Normal(-dy / len, dx / len)
    } else {
        Normal(0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Normal(f64, f64);

impl std::ops::Mul<f64> for Normal {
    type Output = Self;

    fn mul(self, k: f64) -> Self {
        Self(self.0 * k, self.1 * k)
    }
}
