//! Running stitch: even re-sampling of a closed outline.

use crate::pattern::{StitchKind, StitchPoint};
use crate::types::{Contour, Point, ThreadColor};

/// Re-sample a closed ring at even arc-length intervals.
///
/// The ring is walked from its first point around the closing edge and
/// back, total length `L`. It is cut into `n = max(2, ceil(L / spacing))`
/// equal intervals and the `n + 1` boundary points are returned, so the
/// first and last points coincide and no sample lies past `L`. A ring
/// with zero length yields no points.
#[must_use = "returns the sampled points"]
pub fn resample_closed(contour: &Contour, spacing: f64) -> Vec<Point> {
    let segments: Vec<(Point, Point, f64)> = contour
        .edges()
        .map(|(a, b)| (a, b, a.distance(b)))
        .collect();
    let total: f64 = segments.iter().map(|s| s.2).sum();
    if !(total > 0.0 && spacing > 0.0) {
        return Vec::new();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = ((total / spacing).ceil() as u32).max(2);
    let increment = total / f64::from(n);

    let mut out = Vec::with_capacity(n as usize + 1);
    let mut segment = 0;
    let mut consumed = 0.0;
    for i in 0..n {
        let target = f64::from(i) * increment;
        while segment + 1 < segments.len() && consumed + segments[segment].2 < target {
            consumed += segments[segment].2;
            segment += 1;
        }
        let (a, b, len) = segments[segment];
        let t = if len > 0.0 {
            ((target - consumed) / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(a.lerp(b, t));
    }
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

/// Running stitch around `contour`: a `Jump` to the start, then
/// `Normal` stitches every `spacing` or less, closing back on the start.
#[must_use = "returns the running stitches"]
pub fn running(contour: &Contour, spacing: f64, color: ThreadColor) -> Vec<StitchPoint> {
    resample_closed(contour, spacing)
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let kind = if i == 0 {
                StitchKind::Jump
            } else {
                StitchKind::Normal
            };
            StitchPoint::at(p, kind, color)
        })
        .collect()
}

#[cfg(test)]
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

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn square_sampled_at_exact_spacing() {
        let pts = resample_closed(&square(10.0), 1.0);
        assert_eq!(pts.len(), 41);
        assert!(close(pts[10], Point::new(10.0, 0.0)));
        assert!(close(pts[20], Point::new(10.0, 10.0)));
        assert!(close(pts[30], Point::new(0.0, 10.0)));
        assert!(close(pts[40], Point::new(0.0, 0.0)));
    }

    #[test]
    fn samples_are_evenly_spaced_along_straight_edges() {
        let pts = resample_closed(&square(3.0), 0.7);
        // L = 12, n = ceil(12 / 0.7) = 18, increment = 2/3.
        assert_eq!(pts.len(), 19);
        assert!(close(pts[1], Point::new(2.0 / 3.0, 0.0)));
        for pair in pts.windows(2) {
            assert!(pair[0].distance(pair[1]) <= 0.7 + 1e-9);
        }
    }

    #[test]
    fn short_rings_still_get_two_intervals() {
        let tiny = Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.1, 0.0),
            Point::new(0.1, 0.1),
        ]);
        assert_eq!(resample_closed(&tiny, 5.0).len(), 3);
    }

    #[test]
    fn zero_length_ring_yields_nothing() {
        let dot = Contour::new(vec![Point::new(1.0, 1.0); 4]);
        assert!(resample_closed(&dot, 1.0).is_empty());
        assert!(running(&dot, 1.0, ThreadColor::BLACK).is_empty());
    }

    #[test]
    fn running_starts_with_jump_then_normals() {
        let stitches = running(&square(5.0), 0.5, ThreadColor::BLACK);
        assert_eq!(stitches[0].kind, StitchKind::Jump);
        assert!(stitches[1..].iter().all(|s| s.kind == StitchKind::Normal));
        assert_eq!(stitches.len(), 41);
    }
}
