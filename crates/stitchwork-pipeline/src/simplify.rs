//! Contour simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Traced contours carry one point per edge pixel; RDP collapses the
//! straight runs so the stitch generators see polygon corners instead
//! of a pixel staircase.

use crate::types::{Contour, Point};

/// Simplify a contour using the Ramer-Douglas-Peucker algorithm.
///
/// The chord runs from the first point to the last. Points whose
/// perpendicular distance to the chord's line is within `tolerance` are
/// removed, including points that project past either end of the chord.
/// A tolerance of 0.0 removes only points lying exactly on the line.
///
/// Contours with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified contour"]
pub fn simplify(contour: &Contour, tolerance: f64) -> Contour {
    let points = contour.points();
    if points.len() < 3 {
        return contour.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    Contour::new(
        points
            .iter()
            .zip(&kept)
            .filter(|&(_, k)| *k)
            .map(|(&p, _)| p)
            .collect(),
    )
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line through them; ties keep the earliest. If that distance
/// exceeds `tolerance`, the point is kept and both halves are processed.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(p.y - a.y, -(dy * (p.x - a.x)));
    cross.abs() / length_sq.sqrt()
}
