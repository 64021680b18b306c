//! Tatami fill: parallel rows clipped to a ring.
//!
//! Rows run at `angle` and are `spacing` apart, covering a square of
//! side twice the contour's bounding diagonal centred on its bounding
//! box, so every rotation is covered. Each row is intersected with every
//! contour edge (including the closing edge), the crossings are sorted
//! along the row, and consecutive pairs become inside runs.
//!
//! A vertex lying exactly on a row counts once: an edge crosses a row
//! only if its endpoints fall strictly on opposite sides, with "on the
//! row" treated as the negative side. This keeps crossing counts even.

use crate::pattern::{StitchKind, StitchPoint};
use crate::types::{Contour, Point, ThreadColor};

/// Denominators smaller than this mean the edge is parallel to the row.
const PARALLEL_EPSILON: f64 = 1e-10;

/// Parameters for one fill layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    /// Row direction in degrees.
    pub angle: f64,
    /// Distance between rows and between stitches along a row, mm.
    pub spacing: f64,
    /// Each run is lengthened by this much at both ends, mm.
    pub pull_extension: f64,
}

/// Fill the inside of `contour`.
///
/// Every run starts with a `Jump` to its start point followed by
/// `Normal` stitches at most `spacing` apart, ending exactly on the run's
/// far end.
#[must_use = "returns the fill stitches"]
pub fn fill(contour: &Contour, params: &FillParams, color: ThreadColor) -> Vec<StitchPoint> {
    let Some(bounds) = contour.bounds() else {
        return Vec::new();
    };
    if !(params.spacing.is_finite() && params.spacing > 0.0) || contour.len() < 3 {
        return Vec::new();
    }

    let diagonal = bounds.diagonal();
    let center = bounds.center();
    let (sin, cos) = params.angle.to_radians().sin_cos();
    let dir = Point::new(cos, sin);
    let normal = Point::new(-sin, cos);

    #[allow(clippy::cast_possible_truncation)]
    let rows = (diagonal / params.spacing).ceil() as i64;

    let mut stitches = Vec::new();
    for i in -rows..=rows {
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f64 * params.spacing;
        let origin = Point::new(
            normal.x.mul_add(offset, center.x),
            normal.y.mul_add(offset, center.y),
        );
        let start = Point::new(
            dir.x.mul_add(-diagonal, origin.x),
            dir.y.mul_add(-diagonal, origin.y),
        );
        let end = Point::new(
            dir.x.mul_add(diagonal, origin.x),
            dir.y.mul_add(diagonal, origin.y),
        );

        let mut crossings: Vec<(f64, Point)> = contour
            .edges()
            .filter_map(|(a, b)| intersect(start, end, a, b))
            .map(|p| (project(p, start, dir), p))
            .collect();
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        for pair in crossings.chunks_exact(2) {
            let run_start = extend(pair[0].1, dir, -params.pull_extension);
            let run_end = extend(pair[1].1, dir, params.pull_extension);
            emit_run(&mut stitches, run_start, run_end, params.spacing, color);
        }
    }
    stitches
}

/// Crossing of row `p1`-`p2` with contour edge `p3`-`p4`, if any.
///
/// `ua` is the position along the row and must lie in `[0, 1]`; the
/// edge side test stands in for the `ub ∈ [0, 1]` check.
fn intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let side = |p: Point| (p2.x - p1.x).mul_add(p.y - p1.y, -((p2.y - p1.y) * (p.x - p1.x)));
    if (side(p3) > 0.0) == (side(p4) > 0.0) {
        return None;
    }

    let denominator = (p4.y - p3.y).mul_add(p2.x - p1.x, -((p4.x - p3.x) * (p2.y - p1.y)));
    if denominator.abs() < PARALLEL_EPSILON {
        return None;
    }
    let ua = (p4.x - p3.x).mul_add(p1.y - p3.y, -((p4.y - p3.y) * (p1.x - p3.x))) / denominator;
    if !(0.0..=1.0).contains(&ua) {
        return None;
    }
    Some(p1.lerp(p2, ua))
}

fn project(p: Point, origin: Point, dir: Point) -> f64 {
    (p.x - origin.x).mul_add(dir.x, (p.y - origin.y) * dir.y)
}

fn extend(p: Point, dir: Point, by: f64) -> Point {
    Point::new(dir.x.mul_add(by, p.x), dir.y.mul_add(by, p.y))
}

fn emit_run(
    out: &mut Vec<StitchPoint>,
    start: Point,
    end: Point,
    spacing: f64,
    color: ThreadColor,
) {
    let distance = start.distance(end);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((distance / spacing).ceil() as u32).max(1);

    out.push(StitchPoint::at(start, StitchKind::Jump, color));
    for step in 1..=steps {
        let t = f64::from(step) / f64::from(steps);
        out.push(StitchPoint::at(start.lerp(end, t), StitchKind::Normal, color));
    }
}
