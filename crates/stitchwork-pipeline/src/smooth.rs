//! Three-point moving-average smoothing.
//!
//! Runs after simplification to soften the remaining pixel-grid corners.
//! Traced contours are rings, so the window wraps around; an open path
//! keeps its two endpoints fixed instead.

use crate::types::{Contour, Point};

/// Whether the first and last points are neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// The window wraps around the ends.
    Closed,
    /// Endpoints are pinned; only interior points move.
    Open,
}

/// Replace every point with the mean of itself and its two neighbors.
///
/// Contours with fewer than 3 points are returned unchanged.
#[must_use = "returns the smoothed contour"]
pub fn smooth(contour: &Contour, topology: Topology) -> Contour {
    let points = contour.points();
    let n = points.len();
    if n < 3 {
        return contour.clone();
    }

    let mean3 = |a: Point, b: Point, c: Point| {
        Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    };

    let smoothed = (0..n)
        .map(|i| match topology {
            Topology::Open if i == 0 || i == n - 1 => points[i],
            _ => mean3(points[(i + n - 1) % n], points[i], points[(i + 1) % n]),
        })
        .collect();
    Contour::new(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Contour {
        Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 3.0),
        ])
    }

    #[test]
    fn closed_smoothing_wraps_around() {
        let s = smooth(&square(), Topology::Closed);
        // First point averages (0,3), (0,0), (3,0).
        assert_eq!(s.points()[0], Point::new(1.0, 1.0));
        assert_eq!(s.points()[2], Point::new(2.0, 2.0));
    }

    #[test]
    fn open_smoothing_pins_endpoints() {
        let s = smooth(&square(), Topology::Open);
        assert_eq!(s.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(s.last(), Some(&Point::new(0.0, 3.0)));
        assert_eq!(s.points()[1], Point::new(2.0, 1.0));
    }

    #[test]
    fn point_count_preserved() {
        assert_eq!(smooth(&square(), Topology::Closed).len(), 4);
    }

    #[test]
    fn straight_line_interior_unchanged() {
        let line = Contour::new((0..5).map(|i| Point::new(f64::from(i), 0.0)).collect());
        let s = smooth(&line, Topology::Open);
        assert_eq!(s, line);
    }

    #[test]
    fn centroid_preserved_for_closed_rings() {
        let s = smooth(&square(), Topology::Closed);
        let cx: f64 = s.points().iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy: f64 = s.points().iter().map(|p| p.y).sum::<f64>() / 4.0;
        assert!((cx - 1.5).abs() < 1e-12 && (cy - 1.5).abs() < 1e-12);
    }

    #[test]
    fn tiny_contours_unchanged() {
        let two = Contour::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert_eq!(smooth(&two, Topology::Closed), two);
    }
}
