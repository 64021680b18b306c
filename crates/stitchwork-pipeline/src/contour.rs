//! Contour tracing: extract point rings from a binary edge map.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! Both tracers return rings in pixel coordinates and drop anything with
//! fewer than [`MIN_CONTOUR_LENGTH`] points.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::edge::EDGE;
use crate::types::{Contour, Point};

/// Traced contours with fewer points than this are discarded.
pub const MIN_CONTOUR_LENGTH: usize = 10;

/// Neighbor scan order for the greedy walk: row by row, top-left first.
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContourTracerKind {
    /// Greedy 8-connected walk over edge pixels.
    ///
    /// From each unvisited edge pixel in raster order, repeatedly step
    /// to the first unvisited edge neighbor in a fixed scan order until
    /// none remains. Every edge pixel belongs to at most one contour.
    /// On the one-pixel rings the edge detector produces, each ring
    /// comes out as a single contour.
    #[default]
    MooreNeighbor,

    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    ///
    /// Traces both sides of a one-pixel ring, so every outline is
    /// reported twice (outer and hole border).
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary edge map (255 = edge, 0 = background).
/// Output: a set of disconnected rings, one per contour.
pub trait ContourTracer {
    /// Trace contours in the given binary edge map.
    fn trace(&self, edges: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, edges: &GrayImage) -> Vec<Contour> {
        let raw = match *self {
            Self::MooreNeighbor => trace_moore_walk(edges),
            Self::BorderFollowing => trace_border_following(edges),
        };
        raw.into_iter()
            .filter(|c| c.len() >= MIN_CONTOUR_LENGTH)
            .collect()
    }
}

fn trace_moore_walk(edges: &GrayImage) -> Vec<Contour> {
    let (width, height) = edges.dimensions();
    let w = width as usize;
    let is_edge = |x: u32, y: u32| edges.get_pixel(x, y).0[0] == EDGE;
    let mut visited = vec![false; w * height as usize];
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !is_edge(x, y) || visited[y as usize * w + x as usize] {
                continue;
            }

            let mut points = Vec::new();
            let mut current = Some((x, y));
            while let Some((cx, cy)) = current {
                visited[cy as usize * w + cx as usize] = true;
                points.push(Point::new(f64::from(cx), f64::from(cy)));

                current = NEIGHBORS.iter().find_map(|&(dx, dy)| {
                    let nx = u32::try_from(i64::from(cx) + dx).ok()?;
                    let ny = u32::try_from(i64::from(cy) + dy).ok()?;
                    (nx < width
                        && ny < height
                        && is_edge(nx, ny)
                        && !visited[ny as usize * w + nx as usize])
                        .then_some((nx, ny))
                });
            }
            contours.push(Contour::new(points));
        }
    }
    contours
}

/// Converts `imageproc` contour points (integer grid coordinates) into
/// floating-point [`Point`]s.
fn trace_border_following(edges: &GrayImage) -> Vec<Contour> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .map(|c| {
            Contour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect(),
            )
        })
        .collect()
}
