//! Speck removal on the binary bitmap.
//!
//! Labels 8-connected ink regions with
//! [`imageproc::region_labelling::connected_components`] (two-pass
//! union-find) and erases every region smaller than a pixel-area floor.
//! Without this, isolated dither dots each trace into their own tiny
//! contour and turn into a cloud of jump stitches.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::threshold::{INK, PAPER};

/// Outcome of [`remove_small_components`], kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStats {
    /// Number of ink regions before filtering.
    pub found: usize,
    /// Number of regions erased.
    pub removed: usize,
}

/// Erase ink regions with fewer than `min_area` pixels.
///
/// A `min_area` of 0 or 1 leaves the bitmap unchanged.
#[must_use = "returns the filtered bitmap"]
pub fn remove_small_components(bitmap: &GrayImage, min_area: u32) -> (GrayImage, ComponentStats) {
    let labels = connected_components(bitmap, Connectivity::Eight, Luma([PAPER]));

    let label_count = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    let mut areas = vec![0u32; label_count + 1];
    for p in labels.pixels() {
        areas[p.0[0] as usize] += 1;
    }
    let found = areas.iter().skip(1).filter(|&&a| a > 0).count();

    if min_area <= 1 {
        return (bitmap.clone(), ComponentStats { found, removed: 0 });
    }

    let removed = areas
        .iter()
        .skip(1)
        .filter(|&&a| a > 0 && a < min_area)
        .count();

    let filtered = GrayImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        Luma([if label != 0 && areas[label] >= min_area {
            INK
        } else {
            PAPER
        }])
    });
    (filtered, ComponentStats { found, removed })
}
