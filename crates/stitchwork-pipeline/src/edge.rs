//! Sobel edge detection with non-maximum suppression and hysteresis.
//!
//! Produces a binary edge map (255 = edge, 0 = background) of the same
//! dimensions as the input. The three steps follow Canny minus the
//! built-in blur, since smoothing already happened upstream:
//!
//! 1. Gradients from 3×3 Sobel kernels. Magnitudes are divided by 4 so
//!    a full black-to-white step scores 255, putting the edge threshold
//!    on the same scale as pixel values.
//! 2. Non-maximum suppression along the gradient direction, bucketed
//!    into four 45° bins.
//! 3. Double-threshold hysteresis with an explicit stack.
//!
//! An all-zero result is valid; the contour stage reports it.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Value of an edge pixel in the edge map.
pub const EDGE: u8 = 255;

/// Sobel gain for a unit step, used to rescale magnitudes to 0..=255.
const SOBEL_GAIN: f32 = 4.0;

/// Hysteresis thresholds on the rescaled gradient magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeThresholds {
    /// Pixels at or above this seed an edge.
    pub high: f32,
    /// Pixels at or above this extend an edge they touch.
    pub low: f32,
}

impl EdgeThresholds {
    /// Derive both thresholds from the user-facing edge threshold.
    ///
    /// The low threshold is half the high one.
    #[must_use]
    pub fn from_edge_threshold(threshold: u8) -> Self {
        let high = f32::from(threshold);
        Self {
            high,
            low: high / 2.0,
        }
    }
}

/// Run the full detector.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(image: &GrayImage, thresholds: EdgeThresholds) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(h, v)| f32::from(h.0[0]).hypot(f32::from(v.0[0])) / SOBEL_GAIN)
        .collect();

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, width, height, thresholds)
}

/// Gradient direction bin, in degrees folded into `[0, 180)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bin {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Bin {
    fn of(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if !(22.5..157.5).contains(&angle) {
            Self::Horizontal
        } else if angle < 67.5 {
            Self::Diagonal
        } else if angle < 112.5 {
            Self::Vertical
        } else {
            Self::AntiDiagonal
        }
    }

    /// Offsets of the two neighbors along the gradient, "behind" first.
    const fn neighbors(self) -> ((i64, i64), (i64, i64)) {
        match self {
            Self::Horizontal => ((-1, 0), (1, 0)),
            Self::Diagonal => ((-1, -1), (1, 1)),
            Self::Vertical => ((0, -1), (0, 1)),
            Self::AntiDiagonal => ((1, -1), (-1, 1)),
        }
    }
}

/// Zero every pixel that is not a local maximum along its gradient.
///
/// A plateau of equal magnitudes keeps only its last pixel along the
/// gradient direction (`mag <= ahead` suppresses), so a step edge, which
/// scores equally on both sides, thins to a single pixel. Border pixels
/// are always zero.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Vec<f32> {
    let (width, height) = gx.dimensions();
    let w = width as usize;
    let mut out = vec![0.0; magnitude.len()];
    let at = |x: i64, y: i64| magnitude[y as usize * w + x as usize];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y as usize * w + x as usize;
            let mag = magnitude[idx];
            if mag <= 0.0 {
                continue;
            }
            let bin = Bin::of(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let ((bx, by), (ax, ay)) = bin.neighbors();
            let (x, y) = (i64::from(x), i64::from(y));
            let behind = at(x + bx, y + by);
            let ahead = at(x + ax, y + ay);
            if mag < behind || mag <= ahead {
                continue;
            }
            out[idx] = mag;
        }
    }
    out
}

/// Keep strong pixels and every weak pixel 8-connected to one.
fn hysteresis(thinned: &[f32], width: u32, height: u32, t: EdgeThresholds) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    let w = width as usize;
    let strong = |m: f32| m > 0.0 && m >= t.high;
    let weak = |m: f32| m > 0.0 && m >= t.low;

    let mut stack: Vec<(u32, u32)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if !strong(thinned[y as usize * w + x as usize]) || out.get_pixel(x, y).0[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in neighbors8(cx, cy, width, height) {
                    if out.get_pixel(nx, ny).0[0] != EDGE
                        && weak(thinned[ny as usize * w + nx as usize])
                    {
                        out.put_pixel(nx, ny, Luma([EDGE]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

/// In-bounds 8-neighbors of `(x, y)`.
fn neighbors8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let nx = u32::try_from(i64::from(x) + dx).ok()?;
        let ny = u32::try_from(i64::from(y) + dy).ok()?;
        (nx < width && ny < height).then_some((nx, ny))
    })
}

/// Number of edge pixels in an edge map.
#[must_use]
pub fn edge_pixel_count(edges: &GrayImage) -> usize {
    edges.pixels().filter(|p| p.0[0] == EDGE).count()
}
