//! Binomial smoothing before binarization.
//!
//! A small binomial kernel approximates a Gaussian closely enough to
//! knock out JPEG noise and single-pixel speckle without rounding off
//! the corners of line art. Both kernels are separable, so the filter
//! runs as two 1-D passes via [`imageproc::filter::separable_filter_equal`].

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// 1-D weights of the 3-tap binomial kernel, normalized.
const BINOMIAL_3: [f32; 3] = [0.25, 0.5, 0.25];

/// 1-D weights of the 5-tap binomial kernel (1 4 6 4 1)/16.
const BINOMIAL_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Which smoothing kernel to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlurKernel {
    /// Leave the image untouched.
    None,
    /// 3×3 binomial, (1 2 1)ᵀ(1 2 1)/16.
    Binomial3,
    /// 5×5 binomial, (1 4 6 4 1)ᵀ(1 4 6 4 1)/256.
    #[default]
    Binomial5,
}

impl BlurKernel {
    fn weights(self) -> Option<&'static [f32]> {
        match self {
            Self::None => None,
            Self::Binomial3 => Some(&BINOMIAL_3),
            Self::Binomial5 => Some(&BINOMIAL_5),
        }
    }
}

/// Smooth a grayscale image with the selected kernel.
///
/// Border pixels are handled by clamping sample coordinates to the image,
/// so dimensions are preserved.
#[must_use = "returns the smoothed image"]
pub fn smooth(image: &GrayImage, kernel: BlurKernel) -> GrayImage {
    match kernel.weights() {
        Some(weights) if image.width() > 0 && image.height() > 0 => {
            imageproc::filter::separable_filter_equal(image, weights)
        }
        _ => image.clone(),
    }
}
