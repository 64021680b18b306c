//! Binarization of the smoothed grayscale image.
//!
//! The output bitmap marks ink (dark) pixels as 255 and paper as 0, the
//! convention every later stage relies on.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use serde::{Deserialize, Serialize};

use crate::types::ProcessingError;

/// Value of an ink pixel in a bitmap.
pub const INK: u8 = 255;

/// Value of a paper pixel in a bitmap.
pub const PAPER: u8 = 0;

/// How the smoothed grayscale image becomes a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ThresholdMode {
    /// Pixels darker than `level` are ink.
    Global {
        /// Luminance cut-off.
        level: u8,
    },
    /// Pixels darker than their local mean minus `bias` are ink.
    ///
    /// The mean is taken over a `window × window` square centred on the
    /// pixel, clipped at the image border.
    Adaptive {
        /// Side of the averaging window, in pixels. Must be odd and ≥ 3.
        window: u32,
        /// Constant subtracted from the local mean.
        bias: f64,
    },
    /// Skip binarization and hand the smoothed grayscale straight to the
    /// edge detector, so the edge threshold acts on image contrast.
    None,
}

impl ThresholdMode {
    /// Default global cut-off.
    pub const DEFAULT_LEVEL: u8 = 128;
    /// Default adaptive window.
    pub const DEFAULT_WINDOW: u32 = 11;
    /// Default adaptive bias.
    pub const DEFAULT_BIAS: f64 = 2.0;

    /// Adaptive thresholding with the default window and bias.
    #[must_use]
    pub const fn adaptive() -> Self {
        Self::Adaptive {
            window: Self::DEFAULT_WINDOW,
            bias: Self::DEFAULT_BIAS,
        }
    }

    /// Returns `true` if this mode produces a two-level bitmap.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Check mode parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidInput`] for an even or too-small
    /// adaptive window, or a non-finite bias.
    pub fn validate(&self) -> Result<(), ProcessingError> {
        match *self {
            Self::Adaptive { window, bias } => {
                if window < 3 || window % 2 == 0 {
                    return Err(ProcessingError::InvalidInput(format!(
                        "adaptive threshold window must be odd and at least 3, got {window}"
                    )));
                }
                if !bias.is_finite() {
                    return Err(ProcessingError::InvalidInput(
                        "adaptive threshold bias must be finite".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Global { .. } | Self::None => Ok(()),
        }
    }
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::Global {
            level: Self::DEFAULT_LEVEL,
        }
    }
}

/// Apply the selected threshold.
///
/// [`ThresholdMode::None`] returns a copy of the input.
#[must_use = "returns the bitmap"]
pub fn binarize(image: &GrayImage, mode: ThresholdMode) -> GrayImage {
    match mode {
        ThresholdMode::Global { level } => global(image, level),
        ThresholdMode::Adaptive { window, bias } => adaptive(image, window, bias),
        ThresholdMode::None => image.clone(),
    }
}

fn global(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if image.get_pixel(x, y).0[0] < level {
            INK
        } else {
            PAPER
        }])
    })
}

/// Local-mean threshold over a summed-area table.
///
/// `imageproc`'s integral image is `(w + 1) × (h + 1)` with a zero first
/// row and column, so the sum over the inclusive box `[x1, x2] × [y1, y2]`
/// is `I(x2+1, y2+1) - I(x1, y2+1) - I(x2+1, y1) + I(x1, y1)`.
fn adaptive(image: &GrayImage, window: u32, bias: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let integral: Image<Luma<u64>> = imageproc::integral_image::integral_image(image);
    let half = window / 2;
    let at = |x: u32, y: u32| integral.get_pixel(x, y).0[0];

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(half);
        let y1 = y.saturating_sub(half);
        let x2 = (x + half).min(width - 1);
        let y2 = (y + half).min(height - 1);

        let sum = at(x2 + 1, y2 + 1) + at(x1, y1) - at(x1, y2 + 1) - at(x2 + 1, y1);
        let count = u64::from(x2 - x1 + 1) * u64::from(y2 - y1 + 1);
        #[allow(clippy::cast_precision_loss)]
        let mean = sum as f64 / count as f64;

        let value = f64::from(image.get_pixel(x, y).0[0]);
        Luma([if value < mean - bias { INK } else { PAPER }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_count(bitmap: &GrayImage) -> usize {
        bitmap.pixels().filter(|p| p.0[0] == INK).count()
    }

    /// White page with a dark square in the middle.
    fn square_on_white(size: u32, inset: u32, ink: u8) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = (inset..size - inset).contains(&x) && (inset..size - inset).contains(&y);
            Luma([if inside { ink } else { 255 }])
        })
    }

    #[test]
    fn global_marks_dark_pixels_as_ink() {
        let img = square_on_white(10, 3, 20);
        let bitmap = binarize(&img, ThresholdMode::default());
        assert_eq!(ink_count(&bitmap), 16);
        assert_eq!(bitmap.get_pixel(5, 5).0[0], INK);
        assert_eq!(bitmap.get_pixel(0, 0).0[0], PAPER);
    }

    #[test]
    fn global_level_is_exclusive() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        assert_eq!(ink_count(&binarize(&img, ThresholdMode::Global { level: 128 })), 0);
        assert_eq!(ink_count(&binarize(&img, ThresholdMode::Global { level: 129 })), 16);
    }

    #[test]
    fn uniform_image_has_no_adaptive_ink() {
        for shade in [0, 90, 255] {
            let img = GrayImage::from_pixel(20, 20, Luma([shade]));
            assert_eq!(ink_count(&binarize(&img, ThresholdMode::adaptive())), 0);
        }
    }

    #[test]
    fn adaptive_finds_faint_square_global_misses() {
        // Light gray square on white: never darker than the global level.
        let img = square_on_white(30, 10, 200);
        assert_eq!(ink_count(&binarize(&img, ThresholdMode::default())), 0);
        let bitmap = binarize(&img, ThresholdMode::adaptive());
        assert_eq!(bitmap.get_pixel(10, 10).0[0], INK);
        assert_eq!(bitmap.get_pixel(0, 0).0[0], PAPER);
    }

    #[test]
    fn none_passes_through() {
        let img = square_on_white(8, 2, 40);
        assert_eq!(binarize(&img, ThresholdMode::None), img);
    }

    #[test]
    fn adaptive_window_validation() {
        assert!(ThresholdMode::adaptive().validate().is_ok());
        let even = ThresholdMode::Adaptive {
            window: 10,
            bias: 2.0,
        };
        assert!(even.validate().is_err());
        let tiny = ThresholdMode::Adaptive {
            window: 1,
            bias: 2.0,
        };
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn serde_uses_tagged_camel_case() {
        let json = serde_json::to_string(&ThresholdMode::adaptive()).unwrap_or_default();
        assert_eq!(json, r#"{"mode":"adaptive","window":11,"bias":2.0}"#);
        let none: ThresholdMode =
            serde_json::from_str(r#"{"mode":"none"}"#).unwrap_or_default();
        assert_eq!(none, ThresholdMode::None);
    }
}
