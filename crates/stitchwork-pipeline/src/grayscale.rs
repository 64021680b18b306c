//! Image decoding and grayscale conversion.
//!
//! The pipeline accepts a caller-owned [`PixelBuffer`]; this module turns
//! it into a single-channel `GrayImage`. [`decode_image`] is a
//! convenience for callers holding encoded bytes (PNG, JPEG, BMP, WebP)
//! rather than raw pixels.

use image::GrayImage;

use crate::types::{PixelBuffer, PixelFormat, ProcessingError};

/// Decode raw image bytes into an RGBA [`PixelBuffer`].
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidInput`] if `bytes` is empty.
/// Returns [`ProcessingError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded pixel buffer"]
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, ProcessingError> {
    if bytes.is_empty() {
        return Err(ProcessingError::InvalidInput(
            "image data is empty".to_string(),
        ));
    }

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::new(width, height, PixelFormat::Rgba, rgba.into_raw())
}

/// Convert a pixel buffer to 8-bit luminance.
///
/// Uses the Rec. 601 weights `0.299*R + 0.587*G + 0.114*B`. Alpha is
/// composited over a white background first so transparent regions read
/// as paper rather than ink.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(pixels: &PixelBuffer) -> GrayImage {
    let (width, height) = (pixels.width(), pixels.height());
    let samples = pixels.samples();

    let luma: Vec<u8> = match pixels.format() {
        PixelFormat::Gray => samples.to_vec(),
        PixelFormat::Rgba => samples
            .chunks_exact(4)
            .map(|px| luminance(px[0], px[1], px[2], px[3]))
            .collect(),
    };

    // Lengths were checked when the buffer was built.
    GrayImage::from_raw(width, height, luma).unwrap_or_else(|| GrayImage::new(width, height))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn luminance(r: u8, g: u8, b: u8, a: u8) -> u8 {
    let l = 0.114f64.mul_add(
        f64::from(b),
        0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
    );
    let alpha = f64::from(a) / 255.0;
    let composited = alpha.mul_add(l - 255.0, 255.0);
    composited.round().clamp(0.0, 255.0) as u8
}
