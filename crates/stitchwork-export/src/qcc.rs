//! QCC writer for long-arm quilting machines.
//!
//! 512-byte header: a `u32` signature length and `QCC` at 0, then `u32`
//! stitch count at 8, width at 12, height at 16 and color count at 20.
//!
//! Records are five bytes, a command (00 normal, 01 jump, 02 stop,
//! 03 trim, 7F end) then `dx` and `dy` as little-endian `i16`. The wide
//! fields mean long moves rarely need splitting.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::{field, put_signature, put_u32};
use crate::normalize::MachinePattern;

pub const HEADER_LEN: usize = 512;
pub const RECORD_LIMIT: i32 = 32_767;

const END: [u8; 5] = [0x7F, 0, 0, 0, 0];

const fn command(kind: StitchKind) -> u8 {
    match kind {
        StitchKind::Normal => 0x00,
        StitchKind::Jump => 0x01,
        StitchKind::Stop => 0x02,
        StitchKind::Trim => 0x03,
        StitchKind::End => 0x7F,
    }
}

/// QCC.
#[derive(Debug, Clone, Copy, Default)]
pub struct Qcc;

impl FormatWriter for Qcc {
    const TAG: FormatTag = FormatTag::Qcc;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = vec![0u8; HEADER_LEN];
        put_signature(&mut out, b"QCC");
        put_u32(&mut out, 8, field(pattern.stitches.len(), Self::TAG, "stitch count")?);
        put_u32(&mut out, 12, field(pattern.width, Self::TAG, "width")?);
        put_u32(&mut out, 16, field(pattern.height, Self::TAG, "height")?);
        put_u32(&mut out, 20, field(pattern.colors.len(), Self::TAG, "color count")?);

        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Carried) {
            let dx: i16 = field(step.dx, Self::TAG, "dx")?;
            let dy: i16 = field(step.dy, Self::TAG, "dy")?;
            out.push(command(step.kind));
            out.extend_from_slice(&dx.to_le_bytes());
            out.extend_from_slice(&dy.to_le_bytes());
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded QCC");
        Ok(out)
    }
}
