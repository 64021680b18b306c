//! Pfaff VP3 writer.
//!
//! 512-byte header: a `u32` signature length and `VP3` at 0, then `u32`
//! stitch count at 8, color count at 12, width at 16 and height at 20.
//! The same layout with a `HUS` signature heads [`crate::hus`] files.
//!
//! Records: normal `dx dy`, jump `80 01 dx dy`, stop `80 03 color`,
//! end `80 00`. The stop byte is the pattern color index, not a palette
//! thread.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::{byte, field, put_signature, put_u32};
use crate::normalize::MachinePattern;

pub const HEADER_LEN: usize = 512;
pub const RECORD_LIMIT: i32 = 127;

const ESCAPE: u8 = 0x80;
const END: [u8; 2] = [ESCAPE, 0x00];

/// Build the shared VP3/HUS header.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] if a count or dimension
/// does not fit its `u32` field.
pub fn header(
    pattern: &MachinePattern,
    signature: &[u8],
    tag: FormatTag,
) -> Result<Vec<u8>, ProcessingError> {
    let mut out = vec![0u8; HEADER_LEN];
    put_signature(&mut out, signature);
    put_u32(&mut out, 8, field(pattern.stitches.len(), tag, "stitch count")?);
    put_u32(&mut out, 12, field(pattern.colors.len(), tag, "color count")?);
    put_u32(&mut out, 16, field(pattern.width, tag, "width")?);
    put_u32(&mut out, 20, field(pattern.height, tag, "height")?);
    Ok(out)
}

/// Pfaff VP3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp3;

impl FormatWriter for Vp3 {
    const TAG: FormatTag = FormatTag::Vp3;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = header(pattern, b"VP3", Self::TAG)?;
        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Separate) {
            let (x, y) = (byte(step.dx), byte(step.dy));
            match step.kind {
                StitchKind::Normal => out.extend_from_slice(&[x, y]),
                StitchKind::Jump | StitchKind::Trim => {
                    out.extend_from_slice(&[ESCAPE, 0x01, x, y]);
                }
                StitchKind::Stop => {
                    let color = field(step.color, Self::TAG, "color index")?;
                    out.extend_from_slice(&[ESCAPE, 0x03, color]);
                }
                StitchKind::End => out.extend_from_slice(&END),
            }
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded VP3");
        Ok(out)
    }
}
