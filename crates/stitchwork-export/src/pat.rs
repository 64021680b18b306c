//! Gammill PAT writer.
//!
//! 256-byte header: `PAT\0`, `u16` version 1 at 4, `u32` stitch count at
//! 6, then `u16` color count, width and height at 10, 12 and 14. Palette
//! thread indices follow from offset 32.
//!
//! Records are three bytes, `cmd dx dy`, with `cmd` 00 normal, 01 jump,
//! 02 stop, 03 trim and FF end. This is the only writer besides QCC with
//! a dedicated trim command.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::{byte, field, put_table, put_u16, put_u32};
use crate::normalize::MachinePattern;
use crate::palette::thread_table;

pub const HEADER_LEN: usize = 256;
pub const SIGNATURE: &[u8; 4] = b"PAT\0";
pub const VERSION: u16 = 1;
pub const THREAD_TABLE_OFFSET: usize = 32;
pub const RECORD_LIMIT: i32 = 127;

const END: [u8; 3] = [0xFF, 0, 0];

const fn command(kind: StitchKind) -> u8 {
    match kind {
        StitchKind::Normal => 0x00,
        StitchKind::Jump => 0x01,
        StitchKind::Stop => 0x02,
        StitchKind::Trim => 0x03,
        StitchKind::End => 0xFF,
    }
}

/// Gammill PAT.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pat;

impl FormatWriter for Pat {
    const TAG: FormatTag = FormatTag::Pat;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = vec![0u8; HEADER_LEN];
        out[..4].copy_from_slice(SIGNATURE);
        put_u16(&mut out, 4, VERSION);
        put_u32(&mut out, 6, field(pattern.stitches.len(), Self::TAG, "stitch count")?);
        put_u16(&mut out, 10, field(pattern.colors.len(), Self::TAG, "color count")?);
        put_u16(&mut out, 12, field(pattern.width, Self::TAG, "width")?);
        put_u16(&mut out, 14, field(pattern.height, Self::TAG, "height")?);
        put_table(
            &mut out,
            THREAD_TABLE_OFFSET,
            HEADER_LEN,
            &thread_table(&pattern.colors),
            Self::TAG,
        )?;

        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Carried) {
            out.extend_from_slice(&[command(step.kind), byte(step.dx), byte(step.dy)]);
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded PAT");
        Ok(out)
    }
}
