//! Brother PES writer.
//!
//! 532-byte header:
//!
//! | offset | field |
//! |---|---|
//! | 0 | `#PES0001` |
//! | 8 | `PEC\0` |
//! | 12 | u32 stitch count |
//! | 16 | u16 color count |
//! | 18 | u16 width, 0.1 mm |
//! | 20 | u16 height, 0.1 mm |
//! | 48 | one palette thread index per color |
//!
//! Records: normal `dx dy` as 7-bit two's complement, jump `90 dx dy`,
//! stop `FE thread`, end `FF`. The 7-bit normal record bounds every
//! delta to ±63. Trims are written as jumps.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::{byte, field, put_table, put_u16, put_u32};
use crate::normalize::MachinePattern;
use crate::palette::{nearest_thread, thread_table};

pub const HEADER_LEN: usize = 532;
pub const SIGNATURE: &[u8; 8] = b"#PES0001";
pub const PEC_MARKER: &[u8; 4] = b"PEC\0";
pub const THREAD_TABLE_OFFSET: usize = 48;
pub const RECORD_LIMIT: i32 = 63;

const JUMP: u8 = 0x90;
const STOP: u8 = 0xFE;
const END: u8 = 0xFF;

/// Brother PES.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pes;

impl FormatWriter for Pes {
    const TAG: FormatTag = FormatTag::Pes;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = vec![0u8; HEADER_LEN];
        out[..8].copy_from_slice(SIGNATURE);
        out[8..12].copy_from_slice(PEC_MARKER);
        put_u32(&mut out, 12, field(pattern.stitches.len(), Self::TAG, "stitch count")?);
        put_u16(&mut out, 16, field(pattern.colors.len(), Self::TAG, "color count")?);
        put_u16(&mut out, 18, field(pattern.width, Self::TAG, "width")?);
        put_u16(&mut out, 20, field(pattern.height, Self::TAG, "height")?);
        put_table(
            &mut out,
            THREAD_TABLE_OFFSET,
            HEADER_LEN,
            &thread_table(&pattern.colors),
            Self::TAG,
        )?;

        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Separate) {
            match step.kind {
                StitchKind::Normal => {
                    out.extend_from_slice(&[byte(step.dx) & 0x7F, byte(step.dy) & 0x7F]);
                }
                StitchKind::Jump | StitchKind::Trim => {
                    out.extend_from_slice(&[JUMP, byte(step.dx), byte(step.dy)]);
                }
                StitchKind::Stop => {
                    let thread = pattern
                        .colors
                        .get(step.color)
                        .map_or(0, |&c| nearest_thread(c));
                    out.extend_from_slice(&[STOP, thread]);
                }
                StitchKind::End => out.push(END),
            }
        }
        out.push(END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded PES");
        Ok(out)
    }
}
