//! Janome JEF writer.
//!
//! 128-byte header of little-endian `i32` fields: magic `0x4A454600` at
//! 0, stitch count at 4, color count at 8, width at 12 and height at 16
//! (0.1 mm), then one palette thread index per color from offset 20.
//!
//! Janome machines count y upwards, so every record stores `-dy`.
//! Records: normal `dx -dy`, jump `80 02 dx -dy`, stop `80 01 00 00`,
//! end `80 10`. Trims are written as jumps.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::{byte, field, put_i32, put_table};
use crate::normalize::MachinePattern;
use crate::palette::thread_table;

pub const HEADER_LEN: usize = 128;
pub const MAGIC: i32 = 0x4A45_4600;
pub const THREAD_TABLE_OFFSET: usize = 20;
pub const RECORD_LIMIT: i32 = 127;

const ESCAPE: u8 = 0x80;
const END: [u8; 2] = [ESCAPE, 0x10];

/// Janome JEF.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jef;

impl FormatWriter for Jef {
    const TAG: FormatTag = FormatTag::Jef;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = vec![0u8; HEADER_LEN];
        put_i32(&mut out, 0, MAGIC);
        put_i32(&mut out, 4, field(pattern.stitches.len(), Self::TAG, "stitch count")?);
        put_i32(&mut out, 8, field(pattern.colors.len(), Self::TAG, "color count")?);
        put_i32(&mut out, 12, pattern.width);
        put_i32(&mut out, 16, pattern.height);
        put_table(
            &mut out,
            THREAD_TABLE_OFFSET,
            HEADER_LEN,
            &thread_table(&pattern.colors),
            Self::TAG,
        )?;

        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Separate) {
            let (x, y) = (byte(step.dx), byte(-step.dy));
            match step.kind {
                StitchKind::Normal => out.extend_from_slice(&[x, y]),
                StitchKind::Jump | StitchKind::Trim => {
                    out.extend_from_slice(&[ESCAPE, 0x02, x, y]);
                }
                StitchKind::Stop => out.extend_from_slice(&[ESCAPE, 0x01, 0, 0]),
                StitchKind::End => out.extend_from_slice(&END),
            }
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded JEF");
        Ok(out)
    }
}
