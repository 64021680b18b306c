//! Melco EXP writer.
//!
//! EXP files are a bare record stream with no header. Like JEF, y counts
//! upwards. Records: normal `dx -dy`, jump `80 04 dx -dy`, stop
//! `80 01 00 00`, end `80 80 00 00`.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::byte;
use crate::normalize::MachinePattern;

pub const RECORD_LIMIT: i32 = 127;

const ESCAPE: u8 = 0x80;
const END: [u8; 4] = [ESCAPE, 0x80, 0, 0];

/// Melco EXP.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl FormatWriter for Exp {
    const TAG: FormatTag = FormatTag::Exp;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let records = steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Separate);
        let mut out = Vec::with_capacity(2 * records.len() + END.len());
        for step in records {
            let (x, y) = (byte(step.dx), byte(-step.dy));
            match step.kind {
                StitchKind::Normal => out.extend_from_slice(&[x, y]),
                StitchKind::Jump | StitchKind::Trim => {
                    out.extend_from_slice(&[ESCAPE, 0x04, x, y]);
                }
                StitchKind::Stop => out.extend_from_slice(&[ESCAPE, 0x01, 0, 0]),
                StitchKind::End => out.extend_from_slice(&END),
            }
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded EXP");
        Ok(out)
    }
}
