//! Husqvarna HUS writer.
//!
//! Shares the VP3 header layout under a `HUS` signature. Every record is
//! three bytes, `flags |dx| |dy|`, so commands carry their own movement.
//! `flags` is the kind tag (`00` normal, `01` jump, `02` stop, `80` end)
//! with `0x20` set for a negative x and `0x40` for a negative y.

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::byte;
use crate::normalize::MachinePattern;
use crate::vp3;

pub const RECORD_LIMIT: i32 = 127;

const END: [u8; 3] = [0x80, 0, 0];

/// Pack one record.
#[must_use]
pub fn record(dx: i32, dy: i32, kind: StitchKind) -> [u8; 3] {
    let mut flags = match kind {
        StitchKind::Normal => 0x00,
        StitchKind::Jump | StitchKind::Trim => 0x01,
        StitchKind::Stop => 0x02,
        StitchKind::End => 0x80,
    };
    if dx < 0 {
        flags |= 0x20;
    }
    if dy < 0 {
        flags |= 0x40;
    }
    [flags, byte(dx.abs()), byte(dy.abs())]
}

/// Husqvarna HUS.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hus;

impl FormatWriter for Hus {
    const TAG: FormatTag = FormatTag::Hus;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let mut out = vp3::header(pattern, b"HUS", Self::TAG)?;
        for step in steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Carried) {
            out.extend_from_slice(&record(step.dx, step.dy, step.kind));
        }
        out.extend_from_slice(&END);

        debug!(stitches = pattern.stitches.len(), bytes = out.len(), "encoded HUS");
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::machine;

    #[test]
    fn sign_flags() {
        assert_eq!(record(3, 4, StitchKind::Normal), [0x00, 3, 4]);
        assert_eq!(record(-3, 4, StitchKind::Jump), [0x21, 3, 4]);
        assert_eq!(record(3, -4, StitchKind::Stop), [0x42, 3, 4]);
        assert_eq!(record(-127, -127, StitchKind::Normal), [0x60, 127, 127]);
    }

    #[test]
    fn signature_and_stream() {
        let m = machine(&[(0, 0, StitchKind::Jump), (10, 5, StitchKind::Normal)]);
        let bytes = Hus::write(&m).unwrap();
        assert_eq!(bytes[4..7], *b"HUS");
        assert_eq!(
            &bytes[vp3::HEADER_LEN..],
            &[0x01, 0, 0, 0x00, 10, 5, 0x80, 0, 0]
        );
    }
}
