//! Tajima DST writer.
//!
//! ## Layout
//!
//! - A 512-byte header holding ASCII lines `LA:`, `ST:`, `CO:`, `+X:`,
//!   `-X:`, `+Y:`, `-Y:`, `AX:+0`, `AY:+0`, `MX:+0`, `MY:+0`, `PD:******`,
//!   each ending in `\r\n`, then zero bytes up to 512.
//! - An initial `(0, 0)` normal record, one or more 3-byte records per
//!   stitch, and the terminal record `00 00 F3`.
//!
//! ## Record packing
//!
//! With `x = |dx|` and `y = |dy|`, both at most [`RECORD_LIMIT`]:
//!
//! ```text
//! b0 = y & 0x0F
//! b1 = x & 0x0F
//! b2 = (y & 0xF0) >> 4 | (x & 0xF0) >> 4
//!    | 0x20 if dx < 0 | 0x40 if dy < 0
//!    | 0x03 normal, 0x83 jump, 0xC3 stop, 0xF3 end
//! ```
//!
//! This is the byte-exact contract the machine files are compared
//! against, including its overlapping high-nibble packing. DST has no
//! trim record; trims are written as jumps.

use std::fmt::Write;

use stitchwork_pipeline::{ProcessingError, StitchKind};
use tracing::debug;

use crate::delta::{CommandMotion, steps};
use crate::format::{FormatTag, FormatWriter};
use crate::header::byte;
use crate::normalize::MachinePattern;

/// Header size in bytes.
pub const HEADER_LEN: usize = 512;

/// Largest per-axis delta of one record, in 0.1 mm.
pub const RECORD_LIMIT: i32 = 121;

/// Label written after `LA:`.
pub const LABEL: &str = "Design Studio";

/// The closing record.
pub const END_RECORD: [u8; 3] = [0x00, 0x00, 0xF3];

/// Tajima DST.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dst;

impl FormatWriter for Dst {
    const TAG: FormatTag = FormatTag::Dst;

    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError> {
        let text = header_text(pattern);
        if text.len() > HEADER_LEN {
            return Err(ProcessingError::InvalidPattern(format!(
                "DST header text is {} bytes, limit {HEADER_LEN}",
                text.len()
            )));
        }

        let records = steps(&pattern.stitches, RECORD_LIMIT, CommandMotion::Carried);
        let mut out = Vec::with_capacity(HEADER_LEN + 3 * (records.len() + 2));
        out.extend_from_slice(text.as_bytes());
        out.resize(HEADER_LEN, 0);

        out.extend_from_slice(&record(0, 0, StitchKind::Normal));
        for step in &records {
            out.extend_from_slice(&record(step.dx, step.dy, step.kind));
        }
        out.extend_from_slice(&END_RECORD);

        debug!(
            stitches = pattern.stitches.len(),
            records = records.len(),
            bytes = out.len(),
            "encoded DST"
        );
        Ok(out)
    }
}

/// The ASCII header lines, before zero padding.
#[must_use]
pub fn header_text(pattern: &MachinePattern) -> String {
    let b = pattern.bounds();
    let mut text = String::new();
    for line in [
        format!("LA:{LABEL}"),
        format!("ST:{}", pattern.stitches.len()),
        format!("CO:{}", pattern.colors.len()),
        format!("+X:{}", b.max_x),
        format!("-X:{}", b.min_x.unsigned_abs()),
        format!("+Y:{}", b.max_y),
        format!("-Y:{}", b.min_y.unsigned_abs()),
        "AX:+0".to_string(),
        "AY:+0".to_string(),
        "MX:+0".to_string(),
        "MY:+0".to_string(),
        "PD:******".to_string(),
    ] {
        let _ = write!(text, "{line}\r\n");
    }
    text
}

/// Pack one delta. Values outside `±RECORD_LIMIT` are clamped.
#[must_use]
pub fn record(dx: i32, dy: i32, kind: StitchKind) -> [u8; 3] {
    let dx = dx.clamp(-RECORD_LIMIT, RECORD_LIMIT);
    let dy = dy.clamp(-RECORD_LIMIT, RECORD_LIMIT);
    let x = byte(dx.abs());
    let y = byte(dy.abs());

    let b0 = y & 0x0F;
    let b1 = x & 0x0F;
    let mut b2 = ((y & 0xF0) >> 4) | ((x & 0xF0) >> 4);
    if dx < 0 {
        b2 |= 0x20;
    }
    if dy < 0 {
        b2 |= 0x40;
    }
    b2 |= match kind {
        StitchKind::Normal => 0x03,
        StitchKind::Jump | StitchKind::Trim => 0x83,
        StitchKind::Stop => 0xC3,
        StitchKind::End => 0xF3,
    };
    [b0, b1, b2]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::machine;

    #[test]
    fn record_packing() {
        assert_eq!(record(0, 0, StitchKind::Normal), [0x00, 0x00, 0x03]);
        assert_eq!(record(50, 50, StitchKind::Normal), [0x02, 0x02, 0x03]);
        assert_eq!(record(-5, 3, StitchKind::Jump), [0x03, 0x05, 0xA3]);
        assert_eq!(record(18, -33, StitchKind::Normal), [0x01, 0x02, 0x43]);
        assert_eq!(record(0, 0, StitchKind::Stop), [0x00, 0x00, 0xC3]);
        assert_eq!(record(0, 0, StitchKind::End), [0x00, 0x00, 0xF3]);
    }

    #[test]
    fn record_clamps_out_of_range() {
        assert_eq!(record(500, -500, StitchKind::Normal), record(121, -121, StitchKind::Normal));
    }

    #[test]
    fn trim_is_written_as_jump() {
        assert_eq!(record(1, 1, StitchKind::Trim), record(1, 1, StitchKind::Jump));
    }

    #[test]
    fn header_lines_in_order() {
        let m = machine(&[(0, 0, StitchKind::Jump), (50, 30, StitchKind::Normal)]);
        assert_eq!(
            header_text(&m),
            "LA:Design Studio\r\nST:2\r\nCO:1\r\n+X:50\r\n-X:0\r\n+Y:30\r\n-Y:0\r\n\
             AX:+0\r\nAY:+0\r\nMX:+0\r\nMY:+0\r\nPD:******\r\n"
        );
    }

    #[test]
    fn file_layout() {
        let m = machine(&[(0, 0, StitchKind::Jump), (50, 30, StitchKind::Normal)]);
        let bytes = Dst::write(&m).unwrap();
        let text = header_text(&m);
        assert_eq!(&bytes[..text.len()], text.as_bytes());
        assert!(bytes[text.len()..HEADER_LEN].iter().all(|&b| b == 0));
        assert_eq!(
            &bytes[HEADER_LEN..],
            &[
                0x00, 0x00, 0x03, // initial
                0x00, 0x00, 0x83, // jump to origin
                0x0E, 0x02, 0x03, // (50, 30)
                0x00, 0x00, 0xF3, // end
            ]
        );
    }

    #[test]
    fn long_move_splits_into_jumps() {
        let m = machine(&[(0, 0, StitchKind::Normal), (200, 0, StitchKind::Normal)]);
        let bytes = Dst::write(&m).unwrap();
        let records: Vec<&[u8]> = bytes[HEADER_LEN..].chunks(3).collect();
        assert_eq!(records.len(), 5);
        assert_eq!(records[2], record(100, 0, StitchKind::Jump));
        assert_eq!(records[3], record(100, 0, StitchKind::Normal));
    }
}
