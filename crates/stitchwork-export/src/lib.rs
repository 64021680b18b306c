//! stitchwork-export: Pure embroidery machine format encoders (sans-IO)
//!
//! Serializes a [`StitchPattern`] to the bytes of a machine file. Every
//! writer shares the same front half: [`normalize`] validates the pattern,
//! moves its minimum corner to the origin and converts millimetres to
//! 0.1 mm integer units. Each writer then owns its header and its
//! per-stitch record encoding.
//!
//! Supported formats: DST (byte-exact), PES, JEF, EXP, VP3, HUS, PAT, QCC.

pub mod delta;
pub mod dst;
pub mod exp;
pub mod format;
pub mod header;
pub mod hus;
pub mod jef;
pub mod normalize;
pub mod palette;
pub mod pat;
pub mod pes;
pub mod qcc;
pub mod vp3;

pub use format::{FormatTag, FormatWriter};
pub use normalize::{MachinePattern, MachineStitch, normalize};

use stitchwork_pipeline::{ProcessingError, StitchPattern};
use tracing::debug;

/// Encode `pattern` in the given format.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] if the pattern is empty,
/// has non-finite coordinates or non-positive dimensions, or does not
/// fit the format's header fields.
pub fn encode_pattern(
    pattern: &StitchPattern,
    format: FormatTag,
) -> Result<Vec<u8>, ProcessingError> {
    let machine = normalize(pattern)?;
    let bytes = match format {
        FormatTag::Dst => dst::Dst::write(&machine),
        FormatTag::Pes => pes::Pes::write(&machine),
        FormatTag::Jef => jef::Jef::write(&machine),
        FormatTag::Exp => exp::Exp::write(&machine),
        FormatTag::Vp3 => vp3::Vp3::write(&machine),
        FormatTag::Hus => hus::Hus::write(&machine),
        FormatTag::Pat => pat::Pat::write(&machine),
        FormatTag::Qcc => qcc::Qcc::write(&machine),
    }?;
    debug!(%format, bytes = bytes.len(), "pattern encoded");
    Ok(bytes)
}

/// Encode `pattern` in the format named by `tag` (`"dst"`, `".PES"`, ...).
///
/// # Errors
///
/// Returns [`ProcessingError::UnsupportedFormat`] for an unknown tag,
/// otherwise as [`encode_pattern`].
pub fn encode_pattern_as(pattern: &StitchPattern, tag: &str) -> Result<Vec<u8>, ProcessingError> {
    encode_pattern(pattern, tag.parse()?)
}

#[cfg(test)]
pub(crate) mod testing {
    use stitchwork_pipeline::{StitchKind, ThreadColor};

    use crate::normalize::{MachinePattern, MachineStitch};

    /// A one-color 10 mm square design with the given stitches.
    pub fn machine(stitches: &[(i32, i32, StitchKind)]) -> MachinePattern {
        let with_color: Vec<_> = stitches.iter().map(|&(x, y, k)| (x, y, k, 0)).collect();
        machine_with_colors(&with_color, vec![ThreadColor::BLACK])
    }

    pub fn machine_with_colors(
        stitches: &[(i32, i32, StitchKind, usize)],
        colors: Vec<ThreadColor>,
    ) -> MachinePattern {
        MachinePattern {
            stitches: stitches
                .iter()
                .map(|&(x, y, kind, color)| MachineStitch { x, y, kind, color })
                .collect(),
            colors,
            width: 100,
            height: 100,
            name: "test".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stitchwork_pipeline::{
        PatternDimensions, PatternMetadata, StitchKind, StitchPoint, ThreadColor,
    };

    use super::*;

    fn square() -> StitchPattern {
        let stitches = [(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0), (0.0, 0.0)]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let kind = if i == 0 {
                    StitchKind::Jump
                } else {
                    StitchKind::Normal
                };
                StitchPoint::new(x, y, kind, ThreadColor::BLACK)
            })
            .collect();
        StitchPattern::new(
            stitches,
            PatternDimensions {
                width: 5.0,
                height: 5.0,
            },
            PatternMetadata {
                name: "square".to_string(),
                created_at: None,
                source_format: "image".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn every_format_encodes() {
        let pattern = square();
        for tag in FormatTag::ALL {
            let bytes = encode_pattern(&pattern, tag).unwrap();
            assert!(!bytes.is_empty(), "{tag} produced no bytes");
        }
    }

    #[test]
    fn by_name_matches_by_tag() {
        let pattern = square();
        assert_eq!(
            encode_pattern_as(&pattern, "DST").unwrap(),
            encode_pattern(&pattern, FormatTag::Dst).unwrap()
        );
    }

    #[test]
    fn unknown_name_is_unsupported() {
        assert!(matches!(
            encode_pattern_as(&square(), "svg"),
            Err(ProcessingError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn invalid_pattern_fails_every_format() {
        let mut pattern = square();
        pattern.stitches[2].x = f64::NAN;
        for tag in FormatTag::ALL {
            assert!(matches!(
                encode_pattern(&pattern, tag),
                Err(ProcessingError::InvalidPattern(_))
            ));
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let pattern = square();
        for tag in FormatTag::ALL {
            assert_eq!(
                encode_pattern(&pattern, tag).unwrap(),
                encode_pattern(&pattern, tag).unwrap()
            );
        }
    }
}
