//! Output format tags and the writer seam.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stitchwork_pipeline::ProcessingError;

use crate::normalize::MachinePattern;

/// A machine embroidery file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    /// Tajima.
    Dst,
    /// Brother.
    Pes,
    /// Janome.
    Jef,
    /// Melco.
    Exp,
    /// Pfaff / Viking.
    Vp3,
    /// Husqvarna.
    Hus,
    /// Gammill.
    Pat,
    /// Quilting machines.
    Qcc,
}

impl FormatTag {
    /// Every supported format, in menu order.
    pub const ALL: [Self; 8] = [
        Self::Dst,
        Self::Pes,
        Self::Jef,
        Self::Exp,
        Self::Vp3,
        Self::Hus,
        Self::Pat,
        Self::Qcc,
    ];

    /// File extension without the dot. Identical to the tag name.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Dst => "dst",
            Self::Pes => "pes",
            Self::Jef => "jef",
            Self::Exp => "exp",
            Self::Vp3 => "vp3",
            Self::Hus => "hus",
            Self::Pat => "pat",
            Self::Qcc => "qcc",
        }
    }

    /// Whether the layout is checked byte-for-byte against machine files.
    ///
    /// Only DST is; the other writers follow an approximate contract.
    #[must_use]
    pub const fn is_exact(self) -> bool {
        matches!(self, Self::Dst)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FormatTag {
    type Err = ProcessingError;

    /// Parse a tag, ignoring case and a leading dot (`".DST"` works).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|t| t.extension().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ProcessingError::UnsupportedFormat(s.to_string()))
    }
}

/// A per-format encoder over a normalized pattern.
///
/// Implementors own their header layout and their stitch record
/// encoding. Dispatch by tag lives in [`crate::encode_pattern`].
pub trait FormatWriter {
    /// The format this writer produces.
    const TAG: FormatTag;

    /// Encode a normalized pattern into a complete file image.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidPattern`] when a header field
    /// cannot hold the pattern's counts or dimensions.
    fn write(pattern: &MachinePattern) -> Result<Vec<u8>, ProcessingError>;
}
