//! Little-endian header field helpers shared by the binary writers.

use std::fmt::Display;

use stitchwork_pipeline::ProcessingError;

use crate::format::FormatTag;

/// Write `value` as little-endian `u16` at `offset`.
///
/// # Panics
///
/// If `buf` is shorter than `offset + 2`. Writers allocate each header
/// at its full length before filling fields.
pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Write `value` as little-endian `u32` at `offset`.
pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Write `value` as little-endian `i32` at `offset`.
pub fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Write `[len as u32][signature]` at the start of `buf`.
pub fn put_signature(buf: &mut [u8], signature: &[u8]) {
    let len = u32::try_from(signature.len()).unwrap_or(u32::MAX);
    put_u32(buf, 0, len);
    buf[4..4 + signature.len()].copy_from_slice(signature);
}

/// Narrow a header value, failing when the field is too small for it.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] naming the format and field.
pub fn field<T, V>(value: V, tag: FormatTag, name: &str) -> Result<T, ProcessingError>
where
    T: TryFrom<V>,
    V: Copy + Display,
{
    T::try_from(value).map_err(|_| {
        ProcessingError::InvalidPattern(format!("{name} {value} does not fit a {tag} header"))
    })
}

/// Copy a thread table into `buf[offset..end]`.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidPattern`] if the table is longer
/// than the reserved space.
pub fn put_table(
    buf: &mut [u8],
    offset: usize,
    end: usize,
    table: &[u8],
    tag: FormatTag,
) -> Result<(), ProcessingError> {
    if table.len() > end - offset {
        return Err(ProcessingError::InvalidPattern(format!(
            "{} colors exceed the {} thread slots of a {tag} header",
            table.len(),
            end - offset
        )));
    }
    buf[offset..offset + table.len()].copy_from_slice(table);
    Ok(())
}

/// Low byte of a two's-complement delta.
pub const fn byte(d: i32) -> u8 {
    d.to_le_bytes()[0]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_fields() {
        let mut buf = [0u8; 12];
        put_u16(&mut buf, 0, 0x1234);
        put_u32(&mut buf, 2, 0xAABB_CCDD);
        put_i32(&mut buf, 6, -2);
        assert_eq!(buf[..6], [0x34, 0x12, 0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(buf[6..10], [0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn signature_is_length_prefixed() {
        let mut buf = [0u8; 8];
        put_signature(&mut buf, b"VP3");
        assert_eq!(buf, [3, 0, 0, 0, b'V', b'P', b'3', 0]);
    }

    #[test]
    fn field_overflow_names_the_format() {
        let err = field::<u16, i32>(70_000, FormatTag::Pes, "width").unwrap_err();
        assert!(err.to_string().contains("pes"));
        assert_eq!(field::<u16, i32>(2000, FormatTag::Pes, "width").unwrap(), 2000);
    }

    #[test]
    fn table_overflow_is_rejected() {
        let mut buf = [0u8; 8];
        assert!(put_table(&mut buf, 4, 6, &[1, 2, 3], FormatTag::Jef).is_err());
        put_table(&mut buf, 4, 6, &[1, 2], FormatTag::Jef).unwrap();
        assert_eq!(buf[4..6], [1, 2]);
    }

    #[test]
    fn byte_is_twos_complement() {
        assert_eq!(byte(-1), 0xFF);
        assert_eq!(byte(-127), 0x81);
        assert_eq!(byte(100), 100);
    }
}
