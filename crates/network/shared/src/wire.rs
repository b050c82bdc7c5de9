//! Big-endian u32 load/store helpers.
//!
//! Both header fields of the binary envelope go through this pair so the
//! byte order is decided in exactly one place.

use crate::error::FormatError;

/// Append `value` to `out` in network byte order.
pub fn store_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Read one u32 in network byte order from the front of `bytes`.
pub fn load_u32(bytes: &[u8]) -> Result<u32, FormatError> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(FormatError::ShortHeader {
            expected: 4,
            got: bytes.len(),
        })?;
    Ok(u32::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_load_roundtrip() {
        let mut buf = Vec::new();
        store_u32(&mut buf, 0xDEAD_BEEF);
        assert_eq!(buf, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(load_u32(&buf).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn load_rejects_short_input() {
        assert!(matches!(
            load_u32(&[1, 2, 3]),
            Err(FormatError::ShortHeader { expected: 4, got: 3 })
        ));
    }
}
