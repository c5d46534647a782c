// src/encode/stream.rs

//! General-purpose stream compressor used as the comparison baseline (zlib).

use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::decompress_to_vec_zlib_with_limit;
use thiserror::Error;

/// zlib's own default trade-off.
pub const DEFAULT_LEVEL: u8 = 6;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StreamError {
    #[error("zlib level {0} out of range 0..=10")]
    InvalidLevel(u8),
    #[error("zlib stream rejected: {0}")]
    Inflate(String),
    #[error("zlib stream expanded to {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>, StreamError> {
    if level > 10 {
        return Err(StreamError::InvalidLevel(level));
    }
    Ok(compress_to_vec_zlib(data, level))
}

/// Inflates a zlib stream that must expand to exactly `expected` bytes.
pub fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, StreamError> {
    // One byte of headroom distinguishes "too long" from "exactly right".
    let out = decompress_to_vec_zlib_with_limit(data, expected.saturating_add(1))
        .map_err(|e| StreamError::Inflate(format!("{:?}", e.status)))?;
    if out.len() != expected {
        return Err(StreamError::LengthMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 13) as u8).collect();
        let packed = deflate(&data, DEFAULT_LEVEL).unwrap();
        assert!(packed.len() < data.len() / 4);
        assert_eq!(inflate(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_length_checked() {
        let packed = deflate(&[1, 2, 3, 4], DEFAULT_LEVEL).unwrap();
        assert!(matches!(
            inflate(&packed, 3),
            Err(StreamError::Inflate(_)) | Err(StreamError::LengthMismatch { .. })
        ));
        assert_eq!(
            inflate(&packed, 5),
            Err(StreamError::LengthMismatch { expected: 5, actual: 4 })
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(inflate(&[0xde, 0xad, 0xbe, 0xef], 10).is_err());
        assert_eq!(deflate(&[], 11), Err(StreamError::InvalidLevel(11)));
    }
}
