// src/encode/arith/mod.rs

//! Markov-context arithmetic coding of byte streams.

pub mod coder;
pub mod model;

pub use coder::{ArithmeticDecoder, ArithmeticEncoder, MAX_TOTAL_FREQUENCY, PRECISION};
pub use model::{ContextKey, ContextModel, Distribution, ModelParams};

use crate::utils::bit_io::{BitFrame, BitstreamError};
use log::trace;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArithmeticError {
    #[error("Bitstream error: {0}")]
    Bitstream(#[from] BitstreamError),
    #[error("Unsupported model order {0} (max {max})", max = model::MAX_ORDER)]
    InvalidOrder(usize),
    #[error("Invalid model parameters: {0}")]
    InvalidParams(String),
    #[error("Frequency total {total} exceeds limit {limit}")]
    FrequencyOverflow { total: u64, limit: u64 },
    #[error("Empty cumulative range [{low}, {high}) out of {total}")]
    ZeroFrequency { low: u32, high: u32, total: u32 },
    #[error("No symbol covers target {target} of {total}")]
    SymbolNotFound { target: u32, total: u32 },
    #[error("Input exhausted after {decoded} symbols")]
    Exhausted { decoded: u64 },
    #[error(
        "Decoded {expected} symbols but the stream disagrees ({unread_bits} unread bits, {overrun_bits} bits past end)"
    )]
    StreamCorruption {
        expected: u64,
        unread_bits: usize,
        overrun_bits: usize,
    },
}

/// Codes `symbols` with a fresh order-`order` model.
pub fn encode_symbols(symbols: &[u8], order: usize, params: ModelParams) -> Result<BitFrame, ArithmeticError> {
    let mut model = ContextModel::new(order, params)?;
    let mut encoder = ArithmeticEncoder::new();
    for &s in symbols {
        encoder.encode_symbol(&mut model, s)?;
    }
    let frame = encoder.finish();
    trace!(
        "arithmetic: {} symbols -> {} bits, {} contexts",
        symbols.len(),
        frame.bit_len(),
        model.contexts_seen()
    );
    Ok(frame)
}

/// Decodes exactly `count` symbols with a fresh model of the same
/// configuration the encoder used.
pub fn decode_symbols(frame: &BitFrame, count: usize, order: usize, params: ModelParams) -> Result<Vec<u8>, ArithmeticError> {
    let mut model = ContextModel::new(order, params)?;
    let mut decoder = ArithmeticDecoder::new(frame);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(decoder.decode_symbol(&mut model)?);
    }
    decoder.finish(count as u64)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_round_trip() {
        let data: Vec<u8> = b"abracadabra, abracadabra, abracadabra!".repeat(20);
        let frame = encode_symbols(&data, 3, ModelParams::default()).unwrap();
        assert!(frame.bit_len() < data.len() * 8 / 2);
        let decoded = decode_symbols(&frame, data.len(), 3, ModelParams::default()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_mismatched_order_is_detected() {
        let data: Vec<u8> = (0..600u32).map(|i| (i % 17) as u8 * 13).collect();
        let frame = encode_symbols(&data, 4, ModelParams::default()).unwrap();
        // Another order drifts away from the encoder's model.
        match decode_symbols(&frame, data.len(), 1, ModelParams::default()) {
            Ok(decoded) => assert_ne!(decoded, data),
            Err(e) => assert!(matches!(
                e,
                ArithmeticError::StreamCorruption { .. } | ArithmeticError::Exhausted { .. }
            )),
        }
    }

    #[test]
    fn test_framed_bytes_round_trip() {
        let data = vec![1u8, 2, 3, 1, 2, 3, 1, 2, 3];
        let frame = encode_symbols(&data, 3, ModelParams::default()).unwrap();
        let parsed = BitFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(decode_symbols(&parsed, data.len(), 3, ModelParams::default()).unwrap(), data);
    }

    #[test]
    fn test_invalid_order() {
        assert!(matches!(
            encode_symbols(&[1], 9, ModelParams::default()),
            Err(ArithmeticError::InvalidOrder(9))
        ));
    }
}
