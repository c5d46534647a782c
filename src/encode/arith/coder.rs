// src/encode/arith/coder.rs

//! Integer arithmetic coder with carry-free renormalization.
//!
//! The interval `[low, high]` lives in `PRECISION`-bit registers held in
//! `u64` so that `range * total` never overflows. When both ends share their
//! top bit it is shifted out; when the interval straddles the midpoint inside
//! the middle half, the shift is deferred with a pending-bit counter.

use super::model::ContextModel;
use super::ArithmeticError;
use crate::utils::bit_io::{BitFrame, BitReader, BitWriter};

/// Register width in bits.
pub const PRECISION: u32 = 32;

const FULL: u64 = 1 << PRECISION;
const HALF: u64 = FULL >> 1;
const QUARTER: u64 = FULL >> 2;
const TOP: u64 = FULL - 1;

/// Largest context total the coder accepts. After renormalization the range
/// exceeds a quarter of the register, so every symbol with a nonzero count
/// still gets a nonempty subinterval.
pub const MAX_TOTAL_FREQUENCY: u32 = 1 << (PRECISION - 2);

/// Bits the decoder reads beyond the end of a well-formed frame: it primes
/// `PRECISION` bits while the encoder's flush only adds two.
const TRAILING_OVERRUN: usize = PRECISION as usize - 2;

pub struct ArithmeticEncoder {
    writer: BitWriter,
    low: u64,
    high: u64,
    pending: u64,
    symbols: u64,
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEncoder {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(),
            low: 0,
            high: TOP,
            pending: 0,
            symbols: 0,
        }
    }

    /// Current interval, inclusive on both ends.
    pub fn interval(&self) -> (u64, u64) {
        (self.low, self.high)
    }

    pub fn symbols_encoded(&self) -> u64 {
        self.symbols
    }

    /// Narrows the interval to the cumulative range `[cum_low, cum_high)` out
    /// of `total`.
    pub fn encode_range(&mut self, cum_low: u32, cum_high: u32, total: u32) -> Result<(), ArithmeticError> {
        if cum_low >= cum_high || cum_high > total {
            return Err(ArithmeticError::ZeroFrequency {
                low: cum_low,
                high: cum_high,
                total,
            });
        }
        if total > MAX_TOTAL_FREQUENCY {
            return Err(ArithmeticError::FrequencyOverflow {
                total: total as u64,
                limit: MAX_TOTAL_FREQUENCY as u64,
            });
        }

        let range = self.high - self.low + 1;
        self.high = self.low + range * cum_high as u64 / total as u64 - 1;
        self.low += range * cum_low as u64 / total as u64;

        loop {
            if self.high < HALF {
                self.emit(false);
            } else if self.low >= HALF {
                self.emit(true);
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= QUARTER && self.high < HALF + QUARTER {
                self.pending += 1;
                self.low -= QUARTER;
                self.high -= QUARTER;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            debug_assert!(self.low < self.high);
        }
        self.symbols += 1;
        Ok(())
    }

    /// Codes `symbol` with the model's prediction for its current context,
    /// then updates the model.
    pub fn encode_symbol(&mut self, model: &mut ContextModel, symbol: u8) -> Result<(), ArithmeticError> {
        let dist = model.predict(model.context());
        let (low, high) = dist.range(symbol);
        let total = dist.total();
        self.encode_range(low, high, total)?;
        model.observe(symbol);
        Ok(())
    }

    fn emit(&mut self, bit: bool) {
        self.writer.write_bit(bit);
        self.writer.write_run(!bit, self.pending);
        self.pending = 0;
    }

    /// Emits enough bits to pin a value inside the final interval.
    pub fn finish(mut self) -> BitFrame {
        self.pending += 1;
        if self.low < QUARTER {
            self.emit(false);
        } else {
            self.emit(true);
        }
        self.writer.finish()
    }
}

pub struct ArithmeticDecoder<'a> {
    reader: BitReader<'a>,
    low: u64,
    high: u64,
    value: u64,
    symbols: u64,
}

impl<'a> ArithmeticDecoder<'a> {
    pub fn new(frame: &'a BitFrame) -> Self {
        let mut reader = frame.reader();
        let mut value = 0u64;
        for _ in 0..PRECISION {
            value = (value << 1) | reader.read_bit() as u64;
        }
        Self {
            reader,
            low: 0,
            high: TOP,
            value,
            symbols: 0,
        }
    }

    pub fn interval(&self) -> (u64, u64) {
        (self.low, self.high)
    }

    pub fn symbols_decoded(&self) -> u64 {
        self.symbols
    }

    /// Position within `[0, total)` that the current code value maps to.
    pub fn target(&self, total: u32) -> u32 {
        let range = self.high - self.low + 1;
        (((self.value - self.low + 1) * total as u64 - 1) / range) as u32
    }

    /// Consumes the symbol occupying `[cum_low, cum_high)`; mirrors
    /// [`ArithmeticEncoder::encode_range`].
    pub fn consume(&mut self, cum_low: u32, cum_high: u32, total: u32) -> Result<(), ArithmeticError> {
        let range = self.high - self.low + 1;
        self.high = self.low + range * cum_high as u64 / total as u64 - 1;
        self.low += range * cum_low as u64 / total as u64;

        loop {
            if self.high < HALF {
                // nothing to subtract
            } else if self.low >= HALF {
                self.value -= HALF;
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= QUARTER && self.high < HALF + QUARTER {
                self.value -= QUARTER;
                self.low -= QUARTER;
                self.high -= QUARTER;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = (self.value << 1) | self.reader.read_bit() as u64;
            debug_assert!(self.low < self.high);
        }

        if self.reader.overrun() > PRECISION as usize {
            return Err(ArithmeticError::Exhausted {
                decoded: self.symbols,
            });
        }
        self.symbols += 1;
        Ok(())
    }

    /// Decodes one symbol under the model's current context, then updates
    /// the model exactly as the encoder did.
    pub fn decode_symbol(&mut self, model: &mut ContextModel) -> Result<u8, ArithmeticError> {
        let dist = model.predict(model.context());
        let total = dist.total();
        let target = self.target(total);
        let (symbol, low, high) = dist
            .find(target)
            .ok_or(ArithmeticError::SymbolNotFound { target, total })?;
        self.consume(low, high, total)?;
        model.observe(symbol);
        Ok(symbol)
    }

    /// Checks that decoding ended exactly where the encoder stopped.
    pub fn finish(self, expected: u64) -> Result<(), ArithmeticError> {
        if self.reader.remaining() != 0 || self.reader.overrun() != TRAILING_OVERRUN {
            return Err(ArithmeticError::StreamCorruption {
                expected,
                unread_bits: self.reader.remaining(),
                overrun_bits: self.reader.overrun(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::arith::model::ModelParams;

    fn model(order: usize) -> ContextModel {
        ContextModel::new(order, ModelParams::default()).unwrap()
    }

    fn sample(len: usize) -> Vec<u8> {
        let mut state = 0x1234_5678u32;
        (0..len)
            .map(|i| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                if i % 5 == 0 {
                    (state >> 24) as u8
                } else {
                    (i / 7) as u8
                }
            })
            .collect()
    }

    fn round_trip(data: &[u8], order: usize) -> Vec<u8> {
        let mut enc_model = model(order);
        let mut encoder = ArithmeticEncoder::new();
        for &s in data {
            encoder.encode_symbol(&mut enc_model, s).unwrap();
            let (low, high) = encoder.interval();
            assert!(low < high);
        }
        let frame = encoder.finish();

        let mut dec_model = model(order);
        let mut decoder = ArithmeticDecoder::new(&frame);
        let mut out = Vec::with_capacity(data.len());
        for _ in 0..data.len() {
            out.push(decoder.decode_symbol(&mut dec_model).unwrap());
            let (low, high) = decoder.interval();
            assert!(low < high);
        }
        decoder.finish(data.len() as u64).unwrap();
        out
    }

    #[test]
    fn test_round_trip_orders() {
        let data = sample(3000);
        for order in 0..=4 {
            assert_eq!(round_trip(&data, order), data, "order {}", order);
        }
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(round_trip(&[], 3), Vec::<u8>::new());
        assert_eq!(round_trip(&[0xFF], 3), vec![0xFF]);
        assert_eq!(round_trip(&[0x00], 4), vec![0x00]);
    }

    #[test]
    fn test_skewed_input_compresses() {
        let data = vec![0x41u8; 4000];
        let mut m = model(3);
        let mut encoder = ArithmeticEncoder::new();
        for &s in &data {
            encoder.encode_symbol(&mut m, s).unwrap();
        }
        let frame = encoder.finish();
        assert!(frame.bit_len() < 4000 / 4, "{} bits", frame.bit_len());
        assert_eq!(round_trip(&data, 3), data);
    }

    #[test]
    fn test_rejects_zero_width_range() {
        let mut encoder = ArithmeticEncoder::new();
        assert!(matches!(
            encoder.encode_range(5, 5, 10),
            Err(ArithmeticError::ZeroFrequency { .. })
        ));
        assert!(matches!(
            encoder.encode_range(0, 11, 10),
            Err(ArithmeticError::ZeroFrequency { .. })
        ));
        assert!(matches!(
            encoder.encode_range(0, 1, MAX_TOTAL_FREQUENCY + 1),
            Err(ArithmeticError::FrequencyOverflow { .. })
        ));
    }

    #[test]
    fn test_too_many_symbols_detected() {
        let data = sample(200);
        let mut m = model(3);
        let mut encoder = ArithmeticEncoder::new();
        for &s in &data {
            encoder.encode_symbol(&mut m, s).unwrap();
        }
        let frame = encoder.finish();

        let mut dec_model = model(3);
        let mut decoder = ArithmeticDecoder::new(&frame);
        let mut failed = false;
        for _ in 0..data.len() + 400 {
            if decoder.decode_symbol(&mut dec_model).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed || decoder.finish(data.len() as u64 + 400).is_err());
    }

    #[test]
    fn test_too_few_symbols_detected() {
        let data = sample(500);
        let mut m = model(3);
        let mut encoder = ArithmeticEncoder::new();
        for &s in &data {
            encoder.encode_symbol(&mut m, s).unwrap();
        }
        let frame = encoder.finish();

        let mut dec_model = model(3);
        let mut decoder = ArithmeticDecoder::new(&frame);
        for _ in 0..data.len() / 2 {
            decoder.decode_symbol(&mut dec_model).unwrap();
        }
        assert!(matches!(
            decoder.finish(data.len() as u64 / 2),
            Err(ArithmeticError::StreamCorruption { .. })
        ));
    }
}
