// src/utils/bit_io.rs

//! Packed bit writer/reader with explicit length framing.
//!
//! A [`BitFrame`] is serialized as a big-endian `u32` bit count followed by
//! `ceil(bit_len / 8)` bytes, most significant bit first. The final byte is
//! zero-padded.

use bitvec::prelude::*;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BitstreamError {
    #[error("I/O error in bit frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bit frame declares {declared} bits but only {available} are present")]
    Truncated { declared: u64, available: u64 },
    #[error("Bit frame of {0} bits exceeds the u32 length field")]
    TooLong(usize),
    #[error("Cannot read {0} bits at once (max 64)")]
    WidthTooLarge(u32),
}

/// Accumulates single bits into a packed, MSB-first buffer.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Writes `count` copies of `bit`.
    pub fn write_run(&mut self, bit: bool, count: u64) {
        for _ in 0..count {
            self.bits.push(bit);
        }
    }

    /// Writes the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, width: u32) -> Result<(), BitstreamError> {
        if width > 64 {
            return Err(BitstreamError::WidthTooLarge(width));
        }
        for i in (0..width).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn finish(mut self) -> BitFrame {
        let bit_len = self.bits.len();
        self.bits.set_uninitialized(false);
        BitFrame {
            bit_len,
            bytes: self.bits.into_vec(),
        }
    }
}

/// A packed bit sequence together with its exact length in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFrame {
    bit_len: usize,
    bytes: Vec<u8>,
}

impl BitFrame {
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialized size: length prefix plus packed bytes.
    pub fn encoded_len(&self) -> usize {
        4 + self.bytes.len()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), BitstreamError> {
        let bit_len =
            u32::try_from(self.bit_len).map_err(|_| BitstreamError::TooLong(self.bit_len))?;
        writer.write_u32::<BigEndian>(bit_len)?;
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BitstreamError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Parses a frame that must occupy the whole of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, BitstreamError> {
        let mut cursor = data;
        let bit_len = cursor.read_u32::<BigEndian>()? as u64;
        let byte_len = bit_len.div_ceil(8);
        let available = cursor.len() as u64;
        if available != byte_len {
            return Err(BitstreamError::Truncated {
                declared: bit_len,
                available: available * 8,
            });
        }
        let mut bytes = vec![0u8; byte_len as usize];
        cursor.read_exact(&mut bytes)?;
        Ok(Self {
            bit_len: bit_len as usize,
            bytes,
        })
    }

    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(&self.bytes.view_bits::<Msb0>()[..self.bit_len])
    }
}

/// Reads bits from a frame. Reads past the end yield zeros and are counted,
/// so callers can bound how far a decoder is allowed to run over.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
    overrun: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a BitSlice<u8, Msb0>) -> Self {
        Self {
            bits,
            pos: 0,
            overrun: 0,
        }
    }

    #[inline]
    pub fn read_bit(&mut self) -> bool {
        match self.bits.get(self.pos) {
            Some(bit) => {
                self.pos += 1;
                *bit
            }
            None => {
                self.overrun += 1;
                false
            }
        }
    }

    pub fn read_bits(&mut self, width: u32) -> Result<u64, BitstreamError> {
        if width > 64 {
            return Err(BitstreamError::WidthTooLarge(width));
        }
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | self.read_bit() as u64;
        }
        Ok(value)
    }

    /// Bits consumed from the frame, not counting zero padding past the end.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of reads that fell past the end of the frame.
    pub fn overrun(&self) -> usize {
        self.overrun
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }
}
