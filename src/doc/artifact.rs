// src/doc/artifact.rs

//! Binary layout of an encoded image.
//!
//! ```text
//! magic        4 bytes  "SLMC"
//! version      u8
//! width        u32
//! height       u32
//! channels     u8
//! backend      u8
//! filter_mode  u8
//! model_order  u8
//! block_mode   u8
//! then, per channel in order:
//!   symbol_count  u32
//!   tag_len       u32
//!   payload_len   u32
//!   tag block     tag_len bytes
//!   payload       payload_len bytes
//! ```
//!
//! All integers are big-endian.

use crate::doc::config::{EncoderConfig, EntropyBackend, FilterBlockMode, FilterMode};
use crate::image::raster::MAX_CHANNELS;
use crate::utils::error::{CodecError, Result};
use crate::{ARTIFACT_MAGIC, FORMAT_VERSION};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 4 + 1 + 4 + 4 + 1 + 1 + 1 + 1 + 1;

/// Size of each channel block's length fields.
pub const BLOCK_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub backend: EntropyBackend,
    pub filter_mode: FilterMode,
    pub model_order: u8,
    pub block_mode: FilterBlockMode,
}

impl ArtifactHeader {
    pub fn new(width: u32, height: u32, channels: u8, config: &EncoderConfig) -> Result<Self> {
        let model_order = u8::try_from(config.model_order)
            .map_err(|_| CodecError::InvalidArg(format!("model order {}", config.model_order)))?;
        Ok(Self {
            width,
            height,
            channels,
            backend: config.backend,
            filter_mode: config.filter_mode,
            model_order,
            block_mode: config.block_mode,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&ARTIFACT_MAGIC)?;
        writer.write_u8(FORMAT_VERSION)?;
        writer.write_u32::<BigEndian>(self.width)?;
        writer.write_u32::<BigEndian>(self.height)?;
        writer.write_u8(self.channels)?;
        writer.write_u8(self.backend.as_u8())?;
        writer.write_u8(self.filter_mode.as_u8())?;
        writer.write_u8(self.model_order)?;
        writer.write_u8(self.block_mode.as_u8())?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != ARTIFACT_MAGIC {
            return Err(CodecError::Decode(format!("bad magic {:02x?}", magic)));
        }
        let version = reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(CodecError::Decode(format!(
                "unsupported format version {}",
                version
            )));
        }
        let width = reader.read_u32::<BigEndian>()?;
        let height = reader.read_u32::<BigEndian>()?;
        let channels = reader.read_u8()?;
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(CodecError::Decode(format!("channel count {}", channels)));
        }
        let backend = EntropyBackend::from_u8(reader.read_u8()?)?;
        let filter_mode = FilterMode::from_u8(reader.read_u8()?)?;
        let model_order = reader.read_u8()?;
        let block_mode = FilterBlockMode::from_u8(reader.read_u8()?)?;
        Ok(Self {
            width,
            height,
            channels,
            backend,
            filter_mode,
            model_order,
            block_mode,
        })
    }

    /// Rejects artifacts produced under a configuration other than `config`.
    pub fn check_config(&self, config: &EncoderConfig) -> Result<()> {
        let mismatch = |field: &str, stored: String, expected: String| {
            Err(CodecError::Decode(format!(
                "artifact {} is {} but decoder is configured for {}",
                field, stored, expected
            )))
        };
        if self.backend != config.backend {
            return mismatch("backend", format!("{:?}", self.backend), format!("{:?}", config.backend));
        }
        if self.filter_mode != config.filter_mode {
            return mismatch(
                "filter mode",
                format!("{:?}", self.filter_mode),
                format!("{:?}", config.filter_mode),
            );
        }
        if self.model_order as usize != config.model_order {
            return mismatch(
                "model order",
                self.model_order.to_string(),
                config.model_order.to_string(),
            );
        }
        if self.block_mode != config.block_mode {
            return mismatch(
                "block mode",
                format!("{:?}", self.block_mode),
                format!("{:?}", config.block_mode),
            );
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| CodecError::Decode(format!("{}x{} overflows", self.width, self.height)))
    }
}

/// One channel's encoded data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelBlock {
    /// Symbols fed to the entropy coder for the data payload.
    pub symbol_count: u32,
    /// Separately coded filter tags; empty unless tags are separated.
    pub tags: Vec<u8>,
    pub payload: Vec<u8>,
}

impl ChannelBlock {
    pub fn encoded_len(&self) -> usize {
        BLOCK_HEADER_LEN + self.tags.len() + self.payload.len()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.symbol_count)?;
        writer.write_u32::<BigEndian>(len_u32(self.tags.len())?)?;
        writer.write_u32::<BigEndian>(len_u32(self.payload.len())?)?;
        writer.write_all(&self.tags)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Reads one block from the front of `data`, advancing it.
    pub fn read_from(data: &mut &[u8]) -> Result<Self> {
        let symbol_count = data.read_u32::<BigEndian>()?;
        let tag_len = data.read_u32::<BigEndian>()? as usize;
        let payload_len = data.read_u32::<BigEndian>()? as usize;
        // Check before allocating so a corrupt length cannot request gigabytes.
        let needed = tag_len
            .checked_add(payload_len)
            .ok_or_else(|| CodecError::Decode("block lengths overflow".to_string()))?;
        if data.len() < needed {
            return Err(CodecError::Decode(format!(
                "block declares {} bytes but only {} remain",
                needed,
                data.len()
            )));
        }
        let (tags, rest) = data.split_at(tag_len);
        let (payload, rest) = rest.split_at(payload_len);
        *data = rest;
        Ok(Self {
            symbol_count,
            tags: tags.to_vec(),
            payload: payload.to_vec(),
        })
    }
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| CodecError::InvalidArg(format!("block of {} bytes too large", len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let config = EncoderConfig::default().with_model_order(4);
        let header = ArtifactHeader::new(640, 480, 3, &config).unwrap();
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(&buf[..4], b"SLMC");
        assert_eq!(buf[4], FORMAT_VERSION);
        assert_eq!(&buf[5..9], &640u32.to_be_bytes());
        assert_eq!(&buf[9..13], &480u32.to_be_bytes());
        assert_eq!(&buf[13..], &[3, 0, 2, 4, 0]);

        let parsed = ArtifactHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.check_config(&config).is_ok());
        assert!(parsed.check_config(&EncoderConfig::default()).is_err());
    }

    #[test]
    fn test_header_rejects_garbage() {
        assert!(matches!(
            ArtifactHeader::read_from(&mut &b"PNG\x00"[..]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            ArtifactHeader::read_from(&mut &b"SLMC"[..]),
            Err(CodecError::Decode(_))
        ));
        let mut buf = Vec::new();
        ArtifactHeader::new(1, 1, 1, &EncoderConfig::default())
            .unwrap()
            .write_to(&mut buf)
            .unwrap();
        buf[13] = 0;
        assert!(ArtifactHeader::read_from(&mut &buf[..]).is_err());
    }

    #[test]
    fn test_block_framing() {
        let block = ChannelBlock {
            symbol_count: 7,
            tags: vec![1, 2],
            payload: vec![9, 9, 9],
        };
        let mut buf = Vec::new();
        block.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), block.encoded_len());
        buf.push(0xAA);

        let mut cursor = &buf[..];
        assert_eq!(ChannelBlock::read_from(&mut cursor).unwrap(), block);
        assert_eq!(cursor, &[0xAA]);
    }

    #[test]
    fn test_block_truncation() {
        let block = ChannelBlock {
            symbol_count: 1,
            tags: vec![],
            payload: vec![1, 2, 3, 4],
        };
        let mut buf = Vec::new();
        block.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            ChannelBlock::read_from(&mut &buf[..]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            ChannelBlock::read_from(&mut &buf[..5]),
            Err(CodecError::Decode(_))
        ));
    }
}
