// src/doc/channel_codec.rs

//! Per-channel compressors the image harness can drive.

use crate::doc::config::{EncoderConfig, EntropyBackend};
use crate::encode::arith::{self, ModelParams};
use crate::encode::filter::{filter_plane, FilterStrategy, FilteredPlane};
use crate::encode::stream;
use crate::image::raster::ChannelPlane;
use crate::utils::bit_io::BitFrame;
use crate::utils::error::Result;

/// What a compressor must provide for the harness to run it on one channel.
///
/// Implementations hold configuration only; every call builds its own
/// models, so one instance can serve any number of channels or images.
pub trait ChannelCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Filters a plane row by row.
    fn filter_channel(&self, plane: &ChannelPlane) -> FilteredPlane;

    fn entropy_encode(&self, symbols: &[u8]) -> Result<Vec<u8>>;

    /// Inverse of `entropy_encode`; `count` is the number of symbols encoded.
    fn entropy_decode(&self, payload: &[u8], count: usize) -> Result<Vec<u8>>;

    /// Codes a separated block of row tags.
    fn encode_tags(&self, tags: &[u8]) -> Result<Vec<u8>> {
        self.entropy_encode(tags)
    }

    fn decode_tags(&self, payload: &[u8], count: usize) -> Result<Vec<u8>> {
        self.entropy_decode(payload, count)
    }
}

/// PNG filters followed by order-K Markov arithmetic coding.
#[derive(Debug, Clone, Copy)]
pub struct FilteredArithmetic {
    pub strategy: FilterStrategy,
    pub order: usize,
    pub tag_order: usize,
    pub params: ModelParams,
}

impl ChannelCodec for FilteredArithmetic {
    fn name(&self) -> &'static str {
        "filtered-arithmetic"
    }

    fn filter_channel(&self, plane: &ChannelPlane) -> FilteredPlane {
        filter_plane(plane, self.strategy)
    }

    fn entropy_encode(&self, symbols: &[u8]) -> Result<Vec<u8>> {
        let frame = arith::encode_symbols(symbols, self.order, self.params)?;
        Ok(frame.to_bytes()?)
    }

    fn entropy_decode(&self, payload: &[u8], count: usize) -> Result<Vec<u8>> {
        let frame = BitFrame::from_bytes(payload)?;
        Ok(arith::decode_symbols(&frame, count, self.order, self.params)?)
    }

    fn encode_tags(&self, tags: &[u8]) -> Result<Vec<u8>> {
        let frame = arith::encode_symbols(tags, self.tag_order, self.params)?;
        Ok(frame.to_bytes()?)
    }

    fn decode_tags(&self, payload: &[u8], count: usize) -> Result<Vec<u8>> {
        let frame = BitFrame::from_bytes(payload)?;
        Ok(arith::decode_symbols(&frame, count, self.tag_order, self.params)?)
    }
}

/// PNG filters followed by zlib, the way a PNG file is compressed.
#[derive(Debug, Clone, Copy)]
pub struct FilteredDeflate {
    pub strategy: FilterStrategy,
    pub level: u8,
}

impl ChannelCodec for FilteredDeflate {
    fn name(&self) -> &'static str {
        "filtered-deflate"
    }

    fn filter_channel(&self, plane: &ChannelPlane) -> FilteredPlane {
        filter_plane(plane, self.strategy)
    }

    fn entropy_encode(&self, symbols: &[u8]) -> Result<Vec<u8>> {
        Ok(stream::deflate(symbols, self.level)?)
    }

    fn entropy_decode(&self, payload: &[u8], count: usize) -> Result<Vec<u8>> {
        Ok(stream::inflate(payload, count)?)
    }
}

/// Builds the compressor selected by `config`.
pub fn codec_for(config: &EncoderConfig) -> Box<dyn ChannelCodec> {
    let strategy = config.strategy();
    match config.backend {
        EntropyBackend::Arithmetic => Box::new(FilteredArithmetic {
            strategy,
            order: config.model_order,
            tag_order: config.tag_model_order,
            params: config.model_params,
        }),
        EntropyBackend::Deflate => Box::new(FilteredDeflate {
            strategy,
            level: config.deflate_level,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::filter::FilterType;

    fn codecs() -> Vec<Box<dyn ChannelCodec>> {
        let base = EncoderConfig::default();
        vec![
            codec_for(&base),
            codec_for(&base.with_backend(EntropyBackend::Deflate)),
        ]
    }

    #[test]
    fn test_entropy_round_trip() {
        let data: Vec<u8> = (0..1500u32).map(|i| ((i / 3) % 40) as u8).collect();
        for codec in codecs() {
            let packed = codec.entropy_encode(&data).unwrap();
            assert!(packed.len() < data.len(), "{}", codec.name());
            assert_eq!(codec.entropy_decode(&packed, data.len()).unwrap(), data);

            let tags = vec![4u8, 4, 1, 2, 2, 2, 0];
            let packed_tags = codec.encode_tags(&tags).unwrap();
            assert_eq!(codec.decode_tags(&packed_tags, tags.len()).unwrap(), tags);
        }
    }

    #[test]
    fn test_filter_channel_follows_strategy() {
        let plane = ChannelPlane::new(2, 2, vec![10, 12, 9, 11]).unwrap();
        let codec = codec_for(&EncoderConfig::default().with_fixed_filter(FilterType::Sub));
        let filtered = codec.filter_channel(&plane);
        assert_eq!(filtered.residuals, vec![10, 2, 9, 2]);
        assert!(!filtered.tagged);
    }

    #[test]
    fn test_names() {
        let names: Vec<&str> = codecs().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["filtered-arithmetic", "filtered-deflate"]);
    }
}
