// src/doc/image_encoder.rs

//! Splits an image into channels, runs each through a [`ChannelCodec`] and
//! concatenates the results behind an [`ArtifactHeader`].

use crate::doc::artifact::{ArtifactHeader, ChannelBlock, HEADER_LEN};
use crate::doc::channel_codec::{codec_for, ChannelCodec};
use crate::doc::config::EncoderConfig;
use crate::encode::filter::{unfilter_plane, FilterStrategy, FilterType, FilteredPlane};
use crate::image::raster::{ChannelPlane, Image};
use crate::utils::error::{CodecError, Result};
use log::{debug, info};

/// Encodes `image` under `config`.
pub fn encode_image(image: &Image, config: &EncoderConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let codec = codec_for(config);
    encode_with(image, config, codec.as_ref())
}

/// Decodes an artifact produced by [`encode_image`] with the same `config`.
pub fn decode_image(artifact: &[u8], config: &EncoderConfig) -> Result<Image> {
    config.validate()?;
    let codec = codec_for(config);
    decode_with(artifact, config, codec.as_ref())
}

/// Encodes with an explicit compressor; `config` supplies the layout.
pub fn encode_with(image: &Image, config: &EncoderConfig, codec: &dyn ChannelCodec) -> Result<Vec<u8>> {
    let header = ArtifactHeader::new(image.width(), image.height(), image.channels(), config)?;
    let planes = image.planes();

    let blocks = map_channels(&planes, |plane| encode_channel(plane, config, codec))?;

    let body: usize = blocks.iter().map(ChannelBlock::encoded_len).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + body);
    header.write_to(&mut out)?;
    for (i, block) in blocks.iter().enumerate() {
        debug!(
            "channel {}: {} symbols, {} tag bytes, {} payload bytes",
            i,
            block.symbol_count,
            block.tags.len(),
            block.payload.len()
        );
        block.write_to(&mut out)?;
    }
    info!(
        "{}: {}x{}x{} -> {} bytes",
        codec.name(),
        image.width(),
        image.height(),
        image.channels(),
        out.len()
    );
    Ok(out)
}

pub fn decode_with(artifact: &[u8], config: &EncoderConfig, codec: &dyn ChannelCodec) -> Result<Image> {
    let mut cursor = artifact;
    let header = ArtifactHeader::read_from(&mut cursor)?;
    header.check_config(config)?;

    let mut blocks = Vec::with_capacity(header.channels as usize);
    for _ in 0..header.channels {
        blocks.push(ChannelBlock::read_from(&mut cursor)?);
    }
    if !cursor.is_empty() {
        return Err(CodecError::Decode(format!(
            "{} trailing bytes after last channel",
            cursor.len()
        )));
    }

    let planes = map_channels(&blocks, |block| decode_channel(block, &header, config, codec))?;
    debug!("decoded {} channels of {}x{}", planes.len(), header.width, header.height);
    Image::from_planes(&planes)
}

fn encode_channel(plane: &ChannelPlane, config: &EncoderConfig, codec: &dyn ChannelCodec) -> Result<ChannelBlock> {
    let filtered = codec.filter_channel(plane);

    let (symbols, tags) = if config.separates_tags() {
        let tags = codec.encode_tags(&filtered.tag_bytes())?;
        (filtered.residuals, tags)
    } else {
        (filtered.to_interleaved(), Vec::new())
    };

    let symbol_count = u32::try_from(symbols.len())
        .map_err(|_| CodecError::InvalidArg(format!("channel of {} bytes too large", symbols.len())))?;
    let payload = codec.entropy_encode(&symbols)?;
    Ok(ChannelBlock {
        symbol_count,
        tags,
        payload,
    })
}

fn decode_channel(
    block: &ChannelBlock,
    header: &ArtifactHeader,
    config: &EncoderConfig,
    codec: &dyn ChannelCodec,
) -> Result<ChannelPlane> {
    let width = header.width as usize;
    let height = header.height as usize;
    let pixels = header.pixel_count()?;

    let expected = if config.tags_rows() && !config.separates_tags() {
        pixels + height
    } else {
        pixels
    };
    if block.symbol_count as usize != expected {
        return Err(CodecError::Decode(format!(
            "block declares {} symbols, {}x{} needs {}",
            block.symbol_count, width, height, expected
        )));
    }
    if !config.separates_tags() && !block.tags.is_empty() {
        return Err(CodecError::Decode(
            "tag block present in a layout without separated tags".to_string(),
        ));
    }

    let symbols = codec.entropy_decode(&block.payload, expected)?;
    if symbols.len() != expected {
        return Err(CodecError::StreamCorruption(format!(
            "decoded {} symbols, expected {}",
            symbols.len(),
            expected
        )));
    }

    let (filter_types, residuals) = if !config.tags_rows() {
        let fixed = match config.strategy() {
            FilterStrategy::Fixed(t) => t,
            FilterStrategy::Adaptive(_) => FilterType::None,
        };
        (vec![fixed; height], symbols)
    } else if config.separates_tags() {
        let raw_tags = codec.decode_tags(&block.tags, height)?;
        let tags = raw_tags
            .into_iter()
            .map(FilterType::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        (tags, symbols)
    } else {
        let parsed = FilteredPlane::from_interleaved(width, height, &symbols)?;
        (parsed.filter_types, parsed.residuals)
    };

    let data = unfilter_plane(width, height, &residuals, &filter_types)?;
    ChannelPlane::new(header.width, header.height, data)
}

// Channels carry no shared state, so they may run on separate threads; the
// output keeps channel order either way.
#[cfg(feature = "rayon")]
fn map_channels<T, U, F>(items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "rayon"))]
fn map_channels<T, U, F>(items: &[T], f: F) -> Result<Vec<U>>
where
    F: Fn(&T) -> Result<U>,
{
    items.iter().map(f).collect()
}
