// src/doc/stats.rs

//! Size figures for comparing compressors on the same image.

use crate::doc::config::EncoderConfig;
use crate::doc::image_encoder::{decode_image, encode_image};
use crate::image::raster::Image;
use crate::utils::error::{CodecError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionStats {
    pub raw_bytes: usize,
    pub encoded_bytes: usize,
    pub pixels: usize,
}

impl CompressionStats {
    /// Encodes `image`, checks that it decodes back unchanged, and reports
    /// the sizes.
    pub fn measure(image: &Image, config: &EncoderConfig) -> Result<Self> {
        let artifact = encode_image(image, config)?;
        let decoded = decode_image(&artifact, config)?;
        if decoded != *image {
            return Err(CodecError::StreamCorruption(
                "decoded image differs from input".to_string(),
            ));
        }
        Ok(Self {
            raw_bytes: image.as_raw().len(),
            encoded_bytes: artifact.len(),
            pixels: image.width() as usize * image.height() as usize,
        })
    }

    /// Raw size over encoded size; above 1.0 means the image shrank.
    pub fn ratio(&self) -> f64 {
        if self.encoded_bytes == 0 {
            return 0.0;
        }
        self.raw_bytes as f64 / self.encoded_bytes as f64
    }

    pub fn bits_per_pixel(&self) -> f64 {
        if self.pixels == 0 {
            return 0.0;
        }
        self.encoded_bytes as f64 * 8.0 / self.pixels as f64
    }
}

impl fmt::Display for CompressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} bytes (ratio {:.3}, {:.3} bpp)",
            self.raw_bytes,
            self.encoded_bytes,
            self.ratio(),
            self.bits_per_pixel()
        )
    }
}

/// Measures every labelled configuration on one image, in the given order.
pub fn compare<'a>(
    image: &Image,
    configs: &[(&'a str, EncoderConfig)],
) -> Result<Vec<(&'a str, CompressionStats)>> {
    configs
        .iter()
        .map(|(label, config)| Ok((*label, CompressionStats::measure(image, config)?)))
        .collect()
}
