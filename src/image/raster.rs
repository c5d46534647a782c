// src/image/raster.rs

//! In-memory 8-bit raster and its single-channel planes.

use crate::utils::error::{CodecError, Result};

/// Largest supported channel count (RGBA).
pub const MAX_CHANNELS: u8 = 4;

/// An interleaved 8-bit image with 1 to 4 channels per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Image {
    /// Wraps interleaved pixel data (`width * height * channels` bytes, row-major).
    pub fn from_interleaved(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(CodecError::InvalidArg(format!(
                "channel count {} not in 1..={}",
                channels, MAX_CHANNELS
            )));
        }
        let expected = pixel_count(width, height)? * channels as usize;
        if data.len() != expected {
            return Err(CodecError::InvalidArg(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                width,
                height,
                channels,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Interleaves equally sized planes back into an image, in plane order.
    pub fn from_planes(planes: &[ChannelPlane]) -> Result<Self> {
        let first = planes
            .first()
            .ok_or_else(|| CodecError::InvalidArg("no channel planes".to_string()))?;
        let (width, height) = (first.width, first.height);
        if planes.iter().any(|p| p.width != width || p.height != height) {
            return Err(CodecError::InvalidArg(
                "channel planes differ in size".to_string(),
            ));
        }
        let channels = u8::try_from(planes.len())
            .map_err(|_| CodecError::InvalidArg(format!("{} planes", planes.len())))?;

        let pixels = first.data.len();
        let mut data = Vec::with_capacity(pixels * planes.len());
        for i in 0..pixels {
            data.extend(planes.iter().map(|p| p.data[i]));
        }
        Self::from_interleaved(width, height, channels, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Extracts one channel as its own plane.
    pub fn channel_plane(&self, channel: u8) -> Result<ChannelPlane> {
        if channel >= self.channels {
            return Err(CodecError::InvalidArg(format!(
                "channel {} out of range for {}-channel image",
                channel, self.channels
            )));
        }
        let data = self
            .data
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect();
        Ok(ChannelPlane {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// All planes in channel order.
    pub fn planes(&self) -> Vec<ChannelPlane> {
        (0..self.channels)
            .filter_map(|c| self.channel_plane(c).ok())
            .collect()
    }
}

/// A single channel of an [`Image`], row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlane {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ChannelPlane {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if data.len() != expected {
            return Err(CodecError::InvalidArg(format!(
                "plane {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let w = self.width as usize;
        &self.data[y * w..(y + 1) * w]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // `chunks_exact(0)` panics, and a zero-width plane has no bytes anyway.
        let w = (self.width as usize).max(1);
        self.data.chunks_exact(w)
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CodecError::InvalidArg(format!("{}x{} overflows", width, height)))
}
