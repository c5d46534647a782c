//! # Scanline Codec
//!
//! Lossless image compression built on the PNG scanline model: rows are
//! passed through the five PNG filters and the residuals are coded with an
//! adaptive order-K Markov arithmetic coder, or with zlib as a baseline.
//!
//! This library is organized into several modules:
//! - `utils`: Error handling and packed bit I/O
//! - `image`: In-memory raster and channel planes
//! - `encode`: Scanline filters, the context model and arithmetic coder, and the zlib backend
//! - `doc`: Configuration, artifact layout and the per-channel encoding harness

// Re-export commonly used types at the crate root
pub use crate::utils::error::{CodecError, Result};

// Core modules
pub mod utils {
    pub mod bit_io;
    pub mod error;
}

pub mod image {
    pub mod raster;
}

pub mod encode {
    pub mod arith;
    pub mod filter;
    pub mod stream;
}

pub mod doc {
    pub mod artifact;
    pub mod channel_codec;
    pub mod config;
    pub mod image_encoder;
    pub mod stats;
}

// Public API exports
pub use crate::doc::channel_codec::{codec_for, ChannelCodec, FilteredArithmetic, FilteredDeflate};
pub use crate::doc::config::{EncoderConfig, EntropyBackend, FilterBlockMode, FilterMode};
pub use crate::doc::image_encoder::{decode_image, decode_with, encode_image, encode_with};
pub use crate::doc::stats::CompressionStats;
pub use crate::encode::arith::{ContextModel, ModelParams};
pub use crate::encode::filter::{FilterHeuristic, FilterType};
pub use crate::image::raster::{ChannelPlane, Image};

// Constants
pub const CODEC_VERSION: &str = "0.1.0";
pub const ARTIFACT_MAGIC: [u8; 4] = *b"SLMC";
pub const FORMAT_VERSION: u8 = 1;
