// src/doc/config.rs

//! Encoder configuration shared by `encode_image` and `decode_image`.

use crate::encode::arith::model::{ModelParams, MAX_ORDER};
use crate::encode::filter::{FilterHeuristic, FilterStrategy, FilterType};
use crate::encode::stream::DEFAULT_LEVEL;
use crate::utils::error::{CodecError, Result};

/// Whether and how scanlines are filtered before entropy coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FilterMode {
    /// Bytes go to the entropy coder unfiltered.
    None = 0,
    /// Every row uses `EncoderConfig::fixed_filter`; no per-row tags.
    Fixed = 1,
    /// Each row picks its filter; tags are stored.
    #[default]
    Heuristic = 2,
}

/// Which coder compresses the filtered bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EntropyBackend {
    #[default]
    Arithmetic = 0,
    /// zlib, as the baseline a PNG file would use.
    Deflate = 1,
}

/// Where heuristic row tags are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FilterBlockMode {
    /// One tag byte in front of every row, as PNG does.
    #[default]
    Interleaved = 0,
    /// All tags in one block ahead of the residuals, coded on their own.
    Separated = 1,
}

macro_rules! wire_enum {
    ($ty:ident { $($code:literal => $variant:ident),+ $(,)? }) => {
        impl $ty {
            pub fn as_u8(self) -> u8 {
                self as u8
            }

            pub fn from_u8(value: u8) -> Result<Self> {
                match value {
                    $($code => Ok($ty::$variant),)+
                    other => Err(CodecError::Decode(format!(
                        "unknown {} code {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(FilterMode { 0 => None, 1 => Fixed, 2 => Heuristic });
wire_enum!(EntropyBackend { 0 => Arithmetic, 1 => Deflate });
wire_enum!(FilterBlockMode { 0 => Interleaved, 1 => Separated });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub filter_mode: FilterMode,
    /// Filter used by every row in `FilterMode::Fixed`.
    pub fixed_filter: FilterType,
    /// Row scorer used in `FilterMode::Heuristic`.
    pub heuristic: FilterHeuristic,
    /// Markov order of the data model.
    pub model_order: usize,
    pub backend: EntropyBackend,
    pub block_mode: FilterBlockMode,
    pub model_params: ModelParams,
    /// Markov order of the model coding a separated tag block.
    pub tag_model_order: usize,
    /// zlib level for `EntropyBackend::Deflate`.
    pub deflate_level: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Heuristic,
            fixed_filter: FilterType::Paeth,
            heuristic: FilterHeuristic::MinimumSumAbsolute,
            model_order: 3,
            backend: EntropyBackend::Arithmetic,
            block_mode: FilterBlockMode::Interleaved,
            model_params: ModelParams::default(),
            tag_model_order: 1,
            deflate_level: DEFAULT_LEVEL,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    /// Switches to `FilterMode::Fixed` with the given type.
    pub fn with_fixed_filter(mut self, filter: FilterType) -> Self {
        self.filter_mode = FilterMode::Fixed;
        self.fixed_filter = filter;
        self
    }

    pub fn with_heuristic(mut self, heuristic: FilterHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_model_order(mut self, order: usize) -> Self {
        self.model_order = order;
        self
    }

    pub fn with_backend(mut self, backend: EntropyBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_block_mode(mut self, mode: FilterBlockMode) -> Self {
        self.block_mode = mode;
        self
    }

    pub fn with_model_params(mut self, params: ModelParams) -> Self {
        self.model_params = params;
        self
    }

    pub fn with_deflate_level(mut self, level: u8) -> Self {
        self.deflate_level = level;
        self
    }

    /// The row-filter strategy implied by the filter mode.
    pub fn strategy(&self) -> FilterStrategy {
        match self.filter_mode {
            FilterMode::None => FilterStrategy::Fixed(FilterType::None),
            FilterMode::Fixed => FilterStrategy::Fixed(self.fixed_filter),
            FilterMode::Heuristic => FilterStrategy::Adaptive(self.heuristic),
        }
    }

    /// True when every row carries its own filter tag.
    pub fn tags_rows(&self) -> bool {
        self.filter_mode == FilterMode::Heuristic
    }

    /// True when tags travel as a block of their own.
    pub fn separates_tags(&self) -> bool {
        self.tags_rows() && self.block_mode == FilterBlockMode::Separated
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_order > MAX_ORDER {
            return Err(CodecError::InvalidArg(format!(
                "model order {} exceeds {}",
                self.model_order, MAX_ORDER
            )));
        }
        if self.tag_model_order > MAX_ORDER {
            return Err(CodecError::InvalidArg(format!(
                "tag model order {} exceeds {}",
                self.tag_model_order, MAX_ORDER
            )));
        }
        self.model_params.validate()?;
        if self.deflate_level > 10 {
            return Err(CodecError::InvalidArg(format!(
                "zlib level {} out of range 0..=10",
                self.deflate_level
            )));
        }
        Ok(())
    }
}
