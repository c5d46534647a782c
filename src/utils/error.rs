use std::error::Error;
use std::fmt;
use std::io;

use crate::encode::arith::ArithmeticError;
use crate::encode::filter::FilterError;
use crate::encode::stream::StreamError;
use crate::utils::bit_io::BitstreamError;

/// Main error type for the scanline codec.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred
    Io(io::Error),
    /// An invalid argument or configuration was provided
    InvalidArg(String),
    /// The artifact is malformed, truncated, or disagrees with the decode config
    Decode(String),
    /// The entropy decoder lost sync with the encoder
    StreamCorruption(String),
    /// A filter type byte outside `0..=4`
    InvalidFilter(u8),
    /// The external stream compressor failed
    Backend(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(err) => write!(f, "I/O error: {}", err),
            CodecError::InvalidArg(msg) => write!(f, "Invalid argument: {}", msg),
            CodecError::Decode(msg) => write!(f, "Decode error: {}", msg),
            CodecError::StreamCorruption(msg) => write!(f, "Stream corruption: {}", msg),
            CodecError::InvalidFilter(t) => write!(f, "Invalid filter type: {}", t),
            CodecError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        // A short read while parsing an artifact is a framing problem, not an OS failure.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Decode(format!("artifact truncated: {}", err))
        } else {
            CodecError::Io(err)
        }
    }
}

impl From<FilterError> for CodecError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidFilter(t) => CodecError::InvalidFilter(t),
            other => CodecError::InvalidArg(other.to_string()),
        }
    }
}

impl From<ArithmeticError> for CodecError {
    fn from(err: ArithmeticError) -> Self {
        match err {
            ArithmeticError::Bitstream(inner) => inner.into(),
            ArithmeticError::FrequencyOverflow { .. }
            | ArithmeticError::InvalidOrder(_)
            | ArithmeticError::InvalidParams(_) => CodecError::InvalidArg(err.to_string()),
            other => CodecError::StreamCorruption(other.to_string()),
        }
    }
}

impl From<StreamError> for CodecError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::InvalidLevel(_) => CodecError::InvalidArg(err.to_string()),
            StreamError::LengthMismatch { .. } => CodecError::StreamCorruption(err.to_string()),
            StreamError::Inflate(_) => CodecError::Backend(err.to_string()),
        }
    }
}

impl From<BitstreamError> for CodecError {
    fn from(err: BitstreamError) -> Self {
        CodecError::Decode(err.to_string())
    }
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
