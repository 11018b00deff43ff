//! Errors raised while decoding thermal exports.
use thiserror::Error;

use crate::image::Strategy;

/// Failure of a single decode attempt.
///
/// A format mismatch is never reported through this type: the strategies
/// return `Ok(None)` for that case.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("signature not found: {0}")]
    SignatureNotFound(&'static str),

    #[error("unsupported pixel encoding: {0}")]
    UnsupportedEncoding(u8),

    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode raster image: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("decode recovered neither temperature data nor a photograph")]
    NothingRecovered,

    /// Every strategy failed or declined. The causes are kept for callers
    /// and logs but are not part of the message.
    #[error("no image data could be recovered")]
    NoImageData { attempts: Vec<FailedAttempt> },
}

impl DecodeError {
    /// Whether this is one of the errors that only make sense after the
    /// container signature matched.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DecodeError::OutOfBounds { .. }
                | DecodeError::MalformedContainer(_)
                | DecodeError::UnsupportedEncoding(_)
        )
    }
}

/// Why a strategy produced nothing.
#[derive(Debug)]
pub struct FailedAttempt {
    pub strategy: Strategy,
    /// `None` when the strategy reported a simple format mismatch.
    pub error: Option<DecodeError>,
}

/// Errors from building a custom palette.
#[derive(Error, Debug, PartialEq)]
pub enum PaletteError {
    #[error("palette `{name}` needs at least 2 color stops, found {found}")]
    TooFewStops { name: String, found: usize },

    #[error("unknown palette `{0}`")]
    Unknown(String),
}
