//! Error types for content decoding.
//!
//! [`DecodeError`] is the single failure surface of decoders, the length
//! guard, and the pipeline. Every variant is scoped to one stream: none of
//! them should ever take down the process.
//!
//! # Error Categories
//!
//! - [`DecodeError::UnsupportedEncoding`]: the peer named an encoding the registry does not know.
//! - [`DecodeError::ContentTooLarge`]: decoded output exceeded the configured bound.
//! - [`DecodeError::CodecCorruption`]: the compressed stream was malformed or truncated.
//! - [`DecodeError::IllegalState`]: the decoder was driven out of order. This is a wiring bug in
//!   the caller, never a property of the input.
//!
//! Registry setup failures are reported separately through [`RegistryError`].

use std::{fmt, io, num::NonZeroUsize};

use thiserror::Error;

/// Lifecycle phase of a decoder, carried in [`DecodeError::IllegalState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no input seen yet.
    Init,
    /// At least one `decode()` call accepted.
    Decoding,
    /// `finish()` completed.
    Finished,
    /// A previous call failed; the decoder is poisoned.
    Failed,
}

impl Phase {
    /// Whether the phase still accepts `decode()` and `finish()`.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Init | Self::Decoding) }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Decoding => "decoding",
            Self::Finished => "finished",
            Self::Failed => "failed",
        })
    }
}

/// Decoder operation named in [`DecodeError::IllegalState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// A `decode()` call.
    Decode,
    /// A `finish()` call.
    Finish,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "decode",
            Self::Finish => "finish",
        })
    }
}

/// Failure raised while decoding a message body.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use decodeframe::DecodeError;
///
/// let err = DecodeError::ContentTooLarge {
///     limit: NonZeroUsize::new(10).expect("non-zero"),
///     attempted: 11,
/// };
/// assert!(err.is_client_error());
/// assert_eq!(err.error_type(), "content_too_large");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// No decoder is registered for the requested content-encoding.
    #[error("unsupported content-encoding: {encoding:?}")]
    UnsupportedEncoding {
        /// Token as supplied by the peer.
        encoding: String,
    },

    /// Cumulative decoded output would exceed the configured bound.
    #[error("decoded content exceeds max length: {attempted} > {limit}")]
    ContentTooLarge {
        /// Configured bound.
        limit: NonZeroUsize,
        /// Cumulative length that tripped the bound.
        attempted: u64,
    },

    /// The compressed stream is malformed or truncated.
    #[error("corrupt {encoding} stream: {reason}")]
    CodecCorruption {
        /// Encoding whose decoder rejected the input.
        encoding: &'static str,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// The decoder was called in a phase that does not accept the call.
    #[error("illegal decoder state: {operation} called while {phase}")]
    IllegalState {
        /// Operation that was attempted.
        operation: Operation,
        /// Phase the decoder was in.
        phase: Phase,
    },
}

impl DecodeError {
    pub(crate) fn corruption(encoding: &'static str, reason: impl fmt::Display) -> Self {
        Self::CodecCorruption {
            encoding,
            reason: reason.to_string(),
        }
    }

    /// Returns true when the failure was caused by the peer's input.
    ///
    /// Client errors map to a client-error response upstream. The only
    /// non-client error is [`DecodeError::IllegalState`], which signals a
    /// defect in the caller.
    #[must_use]
    pub fn is_client_error(&self) -> bool { !matches!(self, Self::IllegalState { .. }) }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnsupportedEncoding { .. } => "unsupported_encoding",
            Self::ContentTooLarge { .. } => "content_too_large",
            Self::CodecCorruption { .. } => "codec_corruption",
            Self::IllegalState { .. } => "illegal_state",
        }
    }
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> Self {
        if err.is_client_error() {
            io::Error::new(io::ErrorKind::InvalidData, err)
        } else {
            io::Error::other(err)
        }
    }
}

/// Errors raised while assembling an encoding registry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The token is empty or contains characters outside visible ASCII.
    #[error("invalid content-encoding token: {token:?}")]
    InvalidToken {
        /// Token that was rejected.
        token: String,
    },

    /// A decoder is already registered for this token and the builder
    /// rejects duplicates.
    #[error("content-encoding {encoding:?} is already registered")]
    DuplicateEncoding {
        /// Normalised token that collided.
        encoding: String,
    },

    /// The process-wide registry was already installed.
    #[error("global encoding registry already installed")]
    AlreadyInstalled,
}

/// Result alias used throughout the crate.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
