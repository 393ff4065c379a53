//! Decoder configuration supplied by routing collaborators.
//!
//! The decoding subsystem loads no configuration itself. Callers build a
//! [`DecodingConfig`] per route or per client and hand it to the pipeline
//! when a stream starts.

use std::{fmt, num::NonZeroUsize};

use crate::chunk::DEFAULT_OUTPUT_CAPACITY;

const MIN_OUTPUT_CAPACITY: usize = 256;
const MAX_OUTPUT_CAPACITY: usize = 1024 * 1024;

/// Upper bound on cumulative decoded bytes for one stream.
///
/// `0` means unlimited, matching the wire-level convention used by
/// routing configuration.
///
/// # Examples
///
/// ```
/// use decodeframe::config::MaxLength;
///
/// assert!(MaxLength::new(0).is_unlimited());
/// assert_eq!(MaxLength::new(10).get(), 10);
/// assert_eq!(MaxLength::UNLIMITED.limit(), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaxLength(Option<NonZeroUsize>);

impl MaxLength {
    /// No bound on decoded output.
    pub const UNLIMITED: Self = Self(None);

    /// Create a bound; `0` disables the check.
    #[must_use]
    pub const fn new(bytes: usize) -> Self { Self(NonZeroUsize::new(bytes)) }

    /// Raw bound value; `0` when unlimited.
    #[must_use]
    pub const fn get(self) -> usize {
        match self.0 {
            Some(limit) => limit.get(),
            None => 0,
        }
    }

    /// Bound as an optional non-zero value.
    #[must_use]
    pub const fn limit(self) -> Option<NonZeroUsize> { self.0 }

    /// Whether the bound is disabled.
    #[must_use]
    pub const fn is_unlimited(self) -> bool { self.0.is_none() }
}

impl From<usize> for MaxLength {
    fn from(bytes: usize) -> Self { Self::new(bytes) }
}

impl From<NonZeroUsize> for MaxLength {
    fn from(limit: NonZeroUsize) -> Self { Self(Some(limit)) }
}

impl fmt::Display for MaxLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(limit) => write!(f, "{limit} bytes"),
            None => f.write_str("unlimited"),
        }
    }
}

/// Per-stream decoding configuration.
///
/// # Examples
///
/// ```
/// use decodeframe::config::{DecodingConfig, MaxLength};
///
/// let config = DecodingConfig::default()
///     .max_length(MaxLength::new(4096))
///     .output_capacity(1024);
/// assert_eq!(config.max_length_value().get(), 4096);
/// assert_eq!(config.output_capacity_value(), 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodingConfig {
    max_length: MaxLength,
    output_capacity: usize,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_length: MaxLength::UNLIMITED,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}

impl DecodingConfig {
    /// Set the bound on cumulative decoded bytes.
    #[must_use]
    pub fn max_length(mut self, max_length: impl Into<MaxLength>) -> Self {
        self.max_length = max_length.into();
        self
    }

    /// Set the capacity decoders reserve for each output chunk.
    ///
    /// The value is clamped between 256 bytes and 1 MiB.
    #[must_use]
    pub fn output_capacity(mut self, output_capacity: usize) -> Self {
        self.output_capacity = output_capacity.clamp(MIN_OUTPUT_CAPACITY, MAX_OUTPUT_CAPACITY);
        self
    }

    /// Return the configured bound.
    #[must_use]
    pub const fn max_length_value(&self) -> MaxLength { self.max_length }

    /// Return the configured output capacity.
    #[must_use]
    pub const fn output_capacity_value(&self) -> usize { self.output_capacity }
}
