//! Optional convenience imports for common decoding workflows.
//!
//! This module is intentionally small and focused on high-frequency types.
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```
//! use decodeframe::prelude::*;
//!
//! fn start(registry: &EncodingRegistry, header: Option<&str>) -> StreamDecoding {
//!     StreamDecoding::new(registry, header, DecodingConfig::default().max_length(MaxLength::new(1 << 20)))
//! }
//! ```

pub use crate::{
    chunk::Chunk,
    config::{DecodingConfig, MaxLength},
    error::{DecodeError, Result},
    guard::StreamDecoder,
    pipeline::{DecodedBody, DecodedBodyReader, StreamDecoding, body_channel},
    registry::EncodingRegistry,
};
