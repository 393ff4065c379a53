#![doc(html_root_url = "https://docs.rs/decodeframe/latest")]
//! Public API for the `decodeframe` library.
//!
//! This crate decodes content-encoded message bodies (`gzip`, `deflate`,
//! `br` and `identity`) chunk by chunk as they arrive, enforcing a hard
//! cap on decoded size so a small compressed body cannot expand without
//! bound.
//!
//! The usual entry point is [`pipeline::StreamDecoding`], created per
//! stream from an [`EncodingRegistry`] and a [`DecodingConfig`].

pub mod chunk;
pub mod codec;
pub mod config;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod pipeline;
pub mod prelude;
pub mod registry;

pub use chunk::Chunk;
pub use config::{DecodingConfig, MaxLength};
pub use error::{DecodeError, Operation, Phase, RegistryError, Result};
pub use guard::{LengthGuard, StreamDecoder};
pub use metrics::{DECODE_ERRORS, DECODED_BYTES, DECODERS_ACTIVE};
pub use pipeline::{DecodedBody, StreamDecoding};
pub use registry::{ContentEncoding, DecoderConstructor, EncodingRegistry};
