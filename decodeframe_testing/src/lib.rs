//! Test helpers for `decodeframe`.
//!
//! Produces compressed fixtures for every supported encoding and drives
//! decoders over arbitrary chunkings, returning the concatenated output
//! for easy assertions.
//!
//! ```rust
//! use decodeframe::{config::MaxLength, registry::EncodingRegistry};
//! use decodeframe_testing::{compress, drive_decoder, split_even};
//!
//! let body = compress("gzip", b"hello");
//! let mut decoder = EncodingRegistry::with_defaults()
//!     .lookup("gzip")
//!     .expect("registered")
//!     .build(MaxLength::UNLIMITED);
//! let decoded = drive_decoder(decoder.as_mut(), split_even(&body, 3)).expect("valid body");
//! assert_eq!(decoded, b"hello");
//! ```

pub mod drive;
pub mod logging;
pub mod metrics;
pub mod payloads;

pub use drive::{drive_body, drive_decoder, split_at_points, split_even};
pub use logging::{LoggerHandle, logger};
pub use metrics::{counter_value, gauge_value, recorded};
pub use payloads::{ENCODINGS, bomb, compress, sample_text};
