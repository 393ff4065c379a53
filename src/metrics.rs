//! Metric helpers for `decodeframe`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics`
//! feature disabled the helpers compile to no-ops.

/// Name of the gauge tracking decoders holding algorithm state.
pub const DECODERS_ACTIVE: &str = "decodeframe_decoders_active";
/// Name of the counter tracking decoded bytes delivered downstream.
pub const DECODED_BYTES: &str = "decodeframe_decoded_bytes_total";
/// Name of the counter tracking decoding failures, labelled by `kind`.
pub const DECODE_ERRORS: &str = "decodeframe_decode_errors_total";

#[cfg(feature = "metrics")]
mod imp {
    use metrics::{counter, gauge};

    use super::{DECODE_ERRORS, DECODED_BYTES, DECODERS_ACTIVE};

    pub fn inc_decoders() { gauge!(DECODERS_ACTIVE).increment(1.0); }

    pub fn dec_decoders() { gauge!(DECODERS_ACTIVE).decrement(1.0); }

    pub fn add_decoded_bytes(encoding: &'static str, bytes: u64) {
        counter!(DECODED_BYTES, "encoding" => encoding).increment(bytes);
    }

    pub fn inc_errors(kind: &'static str) { counter!(DECODE_ERRORS, "kind" => kind).increment(1); }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    pub fn inc_decoders() {}

    pub fn dec_decoders() {}

    pub fn add_decoded_bytes(_encoding: &'static str, _bytes: u64) {}

    pub fn inc_errors(_kind: &'static str) {}
}

/// Increment the active decoders gauge.
pub fn inc_decoders() { imp::inc_decoders(); }

/// Decrement the active decoders gauge.
pub fn dec_decoders() { imp::dec_decoders(); }

/// Record decoded bytes handed downstream for `encoding`.
pub fn add_decoded_bytes(encoding: &'static str, bytes: u64) {
    if bytes > 0 {
        imp::add_decoded_bytes(encoding, bytes);
    }
}

/// Record a decoding failure of the given kind.
///
/// `kind` is one of the labels returned by
/// [`DecodeError::error_type`](crate::DecodeError::error_type).
pub fn inc_errors(kind: &'static str) { imp::inc_errors(kind); }
