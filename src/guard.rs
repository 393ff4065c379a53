//! Length guard enforcing a cap on cumulative decoded bytes.
//!
//! [`LengthGuard`] wraps a [`CodecDecoder`] and inspects every chunk it
//! produces before the caller sees it. When the running total would exceed
//! the configured [`MaxLength`], the candidate chunk is dropped, the inner
//! decoder is released, and the guard is poisoned: the call fails with
//! [`DecodeError::ContentTooLarge`] and every later call fails with
//! [`DecodeError::IllegalState`] without reaching the inner decoder.
//!
//! The guard also owns resource release for the stream. The inner decoder
//! is released exactly once: after a successful `finish()`, on the first
//! failure, or when the guard is dropped, whichever happens first.

use crate::{
    chunk::Chunk,
    codec::{CodecDecoder, illegal_state},
    config::MaxLength,
    error::{DecodeError, Operation, Phase, Result},
    metrics,
};

/// Capability contract the pipeline drives for one stream.
///
/// Implemented by [`LengthGuard`]; the registry hands out boxed instances.
pub trait StreamDecoder: Send {
    /// Canonical name of the underlying algorithm.
    fn encoding(&self) -> &'static str;

    /// Decode one chunk of compressed input.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ContentTooLarge`] when the bound is exceeded,
    /// [`DecodeError::CodecCorruption`] for malformed input, and
    /// [`DecodeError::IllegalState`] after `finish()` or a failure.
    fn decode(&mut self, input: Chunk) -> Result<Chunk>;

    /// Flush and verify the end of the stream.
    ///
    /// # Errors
    ///
    /// As for [`decode`](Self::decode).
    fn finish(&mut self) -> Result<Chunk>;

    /// Configured bound on cumulative decoded bytes; `0` means unlimited.
    fn max_length(&self) -> usize;

    /// Cumulative decoded bytes returned so far.
    fn decoded_len(&self) -> u64;

    /// Release decoder resources without finishing, for cancellation.
    ///
    /// Later calls fail with [`DecodeError::IllegalState`].
    fn release(&mut self);
}

/// Bound-enforcing wrapper around a [`CodecDecoder`].
///
/// # Examples
///
/// ```
/// use decodeframe::{
///     DecodeError,
///     chunk::Chunk,
///     codec::IdentityDecoder,
///     config::MaxLength,
///     guard::{LengthGuard, StreamDecoder},
/// };
///
/// let mut guard = LengthGuard::new(IdentityDecoder::new(), MaxLength::new(10));
/// assert_eq!(guard.decode(Chunk::from_static(b"123456789")).expect("within bound").len(), 9);
/// let err = guard.decode(Chunk::from_static(b"ab")).expect_err("over bound");
/// assert!(matches!(err, DecodeError::ContentTooLarge { attempted: 11, .. }));
/// ```
#[derive(Debug)]
pub struct LengthGuard<C: CodecDecoder> {
    inner: C,
    max_length: MaxLength,
    decoded: u64,
    phase: Phase,
    released: bool,
}

impl<C: CodecDecoder> LengthGuard<C> {
    /// Wrap `inner`, enforcing `max_length` across all calls.
    #[must_use]
    pub fn new(inner: C, max_length: MaxLength) -> Self {
        metrics::inc_decoders();
        Self {
            inner,
            max_length,
            decoded: 0,
            phase: Phase::Init,
            released: false,
        }
    }

    /// Current lifecycle phase of the guard.
    #[must_use]
    pub fn phase(&self) -> Phase { self.phase }

    /// Whether the inner decoder has been released.
    #[must_use]
    pub fn is_released(&self) -> bool { self.released }

    /// Bytes that may still be returned before the bound trips.
    fn remaining(&self) -> Option<u64> {
        self.max_length
            .limit()
            .map(|limit| as_u64(limit.get()).saturating_sub(self.decoded))
    }

    fn enter(&mut self, operation: Operation) -> Result<()> {
        if self.phase.is_open() {
            Ok(())
        } else {
            Err(illegal_state(self.inner.encoding(), operation, self.phase))
        }
    }

    /// Admit or reject a candidate produced by the inner decoder.
    fn admit(&mut self, candidate: Result<Chunk>) -> Result<Chunk> {
        let chunk = match candidate {
            Ok(chunk) => chunk,
            Err(err) => return Err(self.poison(err)),
        };
        let attempted = self.decoded.saturating_add(as_u64(chunk.len()));
        if let Some(limit) = self.max_length.limit()
            && attempted > as_u64(limit.get())
        {
            drop(chunk);
            tracing::warn!(
                encoding = self.inner.encoding(),
                limit = limit.get(),
                attempted,
                "decoded content exceeds max length"
            );
            return Err(self.poison(DecodeError::ContentTooLarge { limit, attempted }));
        }
        self.decoded = attempted;
        metrics::add_decoded_bytes(self.inner.encoding(), as_u64(chunk.len()));
        Ok(chunk)
    }

    fn poison(&mut self, err: DecodeError) -> DecodeError {
        metrics::inc_errors(err.error_type());
        self.phase = Phase::Failed;
        self.release_inner();
        err
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.inner.release();
        self.released = true;
        metrics::dec_decoders();
    }
}

impl<C: CodecDecoder> StreamDecoder for LengthGuard<C> {
    fn encoding(&self) -> &'static str { self.inner.encoding() }

    fn decode(&mut self, input: Chunk) -> Result<Chunk> {
        self.enter(Operation::Decode)?;
        self.phase = Phase::Decoding;
        let remaining = self.remaining();
        self.inner.limit_output(remaining);
        let candidate = self.inner.decode(input);
        self.admit(candidate)
    }

    fn finish(&mut self) -> Result<Chunk> {
        self.enter(Operation::Finish)?;
        let remaining = self.remaining();
        self.inner.limit_output(remaining);
        let candidate = self.inner.finish();
        let tail = self.admit(candidate)?;
        self.phase = Phase::Finished;
        self.release_inner();
        Ok(tail)
    }

    fn max_length(&self) -> usize { self.max_length.get() }

    fn decoded_len(&self) -> u64 { self.decoded }

    fn release(&mut self) {
        if self.phase.is_open() {
            self.phase = Phase::Failed;
        }
        self.release_inner();
    }
}

impl<C: CodecDecoder> Drop for LengthGuard<C> {
    fn drop(&mut self) { self.release_inner(); }
}

fn as_u64(len: usize) -> u64 { u64::try_from(len).unwrap_or(u64::MAX) }

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
