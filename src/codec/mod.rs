//! Incremental content decoders, one state machine per algorithm.
//!
//! Every decoder implements [`CodecDecoder`]: `decode()` consumes a chunk of
//! compressed input and returns whatever decoded bytes became available
//! (possibly none), `finish()` flushes the tail and verifies trailers. The
//! lifecycle is `Init → Decoding → Finished`, with a terminal `Failed` phase
//! entered on malformed input. Calls outside `Init`/`Decoding` fail with
//! [`DecodeError::IllegalState`].
//!
//! Compressed algorithms implement the smaller [`Engine`] trait and are
//! wrapped in [`Codec`], which owns the lifecycle, the output buffer, and
//! resource release. [`IdentityDecoder`] passes chunks through untouched.

use crate::{
    chunk::{Chunk, DEFAULT_OUTPUT_CAPACITY, OutputBuffer},
    error::{DecodeError, Operation, Phase, Result},
};

pub mod brotli;
pub mod deflate;
pub mod gzip;
pub mod identity;
mod inflate;

pub use self::brotli::{BrotliDecoder, BrotliEngine, BrotliFactory};
pub use deflate::{DeflateDecoder, DeflateEngine, DeflateFactory};
pub use gzip::{GzipDecoder, GzipEngine, GzipFactory};
pub use identity::{IdentityDecoder, IdentityFactory};

/// Incremental decoder for one content-encoding.
///
/// Implementations hold per-stream state and are driven by exactly one
/// caller at a time. They must be [`Send`] so a pipeline can resume them on
/// another thread between calls.
pub trait CodecDecoder: Send {
    /// Canonical name of the algorithm, used in errors and logs.
    fn encoding(&self) -> &'static str;

    /// Current lifecycle phase.
    fn phase(&self) -> Phase;

    /// Consume `input` and return newly decoded bytes.
    ///
    /// The returned chunk may be empty when the algorithm needs more input.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::CodecCorruption`] for malformed input and
    /// [`DecodeError::IllegalState`] when called after `finish()` or after
    /// a failure.
    fn decode(&mut self, input: Chunk) -> Result<Chunk>;

    /// Flush remaining output and end the stream.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::CodecCorruption`] when the stream is truncated
    /// or its trailer does not verify, and [`DecodeError::IllegalState`] on
    /// a second call.
    fn finish(&mut self) -> Result<Chunk>;

    /// Hint that the caller will reject output beyond `remaining` bytes.
    ///
    /// Decoders may stop consuming input once they have buffered more than
    /// `remaining` bytes in a single call. The output of such a call is
    /// incomplete, so the caller must treat the stream as failed.
    fn limit_output(&mut self, _remaining: Option<u64>) {}

    /// Release algorithm state and buffers. Idempotent.
    fn release(&mut self);
}

impl<C: CodecDecoder + ?Sized> CodecDecoder for Box<C> {
    fn encoding(&self) -> &'static str { (**self).encoding() }

    fn phase(&self) -> Phase { (**self).phase() }

    fn decode(&mut self, input: Chunk) -> Result<Chunk> { (**self).decode(input) }

    fn finish(&mut self) -> Result<Chunk> { (**self).finish() }

    fn limit_output(&mut self, remaining: Option<u64>) { (**self).limit_output(remaining); }

    fn release(&mut self) { (**self).release(); }
}

/// Constructor for fresh decoder instances of one algorithm.
///
/// Factories are stored in the [`EncodingRegistry`](crate::registry::EncodingRegistry)
/// and shared across streams; each call to [`new_decoder`](Self::new_decoder)
/// must return an independent instance.
pub trait DecoderFactory: Send + Sync + 'static {
    /// Canonical name of the algorithm.
    fn encoding(&self) -> &'static str;

    /// Build a decoder reserving `output_capacity` bytes per output chunk.
    fn new_decoder(&self, output_capacity: usize) -> Box<dyn CodecDecoder>;
}

/// Incremental decompression algorithm driven by [`Codec`].
///
/// Engines append decoded bytes to the supplied [`OutputBuffer`] and stop
/// early when [`OutputBuffer::is_saturated`] reports that the caller's
/// output limit has been passed.
pub trait Engine: Send {
    /// Canonical name of the algorithm.
    const ENCODING: &'static str;

    /// Consume `input`, appending decoded bytes to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::CodecCorruption`] for malformed input.
    fn decode(&mut self, input: &[u8], out: &mut OutputBuffer) -> Result<()>;

    /// Verify the stream ended cleanly, appending any buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::CodecCorruption`] when the stream is truncated
    /// or fails verification.
    fn finish(&mut self, out: &mut OutputBuffer) -> Result<()>;
}

/// Lifecycle wrapper turning an [`Engine`] into a [`CodecDecoder`].
///
/// The engine is dropped, releasing its inflate window or brotli state, as
/// soon as the codec finishes, fails, or is released explicitly.
#[derive(Debug)]
pub struct Codec<E> {
    engine: Option<E>,
    out: OutputBuffer,
    phase: Phase,
    saw_input: bool,
}

impl<E: Engine> Codec<E> {
    /// Wrap `engine` using the default output capacity.
    #[must_use]
    pub fn new(engine: E) -> Self { Self::with_output_capacity(engine, DEFAULT_OUTPUT_CAPACITY) }

    /// Wrap `engine`, reserving `capacity` bytes per output chunk.
    #[must_use]
    pub fn with_output_capacity(engine: E, capacity: usize) -> Self {
        Self {
            engine: Some(engine),
            out: OutputBuffer::with_capacity(capacity),
            phase: Phase::Init,
            saw_input: false,
        }
    }

    /// Whether the engine's resources have been released.
    #[must_use]
    pub fn is_released(&self) -> bool { self.engine.is_none() }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        tracing::warn!(encoding = E::ENCODING, error = %err, "content decoding failed");
        self.release();
        self.phase = Phase::Failed;
        err
    }
}

pub(crate) fn illegal_state(encoding: &'static str, operation: Operation, phase: Phase) -> DecodeError {
    tracing::error!(encoding, %operation, %phase, "decoder driven out of order");
    DecodeError::IllegalState { operation, phase }
}

impl<E: Engine> CodecDecoder for Codec<E> {
    fn encoding(&self) -> &'static str { E::ENCODING }

    fn phase(&self) -> Phase { self.phase }

    fn decode(&mut self, input: Chunk) -> Result<Chunk> {
        let Some(engine) = self.engine.as_mut().filter(|_| self.phase.is_open()) else {
            return Err(illegal_state(E::ENCODING, Operation::Decode, self.phase));
        };
        self.phase = Phase::Decoding;
        if input.is_empty() {
            return Ok(Chunk::empty());
        }
        self.saw_input = true;
        match engine.decode(&input, &mut self.out) {
            Ok(()) => Ok(self.out.take()),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn finish(&mut self) -> Result<Chunk> {
        if !self.phase.is_open() {
            return Err(illegal_state(E::ENCODING, Operation::Finish, self.phase));
        }
        let Some(mut engine) = self.engine.take() else {
            return Err(illegal_state(E::ENCODING, Operation::Finish, self.phase));
        };
        // An empty body sent with a content-encoding header decodes to nothing.
        let result = if self.saw_input {
            engine.finish(&mut self.out)
        } else {
            Ok(())
        };
        drop(engine);
        match result {
            Ok(()) => {
                self.phase = Phase::Finished;
                Ok(self.out.take_last())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn limit_output(&mut self, remaining: Option<u64>) { self.out.set_limit(remaining); }

    fn release(&mut self) {
        self.engine = None;
        self.out.clear();
        if self.phase.is_open() {
            self.phase = Phase::Failed;
        }
    }
}
