//! Per-stream integration point between the framing layer and decoders.
//!
//! [`StreamDecoding`] is the synchronous driver the framing layer calls as
//! body bytes arrive: it resolves the stream's content-encoding once, owns
//! the single guarded decoder built for the stream, and guarantees the
//! decoder is released on every exit path. [`DecodedBody`] adapts the same
//! driver to an asynchronous stream of decoded chunks.

use bytes::Bytes;

use crate::{
    chunk::Chunk,
    codec::illegal_state,
    config::DecodingConfig,
    error::{Operation, Phase, Result},
    guard::StreamDecoder,
    metrics,
    registry::{DecoderConstructor, EncodingRegistry},
};

mod body;

pub use body::{BodyStream, DEFAULT_BODY_CHANNEL_CAPACITY, DecodedBody, DecodedBodyReader, body_channel};

enum State {
    /// Encoding not yet resolved; nothing has arrived.
    Pending,
    Active(Box<dyn StreamDecoder>),
    Finished,
    Failed,
    Cancelled,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            Self::Pending => Phase::Init,
            Self::Active(_) => Phase::Decoding,
            Self::Finished => Phase::Finished,
            Self::Failed | Self::Cancelled => Phase::Failed,
        }
    }
}

/// Synchronous decoding driver for one inbound stream.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use decodeframe::{config::DecodingConfig, pipeline::StreamDecoding, registry::EncodingRegistry};
///
/// let registry = EncodingRegistry::with_defaults();
/// let mut decoding = StreamDecoding::new(&registry, None, DecodingConfig::default());
/// let out = decoding.on_data(Bytes::from_static(b"plain")).expect("identity");
/// assert_eq!(out.as_deref(), Some(&b"plain"[..]));
/// assert!(decoding.on_end().expect("clean end").is_none_or(|tail| tail.is_empty()));
/// ```
pub struct StreamDecoding {
    registry: EncodingRegistry,
    content_encoding: Option<String>,
    config: DecodingConfig,
    state: State,
    decoded: u64,
}

impl StreamDecoding {
    /// Prepare decoding for a stream whose header carried
    /// `content_encoding`; `None` selects `identity`.
    ///
    /// The encoding is resolved lazily when the first bytes or the end of
    /// the stream arrive.
    #[must_use]
    pub fn new(registry: &EncodingRegistry, content_encoding: Option<&str>, config: DecodingConfig) -> Self {
        Self {
            registry: registry.clone(),
            content_encoding: content_encoding.map(str::to_owned),
            config,
            state: State::Pending,
            decoded: 0,
        }
    }

    /// Lifecycle phase of the stream.
    ///
    /// Cancelled streams report [`Phase::Failed`].
    #[must_use]
    pub fn phase(&self) -> Phase { self.state.phase() }

    /// Whether the stream reached a terminal state.
    #[must_use]
    pub fn is_terminated(&self) -> bool { !self.phase().is_open() }

    /// Decoded bytes handed out so far.
    #[must_use]
    pub fn decoded_len(&self) -> u64 { self.decoded }

    fn constructor(&self) -> Result<DecoderConstructor> {
        match self.content_encoding.as_deref() {
            None => Ok(DecoderConstructor::identity()),
            Some(token) => self.registry.lookup(token),
        }
    }

    /// Resolve the encoding and build the stream's decoder on first use.
    fn decoder(&mut self) -> Result<&mut Box<dyn StreamDecoder>> {
        if matches!(self.state, State::Pending) {
            match self.constructor() {
                Ok(constructor) => self.state = State::Active(constructor.build_with(&self.config)),
                Err(err) => {
                    metrics::inc_errors(err.error_type());
                    tracing::warn!(error = %err, "rejecting stream body");
                    self.state = State::Failed;
                    return Err(err);
                }
            }
        }
        match &mut self.state {
            State::Active(decoder) => Ok(decoder),
            state => Err(illegal_state("stream", Operation::Decode, state.phase())),
        }
    }

    /// Drop the decoder and enter `next`.
    fn close(&mut self, next: State) { self.state = next; }

    fn deliver(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.decoded = self
            .decoded
            .saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        Some(chunk)
    }

    /// Decode one unit of body bytes in arrival order.
    ///
    /// Returns `Ok(None)` when the stream already failed or was cancelled:
    /// the bytes are dropped without reaching a decoder. The returned chunk
    /// may be empty when the algorithm needs more input.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error, or
    /// [`DecodeError::UnsupportedEncoding`](crate::DecodeError::UnsupportedEncoding)
    /// when the stream's encoding is unknown. The stream is failed and its
    /// decoder released before the error is returned. Calling this after
    /// [`on_end`](Self::on_end) fails with
    /// [`DecodeError::IllegalState`](crate::DecodeError::IllegalState).
    pub fn on_data(&mut self, bytes: Bytes) -> Result<Option<Chunk>> {
        match self.state {
            State::Failed | State::Cancelled => {
                tracing::debug!(dropped = bytes.len(), "dropping body bytes after stream failure");
                return Ok(None);
            }
            State::Finished => {
                return Err(illegal_state("stream", Operation::Decode, Phase::Finished));
            }
            State::Pending | State::Active(_) => {}
        }
        let decoder = self.decoder()?;
        match decoder.decode(Chunk::from(bytes)) {
            Ok(chunk) => Ok(self.deliver(chunk)),
            Err(err) => {
                self.close(State::Failed);
                Err(err)
            }
        }
    }

    /// Signal end of stream, flushing and verifying the decoder.
    ///
    /// Returns `Ok(None)` when the stream already failed or was cancelled.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error for truncated or oversized bodies and
    /// [`DecodeError::IllegalState`](crate::DecodeError::IllegalState) on a
    /// second call.
    pub fn on_end(&mut self) -> Result<Option<Chunk>> {
        match self.state {
            State::Failed | State::Cancelled => return Ok(None),
            State::Finished => {
                return Err(illegal_state("stream", Operation::Finish, Phase::Finished));
            }
            State::Pending | State::Active(_) => {}
        }
        let decoder = self.decoder()?;
        let result = decoder.finish();
        let next = if result.is_ok() {
            State::Finished
        } else {
            State::Failed
        };
        self.close(next);
        result.map(|tail| self.deliver(tail))
    }

    /// Release the decoder because the stream was abandoned.
    ///
    /// Has no effect once the stream has finished or failed.
    pub fn cancel(&mut self) {
        if let State::Active(decoder) = &mut self.state {
            decoder.release();
            tracing::debug!(decoded = self.decoded, "stream decoding cancelled");
            self.close(State::Cancelled);
        } else if matches!(self.state, State::Pending) {
            self.state = State::Cancelled;
        }
    }
}

impl std::fmt::Debug for StreamDecoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoding")
            .field("content_encoding", &self.content_encoding)
            .field("phase", &self.phase())
            .field("decoded", &self.decoded_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
