//! Asynchronous body adapters around [`StreamDecoding`].
//!
//! The framing layer hands over the raw body as a [`BodyStream`], usually
//! fed through a bounded [`body_channel`] so a slow consumer applies
//! back-pressure. [`DecodedBody`] yields decoded chunks from it and
//! [`DecodedBodyReader`] exposes the same bytes as [`AsyncRead`].

use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use bytes::Bytes;
use futures::Stream;
use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::io::StreamReader;

use super::StreamDecoding;

/// Raw inbound body chunks as delivered by the framing layer.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Default capacity for body channels.
///
/// Once this many raw chunks are buffered, the framing layer waits for the
/// consumer before reading more from the connection.
pub const DEFAULT_BODY_CHANNEL_CAPACITY: usize = 16;

/// Create a bounded channel feeding a [`BodyStream`].
///
/// # Panics
///
/// Panics if `capacity` is zero, mirroring [`tokio::sync::mpsc::channel`].
///
/// # Examples
///
/// ```
/// use decodeframe::pipeline::body_channel;
///
/// let (tx, body) = body_channel(8);
/// drop((tx, body));
/// ```
#[must_use]
pub fn body_channel(capacity: usize) -> (mpsc::Sender<io::Result<Bytes>>, BodyStream) {
    let (tx, rx) = mpsc::channel(capacity);
    let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
    (tx, Box::pin(stream))
}

/// Stream of decoded body chunks.
///
/// Yields each non-empty decoded chunk in order, then ends. On the first
/// failure, whether a decoding error or an error from the inbound stream,
/// the inbound stream is dropped and the error is yielded once before the
/// stream ends. Dropping a `DecodedBody` before it ends cancels decoding
/// and releases the decoder.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use decodeframe::{
///     config::DecodingConfig,
///     pipeline::{DecodedBody, StreamDecoding},
///     registry::EncodingRegistry,
/// };
/// use futures::{StreamExt, stream};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = EncodingRegistry::with_defaults();
/// let decoding = StreamDecoding::new(&registry, Some("identity"), DecodingConfig::default());
/// let inbound = stream::iter([
///     Ok::<_, std::io::Error>(Bytes::from_static(b"he")),
///     Ok(Bytes::from_static(b"llo")),
/// ]);
/// let body = DecodedBody::new(Box::pin(inbound), decoding);
/// let chunks: Vec<_> = body.map(|c| c.expect("decoded")).collect().await;
/// assert_eq!(chunks.concat(), b"hello");
/// # }
/// ```
pub struct DecodedBody {
    inbound: Option<BodyStream>,
    decoding: StreamDecoding,
}

impl DecodedBody {
    /// Decode `inbound` with `decoding`.
    #[must_use]
    pub fn new(inbound: BodyStream, decoding: StreamDecoding) -> Self {
        Self {
            inbound: Some(inbound),
            decoding,
        }
    }

    /// Decoded bytes yielded so far.
    #[must_use]
    pub fn decoded_len(&self) -> u64 { self.decoding.decoded_len() }

    /// Whether the stream has yielded its terminal item.
    #[must_use]
    pub fn is_terminated(&self) -> bool { self.inbound.is_none() }
}

impl Stream for DecodedBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(inbound) = this.inbound.as_mut() else {
                return Poll::Ready(None);
            };
            let result = match ready!(inbound.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => this.decoding.on_data(bytes),
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "inbound body failed");
                    this.decoding.cancel();
                    this.inbound = None;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.inbound = None;
                    this.decoding.on_end()
                }
            };
            match result {
                Ok(Some(chunk)) if !chunk.is_empty() => {
                    return Poll::Ready(Some(Ok(chunk.into_bytes())));
                }
                // Empty output only means the decoder wants more input.
                Ok(_) => {}
                Err(err) => {
                    this.inbound = None;
                    return Poll::Ready(Some(Err(err.into())));
                }
            }
        }
    }
}

impl Drop for DecodedBody {
    fn drop(&mut self) { self.decoding.cancel(); }
}

impl std::fmt::Debug for DecodedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedBody")
            .field("decoding", &self.decoding)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Adaptor exposing a [`DecodedBody`] as [`AsyncRead`].
///
/// # Examples
///
/// ```
/// use decodeframe::pipeline::{DecodedBody, DecodedBodyReader};
/// use tokio::io::AsyncReadExt;
///
/// async fn read_all(body: DecodedBody) -> std::io::Result<Vec<u8>> {
///     let mut reader = DecodedBodyReader::new(body);
///     let mut buf = Vec::new();
///     reader.read_to_end(&mut buf).await?;
///     Ok(buf)
/// }
/// ```
pub struct DecodedBodyReader {
    inner: StreamReader<DecodedBody, Bytes>,
}

impl DecodedBodyReader {
    /// Create a reader over `body`.
    #[must_use]
    pub fn new(body: DecodedBody) -> Self {
        Self {
            inner: StreamReader::new(body),
        }
    }

    /// Consume the reader and return the underlying stream.
    ///
    /// Any buffered bytes from partial reads are discarded.
    #[must_use]
    pub fn into_inner(self) -> DecodedBody { self.inner.into_inner() }
}

impl AsyncRead for DecodedBodyReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}
