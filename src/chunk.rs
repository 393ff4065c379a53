//! Reference-counted byte chunks flowing through the decoding pipeline.
//!
//! A [`Chunk`] is an immutable view over [`Bytes`]. Cloning a chunk shares
//! the underlying allocation, so several pipeline stages can hold the same
//! bytes without copying them. The allocation is returned when the last
//! handle is dropped, which gives every acquirer exactly-once release on
//! every exit path without explicit bookkeeping.
//!
//! Decoders collect their output in an [`OutputBuffer`] and split it into
//! chunks. The buffer keeps its `BytesMut` storage between calls and
//! reclaims the allocation once downstream consumers drop the chunks split
//! from it.

use std::{fmt, io, ops::Deref};

use bytes::{Bytes, BytesMut};

/// Default capacity reserved by an [`OutputBuffer`].
pub const DEFAULT_OUTPUT_CAPACITY: usize = 8 * 1024;

/// Immutable, reference-counted byte segment.
///
/// # Examples
///
/// ```
/// use decodeframe::chunk::Chunk;
///
/// let chunk = Chunk::from_static(b"hello");
/// let shared = chunk.clone();
/// assert_eq!(&*shared, b"hello");
/// assert_eq!(chunk.len(), 5);
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Chunk(Bytes);

impl Chunk {
    /// An empty chunk. Does not allocate.
    #[must_use]
    pub const fn empty() -> Self { Self(Bytes::new()) }

    /// Wrap a static byte slice without copying.
    #[must_use]
    pub const fn from_static(bytes: &'static [u8]) -> Self { Self(Bytes::from_static(bytes)) }

    /// Copy `bytes` into a new heap-owned chunk.
    #[must_use]
    pub fn copy_from_slice(bytes: &[u8]) -> Self { Self(Bytes::copy_from_slice(bytes)) }

    /// Number of bytes in the chunk.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the chunk holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Borrow the chunk as a byte slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { self.0.as_ref() }

    /// Consume the chunk and return the underlying [`Bytes`] handle.
    #[must_use]
    pub fn into_bytes(self) -> Bytes { self.0 }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &Self::Target { self.0.as_ref() }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] { self.0.as_ref() }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self { Self(bytes) }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self { Self(Bytes::from(bytes)) }
}

impl From<&'static [u8]> for Chunk {
    fn from(bytes: &'static [u8]) -> Self { Self::from_static(bytes) }
}

impl From<Chunk> for Bytes {
    fn from(chunk: Chunk) -> Self { chunk.0 }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk").field("len", &self.0.len()).finish()
    }
}

/// Growable sink that decoders write decompressed bytes into.
///
/// Implements [`io::Write`] so streaming decompressors can target it
/// directly. [`take`](Self::take) splits everything written so far into a
/// [`Chunk`] and leaves the buffer empty but with its storage reserved.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: BytesMut,
    capacity: usize,
    limit: Option<usize>,
}

impl OutputBuffer {
    /// Create a buffer that reserves `capacity` bytes before each write
    /// cycle.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            limit: None,
        }
    }

    /// Bytes written since the last [`take`](Self::take).
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len() }

    /// Whether nothing has been written since the last take.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Borrow the bytes written since the last take.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { &self.buf }

    /// Set the number of buffered bytes past which writers should stop
    /// producing output. `None` removes the limit.
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit.map(|l| usize::try_from(l).unwrap_or(usize::MAX));
    }

    /// Whether more bytes than the configured limit are buffered.
    #[must_use]
    pub fn is_saturated(&self) -> bool { self.limit.is_some_and(|limit| self.buf.len() > limit) }

    /// Append a slice of decoded bytes.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }

    /// Ensure at least `additional` bytes of spare capacity and return the
    /// spare region as an initialised, zero-filled tail.
    ///
    /// The caller writes into the returned slice and then commits the number
    /// of bytes actually produced with [`commit`](Self::commit).
    pub fn spare(&mut self, additional: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + additional, 0);
        &mut self.buf[start..]
    }

    /// Keep `produced` bytes of the region handed out by the last
    /// [`spare`](Self::spare) call and discard the rest.
    pub fn commit(&mut self, spare_len: usize, produced: usize) {
        let keep = self.buf.len() - spare_len + produced.min(spare_len);
        self.buf.truncate(keep);
    }

    /// Split the written bytes into a chunk.
    pub fn take(&mut self) -> Chunk {
        let chunk = Chunk(self.buf.split().freeze());
        self.buf.reserve(self.capacity);
        chunk
    }

    /// Split the written bytes into a chunk and give up the backing storage.
    pub fn take_last(&mut self) -> Chunk { Chunk(std::mem::take(&mut self.buf).freeze()) }

    /// Drop any written bytes and the backing storage.
    pub fn clear(&mut self) { self.buf = BytesMut::new(); }
}

impl Default for OutputBuffer {
    fn default() -> Self { Self::with_capacity(DEFAULT_OUTPUT_CAPACITY) }
}

impl io::Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
