//! Shared inflate loop over [`flate2::Decompress`].
//!
//! Both the deflate and gzip decoders feed their deflate payload through
//! [`Inflater`]. It consumes input until the compressed stream ends, the
//! input runs out, or the output buffer passes its limit.

use flate2::{Decompress, FlushDecompress, Status};

use crate::{
    chunk::OutputBuffer,
    error::{DecodeError, Result},
};

/// Output bytes reserved per inflate step.
const INFLATE_STEP: usize = 8 * 1024;

#[derive(Debug)]
pub(crate) struct Inflater {
    inner: Decompress,
    done: bool,
}

impl Inflater {
    /// Inflater for a zlib-wrapped stream (header and Adler-32 trailer).
    pub(crate) fn zlib() -> Self { Self::with(Decompress::new(true)) }

    /// Inflater for a raw deflate stream.
    pub(crate) fn raw() -> Self { Self::with(Decompress::new(false)) }

    fn with(inner: Decompress) -> Self { Self { inner, done: false } }

    /// Whether the compressed stream has reached its end marker.
    pub(crate) fn is_done(&self) -> bool { self.done }

    /// Inflate from `input` into `out`, returning the number of input bytes
    /// consumed.
    ///
    /// Bytes past the end of the compressed stream are left unconsumed.
    pub(crate) fn inflate(
        &mut self,
        encoding: &'static str,
        mut input: &[u8],
        out: &mut OutputBuffer,
    ) -> Result<usize> {
        let supplied = input.len();
        while !self.done && !out.is_saturated() {
            let before_in = self.inner.total_in();
            let before_out = self.inner.total_out();
            let status = self
                .inner
                .decompress(input, out.spare(INFLATE_STEP), FlushDecompress::None)
                .map_err(|e| DecodeError::corruption(encoding, e));
            let consumed = delta(self.inner.total_in(), before_in);
            let produced = delta(self.inner.total_out(), before_out);
            out.commit(INFLATE_STEP, produced);
            let status = status?;
            input = &input[consumed..];

            match status {
                Status::StreamEnd => self.done = true,
                Status::Ok | Status::BufError if consumed == 0 && produced == 0 => break,
                Status::Ok | Status::BufError => {
                    // A full output step may hide more pending output.
                    if input.is_empty() && produced < INFLATE_STEP {
                        break;
                    }
                }
            }
        }
        Ok(supplied - input.len())
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "per-call deltas are bounded by slice lengths"
)]
fn delta(after: u64, before: u64) -> usize { (after - before) as usize }
