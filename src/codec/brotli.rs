//! `br` content decoding driven through `brotli`'s streaming decompressor.

use ::brotli::{BrotliDecompressStream, BrotliResult, BrotliState, enc::StandardAlloc};

use super::{Codec, CodecDecoder, DecoderFactory, Engine};
use crate::{
    chunk::OutputBuffer,
    error::{DecodeError, Result},
};

const ENCODING: &str = "br";

/// Output bytes reserved per decompression step.
const DECODE_STEP: usize = 4096;

type DecoderState = BrotliState<StandardAlloc, StandardAlloc, StandardAlloc>;

/// Decoder for the `br` content-encoding.
pub type BrotliDecoder = Codec<BrotliEngine>;

/// Streaming brotli engine.
///
/// Brotli can expand a handful of input bytes into megabytes, so output is
/// produced one step at a time and decoding pauses once the buffer passes
/// its limit.
pub struct BrotliEngine {
    state: Box<DecoderState>,
    total_out: usize,
    done: bool,
}

impl BrotliEngine {
    /// Create an engine with a fresh brotli decoder state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Box::new(BrotliState::new(
                StandardAlloc::default(),
                StandardAlloc::default(),
                StandardAlloc::default(),
            )),
            total_out: 0,
            done: false,
        }
    }

    /// Decompress from `input` into `out`, returning the number of input
    /// bytes consumed.
    ///
    /// Bytes past the last meta-block are left unconsumed.
    fn decompress(&mut self, mut input: &[u8], out: &mut OutputBuffer) -> Result<usize> {
        let supplied = input.len();
        while !self.done && !out.is_saturated() {
            let mut available_in = input.len();
            let mut input_offset = 0;
            let mut available_out = DECODE_STEP;
            let mut output_offset = 0;
            let result = BrotliDecompressStream(
                &mut available_in,
                &mut input_offset,
                input,
                &mut available_out,
                &mut output_offset,
                out.spare(DECODE_STEP),
                &mut self.total_out,
                &mut *self.state,
            );
            out.commit(DECODE_STEP, output_offset);
            input = &input[input_offset..];

            match result {
                BrotliResult::ResultSuccess => self.done = true,
                // All input is buffered inside the decoder state.
                BrotliResult::NeedsMoreInput => break,
                BrotliResult::NeedsMoreOutput if input_offset == 0 && output_offset == 0 => {
                    return Err(DecodeError::corruption(ENCODING, "decoder made no progress"));
                }
                BrotliResult::NeedsMoreOutput => {}
                BrotliResult::ResultFailure => {
                    return Err(DecodeError::corruption(ENCODING, "invalid brotli stream"));
                }
            }
        }
        Ok(supplied - input.len())
    }
}

impl Default for BrotliEngine {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for BrotliEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrotliEngine")
            .field("total_out", &self.total_out)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Engine for BrotliEngine {
    const ENCODING: &'static str = ENCODING;

    fn decode(&mut self, input: &[u8], out: &mut OutputBuffer) -> Result<()> {
        let consumed = self.decompress(input, out)?;
        if self.done && consumed < input.len() {
            tracing::debug!(
                encoding = ENCODING,
                discarded = input.len() - consumed,
                "discarding bytes after end of brotli stream"
            );
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut OutputBuffer) -> Result<()> {
        if self.done {
            return Ok(());
        }
        Err(DecodeError::corruption(
            ENCODING,
            "stream ended before the last meta-block",
        ))
    }
}

/// Factory registering [`BrotliDecoder`] under `br`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrotliFactory;

impl DecoderFactory for BrotliFactory {
    fn encoding(&self) -> &'static str { ENCODING }

    fn new_decoder(&self, output_capacity: usize) -> Box<dyn CodecDecoder> {
        Box::new(BrotliDecoder::with_output_capacity(BrotliEngine::new(), output_capacity))
    }
}
