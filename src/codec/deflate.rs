//! `deflate` content decoding.
//!
//! HTTP's `deflate` coding is nominally zlib-wrapped, but many peers send
//! raw deflate. The decoder inspects the first two bytes: a valid zlib
//! header selects zlib framing (with Adler-32 verification), anything else
//! is inflated as raw deflate.

use super::{Codec, CodecDecoder, DecoderFactory, Engine, inflate::Inflater};
use crate::{
    chunk::OutputBuffer,
    error::{DecodeError, Result},
};

const ENCODING: &str = "deflate";

/// Decoder for the `deflate` content-encoding.
pub type DeflateDecoder = Codec<DeflateEngine>;

#[derive(Debug)]
enum State {
    /// Waiting for the two bytes that identify the wrapper.
    Detect { header: [u8; 2], filled: usize },
    Inflating(Inflater),
}

/// Zlib-or-raw deflate engine.
#[derive(Debug)]
pub struct DeflateEngine {
    state: State,
}

impl DeflateEngine {
    /// Create an engine that detects the wrapper from the first bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Detect {
                header: [0; 2],
                filled: 0,
            },
        }
    }
}

impl Default for DeflateEngine {
    fn default() -> Self { Self::new() }
}

/// Whether `cmf`/`flg` form a zlib header this decoder accepts.
///
/// Requires the deflate method with a window of at most 32 KiB, a valid
/// header check value, and no preset dictionary.
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    let method = cmf & 0x0f;
    let window = cmf >> 4;
    let check = (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0;
    let preset_dictionary = flg & 0x20 != 0;
    method == 8 && window <= 7 && check && !preset_dictionary
}

fn inflate_body(
    inflater: &mut Inflater,
    input: &[u8],
    out: &mut OutputBuffer,
) -> Result<()> {
    let consumed = inflater.inflate(ENCODING, input, out)?;
    if inflater.is_done() && consumed < input.len() {
        tracing::debug!(
            encoding = ENCODING,
            discarded = input.len() - consumed,
            "discarding bytes after end of deflate stream"
        );
    }
    Ok(())
}

impl Engine for DeflateEngine {
    const ENCODING: &'static str = ENCODING;

    fn decode(&mut self, mut input: &[u8], out: &mut OutputBuffer) -> Result<()> {
        if let State::Detect { header, filled } = &mut self.state {
            let take = (header.len() - *filled).min(input.len());
            header[*filled..*filled + take].copy_from_slice(&input[..take]);
            *filled += take;
            input = &input[take..];
            if *filled < header.len() {
                return Ok(());
            }
            let header = *header;
            let mut inflater = if is_zlib_header(header[0], header[1]) {
                Inflater::zlib()
            } else {
                tracing::debug!(encoding = ENCODING, "no zlib header, inflating raw deflate");
                Inflater::raw()
            };
            inflate_body(&mut inflater, &header, out)?;
            self.state = State::Inflating(inflater);
        }

        let State::Inflating(inflater) = &mut self.state else {
            return Ok(());
        };
        if input.is_empty() || out.is_saturated() {
            return Ok(());
        }
        inflate_body(inflater, input, out)
    }

    fn finish(&mut self, _out: &mut OutputBuffer) -> Result<()> {
        match &self.state {
            State::Inflating(inflater) if inflater.is_done() => Ok(()),
            State::Inflating(_) => Err(DecodeError::corruption(
                ENCODING,
                "stream ended before the final deflate block",
            )),
            State::Detect { filled, .. } => Err(DecodeError::corruption(
                ENCODING,
                format!("stream ended after {filled} header byte(s)"),
            )),
        }
    }
}

/// Factory registering [`DeflateDecoder`] under `deflate`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeflateFactory;

impl DecoderFactory for DeflateFactory {
    fn encoding(&self) -> &'static str { ENCODING }

    fn new_decoder(&self, output_capacity: usize) -> Box<dyn CodecDecoder> {
        Box::new(DeflateDecoder::with_output_capacity(
            DeflateEngine::new(),
            output_capacity,
        ))
    }
}
