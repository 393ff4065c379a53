//! `identity` content decoding: chunks pass through without copying.

use super::{CodecDecoder, DecoderFactory, illegal_state};
use crate::{
    chunk::Chunk,
    error::{Operation, Phase, Result},
};

const ENCODING: &str = "identity";

/// Pass-through decoder used when a body carries no content-encoding.
///
/// # Examples
///
/// ```
/// use decodeframe::{chunk::Chunk, codec::{CodecDecoder, IdentityDecoder}};
///
/// let mut decoder = IdentityDecoder::new();
/// let out = decoder.decode(Chunk::from_static(b"plain")).expect("identity never fails");
/// assert_eq!(&*out, b"plain");
/// assert!(decoder.finish().expect("first finish").is_empty());
/// ```
#[derive(Debug)]
pub struct IdentityDecoder {
    phase: Phase,
}

impl IdentityDecoder {
    /// Create a pass-through decoder.
    #[must_use]
    pub const fn new() -> Self { Self { phase: Phase::Init } }
}

impl Default for IdentityDecoder {
    fn default() -> Self { Self::new() }
}

impl CodecDecoder for IdentityDecoder {
    fn encoding(&self) -> &'static str { ENCODING }

    fn phase(&self) -> Phase { self.phase }

    fn decode(&mut self, input: Chunk) -> Result<Chunk> {
        if !self.phase.is_open() {
            return Err(illegal_state(ENCODING, Operation::Decode, self.phase));
        }
        self.phase = Phase::Decoding;
        Ok(input)
    }

    fn finish(&mut self) -> Result<Chunk> {
        if !self.phase.is_open() {
            return Err(illegal_state(ENCODING, Operation::Finish, self.phase));
        }
        self.phase = Phase::Finished;
        Ok(Chunk::empty())
    }

    fn release(&mut self) {
        if self.phase.is_open() {
            self.phase = Phase::Failed;
        }
    }
}

/// Factory registering [`IdentityDecoder`] under `identity`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityFactory;

impl DecoderFactory for IdentityFactory {
    fn encoding(&self) -> &'static str { ENCODING }

    fn new_decoder(&self, _output_capacity: usize) -> Box<dyn CodecDecoder> {
        Box::new(IdentityDecoder::new())
    }
}
