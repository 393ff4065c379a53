//! `gzip` content decoding.
//!
//! The member header is parsed incrementally so a header split across any
//! number of chunks decodes the same as one delivered whole:
//!
//! ```text
//! +---+---+----+-----+-------+-----+----+
//! |ID1|ID2| CM | FLG | MTIME | XFL | OS |   fixed, 10 bytes
//! +---+---+----+-----+-------+-----+----+
//! [XLEN(2) extra(XLEN)] [name\0] [comment\0] [CRC16(2)]   per FLG
//! deflate payload
//! CRC32(4, LE) ISIZE(4, LE)
//! ```
//!
//! The trailer is verified against the CRC-32 and length of the decoded
//! output. Bytes after the trailer are discarded.

use flate2::Crc;

use super::{Codec, CodecDecoder, DecoderFactory, Engine, inflate::Inflater};
use crate::{
    chunk::OutputBuffer,
    error::{DecodeError, Result},
};

const ENCODING: &str = "gzip";

const MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const FIXED_HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const RESERVED_FLAGS: u8 = 0xe0;

/// Decoder for the `gzip` (and `x-gzip`) content-encoding.
pub type GzipDecoder = Codec<GzipEngine>;

#[derive(Clone, Copy, Debug)]
enum Header {
    Fixed { buf: [u8; FIXED_HEADER_LEN], filled: usize },
    ExtraLen { buf: [u8; 2], filled: usize },
    Extra { remaining: usize },
    Name,
    Comment,
    HeaderCrc { buf: [u8; 2], filled: usize },
}

#[derive(Debug)]
enum State {
    Header(Header),
    Body(Inflater),
    Trailer { buf: [u8; TRAILER_LEN], filled: usize },
    Done,
}

impl State {
    fn describe(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Body(_) => "deflate body",
            Self::Trailer { .. } => "trailer",
            Self::Done => "end",
        }
    }
}

/// Incremental gzip member decoder.
#[derive(Debug)]
pub struct GzipEngine {
    state: State,
    flags: u8,
    header_crc: Crc,
    crc: Crc,
}

impl GzipEngine {
    /// Create an engine expecting a gzip member header.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Header(Header::Fixed {
                buf: [0; FIXED_HEADER_LEN],
                filled: 0,
            }),
            flags: 0,
            header_crc: Crc::new(),
            crc: Crc::new(),
        }
    }

    /// State that follows the header field just completed.
    fn next_header_field(&self, after: &Header) -> State {
        let pending = [
            (FEXTRA, Header::ExtraLen {
                buf: [0; 2],
                filled: 0,
            }),
            (FNAME, Header::Name),
            (FCOMMENT, Header::Comment),
            (FHCRC, Header::HeaderCrc {
                buf: [0; 2],
                filled: 0,
            }),
        ];
        let start = match after {
            Header::Fixed { .. } => 0,
            Header::ExtraLen { .. } | Header::Extra { .. } => 1,
            Header::Name => 2,
            Header::Comment => 3,
            Header::HeaderCrc { .. } => 4,
        };
        pending
            .into_iter()
            .skip(start)
            .find(|(flag, _)| self.flags & flag != 0)
            .map_or_else(|| State::Body(Inflater::raw()), |(_, h)| State::Header(h))
    }

    /// Consume header bytes, returning how many were used.
    fn parse_header(&mut self, input: &[u8]) -> Result<usize> {
        let State::Header(header) = &mut self.state else {
            return Ok(0);
        };
        let (used, complete) = match header {
            Header::Fixed { buf, filled } => fill(buf, filled, input),
            Header::ExtraLen { buf, filled } | Header::HeaderCrc { buf, filled } => {
                fill(buf, filled, input)
            }
            Header::Extra { remaining } => {
                let used = (*remaining).min(input.len());
                *remaining -= used;
                (used, *remaining == 0)
            }
            Header::Name | Header::Comment => match input.iter().position(|&b| b == 0) {
                Some(nul) => (nul + 1, true),
                None => (input.len(), false),
            },
        };

        // The header CRC covers every byte before the CRC field itself.
        if !matches!(header, Header::HeaderCrc { .. }) {
            self.header_crc.update(&input[..used]);
        }
        if !complete {
            return Ok(used);
        }

        let header = *header;
        self.state = match &header {
            Header::Fixed { buf, .. } => {
                self.check_fixed_header(buf)?;
                self.next_header_field(&header)
            }
            Header::ExtraLen { buf, .. } => match u16::from_le_bytes(*buf) {
                0 => self.next_header_field(&Header::Extra { remaining: 0 }),
                len => State::Header(Header::Extra {
                    remaining: usize::from(len),
                }),
            },
            Header::HeaderCrc { buf, .. } => {
                let expected = u16::from_le_bytes(*buf);
                #[allow(clippy::cast_possible_truncation, reason = "CRC16 is the low half of CRC32")]
                let actual = self.header_crc.sum() as u16;
                if expected != actual {
                    return Err(DecodeError::corruption(
                        ENCODING,
                        format!("header CRC mismatch: expected {expected:#06x}, got {actual:#06x}"),
                    ));
                }
                self.next_header_field(&header)
            }
            Header::Extra { .. } | Header::Name | Header::Comment => self.next_header_field(&header),
        };
        Ok(used)
    }

    fn check_fixed_header(&mut self, buf: &[u8; FIXED_HEADER_LEN]) -> Result<()> {
        if buf[..2] != MAGIC {
            return Err(DecodeError::corruption(
                ENCODING,
                format!("invalid magic {:#04x} {:#04x}", buf[0], buf[1]),
            ));
        }
        if buf[2] != METHOD_DEFLATE {
            return Err(DecodeError::corruption(
                ENCODING,
                format!("unsupported compression method {}", buf[2]),
            ));
        }
        if buf[3] & RESERVED_FLAGS != 0 {
            return Err(DecodeError::corruption(
                ENCODING,
                format!("reserved header flags set: {:#04x}", buf[3]),
            ));
        }
        self.flags = buf[3];
        Ok(())
    }

    fn inflate(&mut self, input: &[u8], out: &mut OutputBuffer) -> Result<usize> {
        let State::Body(inflater) = &mut self.state else {
            return Ok(0);
        };
        let start = out.len();
        let used = inflater.inflate(ENCODING, input, out)?;
        self.crc.update(&out.as_slice()[start..]);
        if inflater.is_done() {
            self.state = State::Trailer {
                buf: [0; TRAILER_LEN],
                filled: 0,
            };
        }
        Ok(used)
    }

    fn parse_trailer(&mut self, input: &[u8]) -> Result<usize> {
        let State::Trailer { buf, filled } = &mut self.state else {
            return Ok(0);
        };
        let (used, complete) = fill(buf, filled, input);
        if !complete {
            return Ok(used);
        }
        let [c0, c1, c2, c3, s0, s1, s2, s3] = *buf;
        let expected_crc = u32::from_le_bytes([c0, c1, c2, c3]);
        let expected_len = u32::from_le_bytes([s0, s1, s2, s3]);
        if expected_crc != self.crc.sum() {
            return Err(DecodeError::corruption(
                ENCODING,
                format!(
                    "CRC mismatch: expected {expected_crc:#010x}, got {:#010x}",
                    self.crc.sum()
                ),
            ));
        }
        if expected_len != self.crc.amount() {
            return Err(DecodeError::corruption(
                ENCODING,
                format!(
                    "length mismatch: expected {expected_len}, got {}",
                    self.crc.amount()
                ),
            ));
        }
        self.state = State::Done;
        Ok(used)
    }
}

impl Default for GzipEngine {
    fn default() -> Self { Self::new() }
}

/// Copy bytes from `input` into the unfilled tail of `buf`.
///
/// Returns the number of bytes used and whether `buf` is now full.
fn fill<const N: usize>(buf: &mut [u8; N], filled: &mut usize, input: &[u8]) -> (usize, bool) {
    let take = (N - *filled).min(input.len());
    buf[*filled..*filled + take].copy_from_slice(&input[..take]);
    *filled += take;
    (take, *filled == N)
}

impl Engine for GzipEngine {
    const ENCODING: &'static str = ENCODING;

    fn decode(&mut self, mut input: &[u8], out: &mut OutputBuffer) -> Result<()> {
        while !input.is_empty() && !out.is_saturated() {
            let used = match self.state {
                State::Header(_) => self.parse_header(input)?,
                State::Body(_) => self.inflate(input, out)?,
                State::Trailer { .. } => self.parse_trailer(input)?,
                State::Done => {
                    tracing::debug!(
                        encoding = ENCODING,
                        discarded = input.len(),
                        "discarding bytes after gzip trailer"
                    );
                    return Ok(());
                }
            };
            if used == 0 && matches!(self.state, State::Body(_)) {
                // Inflater needs more input than this call supplied.
                break;
            }
            input = &input[used..];
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut OutputBuffer) -> Result<()> {
        match self.state {
            State::Done => Ok(()),
            ref state => Err(DecodeError::corruption(
                ENCODING,
                format!("stream truncated in {}", state.describe()),
            )),
        }
    }
}

/// Factory registering [`GzipDecoder`] under `gzip` and its aliases.
#[derive(Clone, Copy, Debug, Default)]
pub struct GzipFactory;

impl DecoderFactory for GzipFactory {
    fn encoding(&self) -> &'static str { ENCODING }

    fn new_decoder(&self, output_capacity: usize) -> Box<dyn CodecDecoder> {
        Box::new(GzipDecoder::with_output_capacity(GzipEngine::new(), output_capacity))
    }
}

#[cfg(test)]
#[path = "gzip_tests.rs"]
mod tests;
