//! Compressed fixtures for every built-in encoding.
//!
//! Encoders are only used here; the crate under test never compresses.

use std::io::Write as _;

use flate2::{
    Compression,
    write::{DeflateEncoder, GzEncoder, ZlibEncoder},
};

/// Encodings [`compress`] understands. `deflate-raw` produces a `deflate`
/// body without the zlib wrapper.
pub const ENCODINGS: [&str; 5] = ["identity", "gzip", "deflate", "deflate-raw", "br"];

/// Compress `data` for `encoding`.
///
/// # Panics
///
/// Panics on an encoding outside [`ENCODINGS`].
#[must_use]
pub fn compress(encoding: &str, data: &[u8]) -> Vec<u8> {
    match encoding {
        "identity" => data.to_vec(),
        "gzip" | "x-gzip" => finish(GzEncoder::new(Vec::new(), Compression::default()), data),
        "deflate" => finish(ZlibEncoder::new(Vec::new(), Compression::default()), data),
        "deflate-raw" => finish(DeflateEncoder::new(Vec::new(), Compression::default()), data),
        "br" => {
            let mut out = Vec::new();
            {
                let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
                writer.write_all(data).expect("write to memory");
            }
            out
        }
        other => panic!("no fixture encoder for {other:?}"),
    }
}

trait FinishEncoder: std::io::Write {
    fn finish_encoder(self) -> std::io::Result<Vec<u8>>;
}

impl FinishEncoder for GzEncoder<Vec<u8>> {
    fn finish_encoder(self) -> std::io::Result<Vec<u8>> { self.finish() }
}

impl FinishEncoder for ZlibEncoder<Vec<u8>> {
    fn finish_encoder(self) -> std::io::Result<Vec<u8>> { self.finish() }
}

impl FinishEncoder for DeflateEncoder<Vec<u8>> {
    fn finish_encoder(self) -> std::io::Result<Vec<u8>> { self.finish() }
}

fn finish<E: FinishEncoder>(mut encoder: E, data: &[u8]) -> Vec<u8> {
    encoder.write_all(data).expect("write to memory");
    encoder.finish_encoder().expect("finish encoder")
}

/// Compressed run of `len` zero bytes: a small body that expands hugely.
#[must_use]
pub fn bomb(encoding: &str, len: usize) -> Vec<u8> { compress(encoding, &vec![0; len]) }

/// Deterministic, mildly repetitive text of roughly `lines * 40` bytes.
#[must_use]
pub fn sample_text(lines: usize) -> Vec<u8> {
    (0..lines)
        .flat_map(|i| format!("{i:06} the quick brown fox jumps over\n").into_bytes())
        .collect()
}
