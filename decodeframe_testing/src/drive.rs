//! Drivers feeding compressed bodies to decoders in chosen chunkings.

use bytes::Bytes;
use decodeframe::{
    DecodeError,
    chunk::Chunk,
    guard::StreamDecoder,
    pipeline::StreamDecoding,
};

/// Split `data` into pieces of at most `size` bytes.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn split_even(data: &[u8], size: usize) -> Vec<Bytes> {
    data.chunks(size).map(Bytes::copy_from_slice).collect()
}

/// Split `data` at the given offsets. Offsets are sorted, clamped to the
/// data length, and may repeat, producing empty pieces.
#[must_use]
pub fn split_at_points(data: &[u8], points: &[usize]) -> Vec<Bytes> {
    let mut points: Vec<usize> = points.iter().map(|&p| p.min(data.len())).collect();
    points.sort_unstable();
    let mut pieces = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for point in points {
        pieces.push(Bytes::copy_from_slice(&data[start..point]));
        start = point;
    }
    pieces.push(Bytes::copy_from_slice(&data[start..]));
    pieces
}

/// Decode every piece in order, then finish, returning all output.
///
/// # Errors
///
/// Returns the first error raised by the decoder.
pub fn drive_decoder<I>(decoder: &mut dyn StreamDecoder, pieces: I) -> Result<Vec<u8>, DecodeError>
where
    I: IntoIterator<Item = Bytes>,
{
    let mut decoded = Vec::new();
    for piece in pieces {
        decoded.extend_from_slice(&decoder.decode(Chunk::from(piece))?);
    }
    decoded.extend_from_slice(&decoder.finish()?);
    Ok(decoded)
}

/// Feed every piece to `decoding`, then signal the end of the stream.
///
/// # Errors
///
/// Returns the first error raised while decoding.
pub fn drive_body<I>(decoding: &mut StreamDecoding, pieces: I) -> Result<Vec<u8>, DecodeError>
where
    I: IntoIterator<Item = Bytes>,
{
    let mut decoded = Vec::new();
    for piece in pieces {
        if let Some(chunk) = decoding.on_data(piece)? {
            decoded.extend_from_slice(&chunk);
        }
    }
    if let Some(tail) = decoding.on_end()? {
        decoded.extend_from_slice(&tail);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], vec![&b"abcdef"[..]])]
    #[case(&[2, 4], vec![&b"ab"[..], b"cd", b"ef"])]
    #[case(&[4, 2, 2], vec![&b"ab"[..], b"", b"cd", b"ef"])]
    #[case(&[0, 99], vec![&b""[..], b"abcdef", b""])]
    fn splits_at_sorted_points(#[case] points: &[usize], #[case] expected: Vec<&[u8]>) {
        let pieces = split_at_points(b"abcdef", points);
        let pieces: Vec<&[u8]> = pieces.iter().map(AsRef::as_ref).collect();
        assert_eq!(pieces, expected);
    }
}
