//! Unit tests for the per-stream driver and its async adapters.

use std::io::{self, Write as _};

use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use futures::{StreamExt, stream};
use rstest::{fixture, rstest};
use tokio::io::AsyncReadExt;

use super::*;
use crate::error::DecodeError;

fn gzip(data: &[u8]) -> Bytes {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).expect("write to memory");
    Bytes::from(enc.finish().expect("finish gzip"))
}

#[fixture]
fn registry() -> EncodingRegistry { EncodingRegistry::with_defaults() }

fn decoding(registry: &EncodingRegistry, encoding: Option<&str>, max_length: usize) -> StreamDecoding {
    StreamDecoding::new(registry, encoding, DecodingConfig::default().max_length(max_length))
}

fn inbound(parts: Vec<io::Result<Bytes>>) -> BodyStream { Box::pin(stream::iter(parts)) }

#[rstest]
fn absent_header_selects_identity(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, None, 0);
    let out = decoding
        .on_data(Bytes::from_static(b"raw"))
        .expect("identity")
        .expect("output");
    assert_eq!(&*out, b"raw");
    decoding.on_end().expect("clean end");
    assert_eq!(decoding.phase(), Phase::Finished);
    assert_eq!(decoding.decoded_len(), 3);
}

#[rstest]
fn gzip_body_decodes_across_units(registry: EncodingRegistry) {
    let body = gzip(b"compressed body");
    let mut decoding = decoding(&registry, Some("GZIP"), 0);
    let mut decoded = Vec::new();
    for unit in body.chunks(4) {
        let chunk = decoding
            .on_data(Bytes::copy_from_slice(unit))
            .expect("valid gzip")
            .expect("stream open");
        decoded.extend_from_slice(&chunk);
    }
    decoded.extend_from_slice(&decoding.on_end().expect("clean end").expect("stream open"));
    assert_eq!(decoded, b"compressed body");
}

#[rstest]
fn unknown_encoding_fails_once_then_drops_data(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, Some("zzip"), 0);

    let err = decoding
        .on_data(Bytes::from_static(b"abc"))
        .expect_err("unsupported");
    assert_eq!(
        err,
        DecodeError::UnsupportedEncoding {
            encoding: "zzip".to_owned()
        }
    );
    assert!(decoding.on_data(Bytes::from_static(b"def")).expect("dropped").is_none());
    assert!(decoding.on_end().expect("already failed").is_none());
    assert!(decoding.is_terminated());
}

#[rstest]
fn overflow_fails_then_drops_later_units(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, None, 4);
    decoding.on_data(Bytes::from_static(b"abc")).expect("within bound");

    let err = decoding
        .on_data(Bytes::from_static(b"de"))
        .expect_err("bound crossed");
    assert!(matches!(err, DecodeError::ContentTooLarge { attempted: 5, .. }));
    assert!(decoding.on_data(Bytes::from_static(b"f")).expect("dropped").is_none());
    assert_eq!(decoding.decoded_len(), 3);
}

#[rstest]
fn decoded_len_counts_only_delivered_bytes(registry: EncodingRegistry) {
    let body = gzip(&vec![b'z'; 256 * 1024]);
    let mut decoding = decoding(&registry, Some("gzip"), 10_000);
    let mut delivered = 0u64;
    let mut failure = None;
    for unit in body.chunks(64) {
        match decoding.on_data(Bytes::copy_from_slice(unit)) {
            Ok(Some(chunk)) => delivered += chunk.len() as u64,
            Ok(None) => {}
            Err(err) => failure = Some(err),
        }
    }

    assert!(matches!(failure, Some(DecodeError::ContentTooLarge { .. })));
    assert!(delivered <= 10_000);
    assert_eq!(decoding.decoded_len(), delivered);
}

#[rstest]
fn data_after_end_is_a_wiring_error(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, None, 0);
    decoding.on_end().expect("empty body");

    let err = decoding
        .on_data(Bytes::from_static(b"late"))
        .expect_err("after end");
    assert!(!err.is_client_error());
    assert!(matches!(decoding.on_end(), Err(DecodeError::IllegalState { .. })));
}

#[rstest]
fn cancel_drops_later_data(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, Some("gzip"), 0);
    let body = gzip(b"never finished");
    decoding
        .on_data(body.slice(..body.len() / 2))
        .expect("prefix decodes");

    decoding.cancel();
    decoding.cancel();

    assert!(decoding.is_terminated());
    assert!(decoding.on_data(body.slice(body.len() / 2..)).expect("dropped").is_none());
    assert!(decoding.on_end().expect("cancelled").is_none());
}

#[rstest]
fn empty_body_with_encoding_header_is_tolerated(registry: EncodingRegistry) {
    let mut decoding = decoding(&registry, Some("br"), 0);
    let tail = decoding.on_end().expect("empty body").expect("stream open");
    assert!(tail.is_empty());
}

#[rstest]
#[tokio::test]
async fn decoded_body_elides_empty_chunks(registry: EncodingRegistry) {
    let body = gzip(&vec![b'a'; 64 * 1024]);
    let units = body
        .chunks(3)
        .map(|unit| Ok(Bytes::copy_from_slice(unit)))
        .collect();
    let decoded = DecodedBody::new(inbound(units), decoding(&registry, Some("gzip"), 0));

    let chunks: Vec<Bytes> = decoded
        .map(|chunk| chunk.expect("valid gzip"))
        .collect()
        .await;

    assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
    assert_eq!(chunks.concat(), vec![b'a'; 64 * 1024]);
}

#[rstest]
#[tokio::test]
async fn decoded_body_yields_one_terminal_error(registry: EncodingRegistry) {
    let units = vec![
        Ok(Bytes::from_static(b"0123")),
        Ok(Bytes::from_static(b"456789")),
        Ok(Bytes::from_static(b"never read")),
    ];
    let mut decoded = DecodedBody::new(inbound(units), decoding(&registry, None, 8));

    assert_eq!(
        decoded.next().await.expect("first chunk").expect("within bound"),
        Bytes::from_static(b"0123")
    );
    let err = decoded.next().await.expect("terminal item").expect_err("bound crossed");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(decoded.is_terminated());
    assert!(decoded.next().await.is_none());
    assert!(decoded.next().await.is_none());
}

#[rstest]
#[tokio::test]
async fn inbound_error_is_forwarded_once(registry: EncodingRegistry) {
    let units = vec![
        Ok(Bytes::from_static(b"ok")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away")),
    ];
    let mut decoded = DecodedBody::new(inbound(units), decoding(&registry, None, 0));

    decoded.next().await.expect("first chunk").expect("identity");
    let err = decoded.next().await.expect("terminal item").expect_err("transport error");
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    assert!(decoded.next().await.is_none());
}

#[rstest]
#[tokio::test]
async fn truncated_body_fails_at_end(registry: EncodingRegistry) {
    let body = gzip(b"cut short");
    let units = vec![Ok(body.slice(..body.len() - 4))];
    let mut decoded = DecodedBody::new(inbound(units), decoding(&registry, Some("gzip"), 0));

    let mut items = Vec::new();
    while let Some(item) = decoded.next().await {
        items.push(item);
    }
    let err = items.pop().expect("terminal item").expect_err("truncated");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(items.into_iter().all(|item| item.is_ok()));
}

#[rstest]
#[tokio::test]
async fn channel_feeds_reader(registry: EncodingRegistry) {
    let (tx, body) = body_channel(2);
    let compressed = gzip(b"through the channel");
    let producer = tokio::spawn(async move {
        for unit in compressed.chunks(5) {
            tx.send(Ok(Bytes::copy_from_slice(unit)))
                .await
                .expect("receiver alive");
        }
    });

    let mut reader = DecodedBodyReader::new(DecodedBody::new(body, decoding(&registry, Some("gzip"), 0)));
    let mut out = String::new();
    reader.read_to_string(&mut out).await.expect("valid body");
    producer.await.expect("producer finished");

    assert_eq!(out, "through the channel");
}
