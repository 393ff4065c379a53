//! Registry lookups as seen by integrators.

use decodeframe::{
    DecodeError,
    RegistryError,
    chunk::Chunk,
    codec::{CodecDecoder, DecoderFactory, IdentityDecoder},
    config::MaxLength,
    registry::{DuplicatePolicy, EncodingRegistry, EncodingRegistryBuilder},
};
use decodeframe_testing::{LoggerHandle, compress, drive_decoder, logger, split_even};
use rstest::rstest;

/// Factory for a made-up `x-reverse` coding; the body bytes pass through.
#[derive(Debug)]
struct PassThroughFactory;

impl DecoderFactory for PassThroughFactory {
    fn encoding(&self) -> &'static str { "x-reverse" }

    fn new_decoder(&self, _output_capacity: usize) -> Box<dyn CodecDecoder> {
        Box::new(IdentityDecoder::new())
    }
}

#[test]
fn unknown_token_constructs_nothing() {
    let registry = EncodingRegistry::with_defaults();
    let err = registry.lookup("zzip").expect_err("unregistered");
    assert_eq!(
        err,
        DecodeError::UnsupportedEncoding {
            encoding: "zzip".into()
        }
    );
    assert_eq!(err.error_type(), "unsupported_encoding");
}

#[test]
fn custom_factories_extend_the_defaults() {
    let registry = EncodingRegistryBuilder::with_defaults()
        .register("X-Reverse", PassThroughFactory)
        .expect("fresh token")
        .build();

    assert!(registry.contains("x-reverse"));
    let mut decoder = registry.lookup("x-reverse").expect("registered").build(MaxLength::UNLIMITED);
    let decoded = drive_decoder(decoder.as_mut(), split_even(b"abc", 1)).expect("pass-through");
    assert_eq!(decoded, b"abc");
}

#[test]
fn x_gzip_decodes_gzip_bodies() {
    let body = compress("gzip", b"legacy alias");
    let mut decoder = EncodingRegistry::with_defaults()
        .lookup("x-gzip")
        .expect("alias registered")
        .build(MaxLength::UNLIMITED);
    let decoded = drive_decoder(decoder.as_mut(), split_even(&body, 5)).expect("valid body");
    assert_eq!(decoded, b"legacy alias");
}

#[rstest]
fn override_is_logged(mut logger: LoggerHandle) {
    let registry = EncodingRegistryBuilder::with_defaults()
        .duplicate_policy(DuplicatePolicy::Override)
        .register("br", PassThroughFactory)
        .expect("override allowed")
        .build();

    let mut decoder = registry.lookup("br").expect("still registered").build(MaxLength::UNLIMITED);
    assert_eq!(decoder.decode(Chunk::from_static(b"as-is")).expect("pass-through").as_slice(), b"as-is");

    let warnings = logger.drain_level(log::Level::Warn);
    assert!(
        warnings.iter().any(|w| w.contains("overriding decoder") && w.contains("br")),
        "{warnings:?}"
    );
}

#[test]
fn invalid_tokens_are_setup_errors() {
    let err = EncodingRegistryBuilder::new()
        .register("gzip;q=0.5", PassThroughFactory)
        .expect_err("separators are not token characters");
    assert!(matches!(err, RegistryError::InvalidToken { .. }));
}
