//! Content-encoding registry mapping tokens to decoder factories.
//!
//! A registry is assembled once with [`EncodingRegistryBuilder`] and then
//! frozen into an [`EncodingRegistry`]: an immutable, cheaply cloneable
//! table that streams consult without locking. Each lookup returns a
//! [`DecoderConstructor`] that builds a fresh, bound-enforcing decoder for
//! exactly one stream.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    codec::{BrotliFactory, CodecDecoder, DecoderFactory, DeflateFactory, GzipFactory, IdentityFactory},
    config::{DecodingConfig, MaxLength},
    error::{DecodeError, RegistryError, Result},
    guard::{LengthGuard, StreamDecoder},
};

/// Case-insensitive content-encoding token, stored lowercase.
///
/// # Examples
///
/// ```
/// use decodeframe::registry::ContentEncoding;
///
/// let token = ContentEncoding::new("GZip").expect("valid token");
/// assert_eq!(token.as_str(), "gzip");
/// assert!(ContentEncoding::new("gzip, br").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentEncoding(Box<str>);

impl ContentEncoding {
    /// Validate and normalise `token`.
    ///
    /// Surrounding whitespace is ignored. The token must be a non-empty run
    /// of HTTP token characters.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidToken`] when the token is empty or
    /// contains separators, whitespace, or non-ASCII characters.
    pub fn new(token: &str) -> Result<Self, RegistryError> {
        let trimmed = token.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(is_token_char) {
            return Err(RegistryError::InvalidToken {
                token: token.to_owned(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase().into_boxed_str()))
    }

    /// The normalised token.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// `tchar` from RFC 9110: visible ASCII other than delimiters.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// What [`EncodingRegistryBuilder::register`] does when a token is already
/// taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`RegistryError::DuplicateEncoding`].
    #[default]
    Reject,
    /// Replace the earlier factory and log the replacement.
    Override,
}

type SharedFactory = Arc<dyn DecoderFactory>;

/// Builder collecting decoder factories before the registry is frozen.
///
/// # Examples
///
/// ```
/// use decodeframe::{
///     codec::GzipFactory,
///     registry::{DuplicatePolicy, EncodingRegistryBuilder},
/// };
///
/// let registry = EncodingRegistryBuilder::new()
///     .register("gzip", GzipFactory)
///     .expect("fresh token")
///     .duplicate_policy(DuplicatePolicy::Override)
///     .register("GZIP", GzipFactory)
///     .expect("override allowed")
///     .build();
/// assert_eq!(registry.encodings(), vec!["gzip"]);
/// ```
#[derive(Default)]
pub struct EncodingRegistryBuilder {
    decoders: HashMap<ContentEncoding, SharedFactory>,
    policy: DuplicatePolicy,
}

impl EncodingRegistryBuilder {
    /// Create an empty builder that rejects duplicates.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Create a builder pre-populated with the built-in decoders:
    /// `identity`, `gzip`, `x-gzip`, `deflate` and `br`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let gzip: SharedFactory = Arc::new(GzipFactory);
        let builtins: [(&str, SharedFactory); 5] = [
            ("identity", Arc::new(IdentityFactory)),
            ("gzip", Arc::clone(&gzip)),
            ("x-gzip", gzip),
            ("deflate", Arc::new(DeflateFactory)),
            ("br", Arc::new(BrotliFactory)),
        ];
        let decoders = builtins
            .into_iter()
            .map(|(token, factory)| (ContentEncoding(token.into()), factory))
            .collect();
        Self {
            decoders,
            policy: DuplicatePolicy::default(),
        }
    }

    /// Choose how later registrations of an existing token are handled.
    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register `factory` under `token`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidToken`] for malformed tokens and
    /// [`RegistryError::DuplicateEncoding`] when the token is taken and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register<F>(mut self, token: &str, factory: F) -> Result<Self, RegistryError>
    where
        F: DecoderFactory,
    {
        let encoding = ContentEncoding::new(token)?;
        if self.decoders.contains_key(&encoding) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(RegistryError::DuplicateEncoding {
                        encoding: encoding.as_str().to_owned(),
                    });
                }
                DuplicatePolicy::Override => {
                    log::warn!("overriding decoder registered for content-encoding {encoding}");
                }
            }
        }
        self.decoders.insert(encoding, Arc::new(factory));
        Ok(self)
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> EncodingRegistry {
        EncodingRegistry {
            decoders: Arc::new(self.decoders),
        }
    }
}

impl fmt::Debug for EncodingRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingRegistryBuilder")
            .field("encodings", &sorted_tokens(&self.decoders))
            .field("policy", &self.policy)
            .finish()
    }
}

/// Immutable token-to-factory table shared across streams.
#[derive(Clone)]
pub struct EncodingRegistry {
    decoders: Arc<HashMap<ContentEncoding, SharedFactory>>,
}

impl EncodingRegistry {
    /// Start assembling a registry.
    #[must_use]
    pub fn builder() -> EncodingRegistryBuilder { EncodingRegistryBuilder::new() }

    /// Registry containing only the built-in decoders.
    #[must_use]
    pub fn with_defaults() -> Self { EncodingRegistryBuilder::with_defaults().build() }

    /// Resolve `token` to a decoder constructor.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnsupportedEncoding`] when no decoder is
    /// registered for the token or the token is malformed.
    pub fn lookup(&self, token: &str) -> Result<DecoderConstructor> {
        let unsupported = || DecodeError::UnsupportedEncoding {
            encoding: token.trim().to_owned(),
        };
        let encoding = ContentEncoding::new(token).map_err(|_| unsupported())?;
        let Some(factory) = self.decoders.get(&encoding) else {
            tracing::debug!(encoding = %encoding, "no decoder registered for content-encoding");
            return Err(unsupported());
        };
        Ok(DecoderConstructor {
            encoding,
            factory: Arc::clone(factory),
        })
    }

    /// Whether a decoder is registered for `token`.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        ContentEncoding::new(token).is_ok_and(|encoding| self.decoders.contains_key(&encoding))
    }

    /// Registered tokens in sorted order.
    #[must_use]
    pub fn encodings(&self) -> Vec<&str> { sorted_tokens(&self.decoders) }
}

impl Default for EncodingRegistry {
    fn default() -> Self { Self::with_defaults() }
}

impl fmt::Debug for EncodingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingRegistry")
            .field("encodings", &self.encodings())
            .finish()
    }
}

fn sorted_tokens(decoders: &HashMap<ContentEncoding, SharedFactory>) -> Vec<&str> {
    let mut tokens: Vec<&str> = decoders.keys().map(ContentEncoding::as_str).collect();
    tokens.sort_unstable();
    tokens
}

/// Handle that builds guarded decoders for one resolved encoding.
#[derive(Clone)]
pub struct DecoderConstructor {
    encoding: ContentEncoding,
    factory: SharedFactory,
}

impl DecoderConstructor {
    /// Constructor for the `identity` pass-through, used when a body has no
    /// content-encoding header.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            encoding: ContentEncoding("identity".into()),
            factory: Arc::new(IdentityFactory),
        }
    }

    /// Token this constructor was resolved from.
    #[must_use]
    pub fn encoding(&self) -> &ContentEncoding { &self.encoding }

    /// Build a fresh decoder enforcing `max_length`.
    #[must_use]
    pub fn build(&self, max_length: impl Into<MaxLength>) -> Box<dyn StreamDecoder> {
        self.build_with(&DecodingConfig::default().max_length(max_length))
    }

    /// Build a fresh decoder from a full [`DecodingConfig`].
    #[must_use]
    pub fn build_with(&self, config: &DecodingConfig) -> Box<dyn StreamDecoder> {
        let codec: Box<dyn CodecDecoder> = self.factory.new_decoder(config.output_capacity_value());
        tracing::debug!(
            encoding = %self.encoding,
            max_length = %config.max_length_value(),
            "decoder created"
        );
        Box::new(LengthGuard::new(codec, config.max_length_value()))
    }
}

impl fmt::Debug for DecoderConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConstructor")
            .field("encoding", &self.encoding)
            .field("algorithm", &self.factory.encoding())
            .finish()
    }
}

static GLOBAL: OnceLock<EncodingRegistry> = OnceLock::new();

/// Install the process-wide registry.
///
/// Must run during startup, before the first call to [`global`].
///
/// # Errors
///
/// Returns [`RegistryError::AlreadyInstalled`] if a registry was installed
/// already or [`global`] has fallen back to the defaults.
pub fn install_global(registry: EncodingRegistry) -> Result<(), RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)
}

/// The process-wide registry, or the defaults when none was installed.
pub fn global() -> &'static EncodingRegistry { GLOBAL.get_or_init(EncodingRegistry::with_defaults) }

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
