use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::ClientError;

/// Environment variable holding the HMAC secret key.
pub const KEY_ENV: &str = "BLUEROVER_KEY";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "BLUEROVER_TOKEN";
/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "BLUEROVER_BASE_URL";

/// Validated API credentials.
///
/// All three fields are required and non-empty; `base_url` must be an
/// absolute URL. A `Credentials` value is immutable, replacing credentials
/// means swapping a whole new value in (see [`SharedCredentials`]).
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawCredentials")]
pub struct Credentials {
    key: SecretString,
    token: String,
    base_url: String,
}

/// Deserialization form; every field may be absent until validated.
#[derive(Deserialize)]
struct RawCredentials {
    key: Option<SecretString>,
    token: Option<String>,
    #[serde(alias = "baseUrl")]
    base_url: Option<String>,
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = ClientError;

    fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
        Self::validated(
            raw.key.map(|k| k.expose_secret().to_owned()),
            raw.token,
            raw.base_url,
        )
    }
}

impl Credentials {
    /// Create credentials from their parts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if any part is empty or the
    /// base URL is not absolute.
    pub fn new(
        key: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::validated(Some(key.into()), Some(token.into()), Some(base_url.into()))
    }

    /// Read credentials from `BLUEROVER_KEY`, `BLUEROVER_TOKEN` and
    /// `BLUEROVER_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if a variable is unset or
    /// empty, or the base URL is not absolute.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::validated(
            std::env::var(KEY_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(BASE_URL_ENV).ok(),
        )
    }

    fn validated(
        key: Option<String>,
        token: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ClientError> {
        let (Some(key), Some(token), Some(base_url)) = (
            key.filter(|v| !v.is_empty()),
            token.filter(|v| !v.is_empty()),
            base_url.filter(|v| !v.is_empty()),
        ) else {
            return Err(ClientError::invalid_argument(
                "key, token, and base URL must contain valid values",
            ));
        };

        Url::parse(&base_url).map_err(|e| {
            ClientError::invalid_argument(format!("base URL {base_url:?} is not absolute: {e}"))
        })?;

        Ok(Self {
            key: SecretString::from(key),
            token,
            base_url,
        })
    }

    /// The HMAC secret key.
    #[must_use]
    pub fn key(&self) -> &SecretString {
        &self.key
    }

    /// The API token sent in the `Authorization` header.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The API base URL; relative paths are appended verbatim.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` followed by `relative_path`, concatenated as-is.
    #[must_use]
    pub fn endpoint(&self, relative_path: &str) -> String {
        format!("{}{relative_path}", self.base_url)
    }
}

/// Intentionally does not print the secret key.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"[REDACTED]")
            .field("token", &self.token)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Credential cell shared between a client and the sessions it spawns.
///
/// Readers take a full snapshot with [`load`](Self::load); writers replace
/// the whole value, so a reader never sees a mix of old and new fields.
#[derive(Clone)]
pub struct SharedCredentials {
    inner: Arc<ArcSwap<Credentials>>,
}

impl SharedCredentials {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(credentials)),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Credentials> {
        self.inner.load_full()
    }

    /// Replace the snapshot; in-flight requests keep the one they loaded.
    pub fn store(&self, credentials: Credentials) {
        self.inner.store(Arc::new(credentials));
    }
}

impl fmt::Debug for SharedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedCredentials").field(&self.load()).finish()
    }
}
