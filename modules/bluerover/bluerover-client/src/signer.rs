//! HMAC-SHA1 request signing for the BlueRover API.
//!
//! The API uses an OAuth-like (but not OAuth-compatible) scheme:
//!
//! 1. Normalize the URL to `scheme://host/path` (lower-case scheme and host,
//!    port dropped, path and query kept as written apart from a handful of
//!    unsafe characters)
//! 2. Join `key=value` pairs of the key-sorted parameters with `&`
//! 3. Percent-encode the upper-cased method, the normalized URL and the
//!    parameter string independently, then join them with `&`
//! 4. HMAC-SHA1 the result with the secret key and base64 the digest
//!
//! The signature travels in `Authorization: BR <token>:<signature>`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use url::Url;

use crate::error::ClientError;

type HmacSha1 = Hmac<Sha1>;

/// Request parameters, ordered by key.
pub type Params = BTreeMap<String, String>;

/// Characters left untouched by URI-component encoding: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Authorization scheme prefix expected by the API.
pub const AUTH_SCHEME: &str = "BR";

/// Compute the base64 HMAC-SHA1 signature of a request.
///
/// # Errors
///
/// Returns [`ClientError::InvalidArgument`] if `url` is not an absolute URL
/// with a host.
///
/// # Example
///
/// ```
/// use bluerover_client::signer::{Params, sign};
/// use http::Method;
///
/// let signature = sign(
///     b"secret",
///     &Method::GET,
///     "http://api.example.com/eventstream",
///     &Params::new(),
/// )?;
/// assert_eq!(signature, "OPDMRsD9LoGphbvf8ILJ2GZ0FRM=");
/// # Ok::<(), bluerover_client::ClientError>(())
/// ```
pub fn sign(key: &[u8], method: &Method, url: &str, params: &Params) -> Result<String, ClientError> {
    let base = canonical_string(method, url, params)?;

    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| ClientError::invalid_argument(format!("HMAC key rejected: {e}")))?;
    mac.update(base.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Build the string that [`sign`] feeds into HMAC.
///
/// # Errors
///
/// Returns [`ClientError::InvalidArgument`] if `url` is not an absolute URL
/// with a host.
pub fn canonical_string(method: &Method, url: &str, params: &Params) -> Result<String, ClientError> {
    let normalized_url = normalize_url(url)?;
    let param_string = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let elements = [
        method.as_str().to_uppercase(),
        normalized_url,
        param_string,
    ];

    Ok(elements
        .iter()
        .map(|element| encode_component(element))
        .collect::<Vec<_>>()
        .join("&"))
}

/// Value for the `Authorization` header.
#[must_use]
pub fn authorization_value(token: &str, signature: &str) -> String {
    format!("{AUTH_SCHEME} {token}:{signature}")
}

/// Percent-encode with URI-component rules (uppercase hex, UTF-8).
pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// `scheme://host` + path (+ `?query`), with scheme and host lower-cased and
/// any port dropped.
///
/// The path and query are taken as written: no dot-segment removal and no
/// percent-encoding beyond [`escape_path`].
fn normalize_url(url: &str) -> Result<String, ClientError> {
    let parsed = Url::parse(url)
        .map_err(|e| ClientError::invalid_argument(format!("invalid URL {url:?}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ClientError::invalid_argument(format!("URL {url:?} has no host")))?;

    let mut path = escape_path(raw_path_and_query(url.trim()));
    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    Ok(format!(
        "{}://{}{path}",
        parsed.scheme().to_lowercase(),
        host.to_lowercase()
    ))
}

/// Everything after the authority, without the fragment.
fn raw_path_and_query(url: &str) -> &str {
    let after_scheme = url.split_once(':').map_or(url, |(_, rest)| rest);
    let authority = after_scheme.trim_start_matches(['/', '\\']);
    let start = authority
        .find(['/', '\\', '?', '#'])
        .unwrap_or(authority.len());
    let rest = &authority[start..];
    rest.split_once('#').map_or(rest, |(before, _)| before)
}

/// Escape the few characters that may not appear raw in a request target.
/// Backslashes in the path count as `/`. Non-ASCII text and existing `%XX`
/// sequences pass through.
fn escape_path(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    let mut in_query = false;
    for c in raw.chars() {
        match c {
            '?' => {
                in_query = true;
                escaped.push(c);
            }
            '\\' if !in_query => escaped.push('/'),
            '\t' | '\n' | '\r' | ' ' | '"' | '\'' | '<' | '>' | '\\' | '^' | '`' | '{' | '|'
            | '}' => {
                let _ = write!(escaped, "%{:02X}", u32::from(c));
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
