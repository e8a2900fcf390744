//! The network primitive underneath the client.
//!
//! Everything above this module works with [`Transport`], so tests and
//! embedders can swap the default [`HttpTransport`] for their own stack.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use http::{HeaderMap, HeaderValue, header};

use crate::error::ClientError;
use crate::response::Response;

/// A fully prepared GET: absolute URL (query included) and headers
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: HeaderMap,
    /// Overall deadline for the exchange; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Set the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the value contains
    /// characters not allowed in a header.
    pub fn authorization(mut self, value: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::invalid_argument(format!("Invalid header value: {e}"))
        })?;
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(self)
    }

    /// Ask the server to keep the connection open.
    #[must_use]
    pub fn keep_alive(mut self) -> Self {
        self.headers
            .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sends a GET and hands back the response with its body still streaming.
///
/// Returning `Ok` means response headers arrived; the body may still fail
/// later through the chunk stream.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: TransportRequest) -> Result<Response, ClientError>;
}

/// Default [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a transport with the given connect timeout.
    ///
    /// No overall request timeout is installed: stream bodies are expected to
    /// stay open indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the HTTP client cannot be
    /// built (e.g. TLS backend initialization failure).
    pub fn new(connect_timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::invalid_argument(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response, ClientError> {
        let mut req_builder = self
            .http_client
            .get(&request.url)
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let resp = req_builder.send().await.map_err(classify_error)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp.bytes_stream().map_err(classify_error);

        Ok(Response::new(status, headers, Box::pin(stream)))
    }
}

fn classify_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(e.to_string())
    } else if e.is_connect() {
        ClientError::Connection(e.to_string())
    } else {
        ClientError::Reqwest(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let request = TransportRequest::new("http://localhost/eventstream")
            .authorization("BR token:sig")
            .unwrap()
            .keep_alive();

        assert_eq!(request.headers[header::AUTHORIZATION], "BR token:sig");
        assert_eq!(request.headers[header::CONNECTION], "keep-alive");
        assert!(request.timeout.is_none());
    }

    #[test]
    fn test_invalid_authorization_value() {
        let err = TransportRequest::new("http://localhost")
            .authorization("BR tok\n:sig")
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new(HttpTransport::DEFAULT_CONNECT_TIMEOUT).is_ok());
    }
}
