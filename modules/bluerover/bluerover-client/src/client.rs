use std::sync::Arc;
use std::time::Duration;

use http::Method;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::credentials::{Credentials, SharedCredentials};
use crate::error::ClientError;
use crate::request::Request;
use crate::response::Response;
use crate::signer;
use crate::stream::{
    DEFAULT_STREAM_PATH, StreamConfig, StreamEvents, StreamHandle, StreamHandler, StreamSession,
};
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Main BlueRover client: signed one-shot calls and event streams
///
/// Cloning is cheap; clones share the transport and the credential cell.
pub struct BlueRoverClient<T: Transport = HttpTransport> {
    credentials: SharedCredentials,
    transport: Arc<T>,
}

impl<T: Transport> Clone for BlueRoverClient<T> {
    fn clone(&self) -> Self {
        Self {
            credentials: self.credentials.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> std::fmt::Debug for BlueRoverClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueRoverClient")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Configuration for [`BlueRoverClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            connect_timeout: HttpTransport::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set a custom connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Create configuration from environment variables
    ///
    /// Expects `BLUEROVER_KEY`, `BLUEROVER_TOKEN` and `BLUEROVER_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if any of them is unset or
    /// empty.
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self::new(Credentials::from_env()?))
    }
}

impl BlueRoverClient<HttpTransport> {
    /// Create a client over HTTP
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `key`, `token` or
    /// `base_url` is empty, or `base_url` is not absolute.
    pub fn new(
        key: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::from_config(ClientConfig::new(Credentials::new(key, token, base_url)?))
    }

    /// Create client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the HTTP client cannot be
    /// built.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.connect_timeout)?;
        Ok(Self::with_transport(config.credentials, transport))
    }
}

impl<T: Transport> BlueRoverClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        Self {
            credentials: SharedCredentials::new(credentials),
            transport: Arc::new(transport),
        }
    }

    /// Snapshot of the active credentials
    #[must_use]
    pub fn credentials(&self) -> Arc<Credentials> {
        self.credentials.load()
    }

    /// Replace the active credentials
    ///
    /// Affects later calls and the next reconnect of running streams;
    /// requests already in flight keep the snapshot they started with.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] under the same conditions as
    /// [`BlueRoverClient::new`]; the active credentials are left untouched.
    pub fn set_credentials(
        &self,
        key: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.replace_credentials(Credentials::new(key, token, base_url)?);
        Ok(())
    }

    /// Replace the active credentials with an already validated set
    pub fn replace_credentials(&self, credentials: Credentials) {
        self.credentials.store(credentials);
    }

    /// A new client bound to `credentials`, sharing only the transport
    ///
    /// Neither client sees credential changes made on the other.
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials: SharedCredentials::new(credentials),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Sign and send a request; the body is left unread
    ///
    /// Non-success statuses are returned as regular responses.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnsupportedOperation`] for any method other than GET,
    ///   before any network I/O
    /// - [`ClientError::InvalidArgument`] if the resulting URL is invalid
    /// - transport errors as reported by the transport
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        if *request.method() != Method::GET {
            return Err(ClientError::UnsupportedOperation(format!(
                "{} requests are not supported by the BlueRover API",
                request.method()
            )));
        }

        let credentials = self.credentials.load();
        let url = credentials.endpoint(request.path());
        let signature = signer::sign(
            credentials.key().expose_secret().as_bytes(),
            &Method::GET,
            &url,
            request.params(),
        )?;

        let query = request.query_string();
        let endpoint = if query.is_empty() {
            url
        } else {
            format!("{url}?{query}")
        };
        debug!(url = %endpoint, "Calling API");

        let transport_request = TransportRequest::new(endpoint)
            .authorization(&signer::authorization_value(credentials.token(), &signature))?
            .timeout(request.timeout());

        let response = self.transport.send(transport_request).await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), path = request.path(), "API returned non-success status");
        }
        Ok(response)
    }

    /// Signed GET of `relative_path`; returns the whole body as text
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus body read failures.
    pub async fn call<I, K, V>(&self, relative_path: &str, params: I) -> Result<String, ClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.execute(Request::get(relative_path, params))
            .await?
            .text_lossy()
            .await
    }

    /// Start an indefinitely reconnecting stream with default timings
    ///
    /// `relative_path` defaults to `/eventstream`. Returns immediately; the
    /// session keeps running after the handle is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn stream<H: StreamHandler>(&self, handler: H, relative_path: Option<&str>) -> StreamHandle {
        let path = relative_path
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_STREAM_PATH);
        StreamSession::assemble(
            Arc::clone(&self.transport),
            self.credentials.clone(),
            StreamConfig::new(path),
        )
        .spawn(handler)
    }

    /// Start a stream with explicit configuration
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `config` is invalid.
    pub fn stream_with_config<H: StreamHandler>(
        &self,
        handler: H,
        config: StreamConfig,
    ) -> Result<StreamHandle, ClientError> {
        Ok(self.session(config)?.spawn(handler))
    }

    /// Start a stream whose data and reconnect boundaries arrive as
    /// [`StreamEvent`](crate::stream::StreamEvent)s
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `config` is invalid.
    pub fn stream_events(
        &self,
        config: StreamConfig,
    ) -> Result<(StreamHandle, StreamEvents), ClientError> {
        let session = self.session(config)?;
        let (sender, events) = StreamEvents::channel();
        Ok((session.spawn(sender), events))
    }

    /// An unstarted session bound to this client's credential cell
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `config` is invalid.
    pub fn session(&self, config: StreamConfig) -> Result<StreamSession<T>, ClientError> {
        StreamSession::new(
            Arc::clone(&self.transport),
            self.credentials.clone(),
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let creds = Credentials::new("k", "t", "http://localhost:8080").unwrap();
        let config = ClientConfig::new(creds);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_with_connect_timeout() {
        let creds = Credentials::new("k", "t", "http://localhost:8080").unwrap();
        let config = ClientConfig::new(creds).with_connect_timeout(Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_creation() {
        let client = BlueRoverClient::new("k", "t", "http://localhost:8080");
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_rejects_missing_parts() {
        assert!(matches!(
            BlueRoverClient::new("", "t", "http://localhost"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            BlueRoverClient::new("k", "", "http://localhost"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            BlueRoverClient::new("k", "t", ""),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_credentials() {
        let client = BlueRoverClient::new("k", "t1", "http://localhost").unwrap();
        client.set_credentials("k2", "t2", "http://other").unwrap();

        let creds = client.credentials();
        assert_eq!(creds.token(), "t2");
        assert_eq!(creds.base_url(), "http://other");
    }

    #[test]
    fn test_failed_set_credentials_keeps_previous() {
        let client = BlueRoverClient::new("k", "t1", "http://localhost").unwrap();
        let err = client.set_credentials("k", "", "http://other").unwrap_err();

        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(client.credentials().token(), "t1");
    }

    #[test]
    fn test_with_credentials_is_independent() {
        let client = BlueRoverClient::new("k", "t1", "http://localhost").unwrap();
        let other = client.with_credentials(Credentials::new("k", "t2", "http://other").unwrap());

        client.set_credentials("k", "t3", "http://localhost").unwrap();

        assert_eq!(client.credentials().token(), "t3");
        assert_eq!(other.credentials().token(), "t2");
    }

    #[test]
    fn test_clones_share_credentials() {
        let client = BlueRoverClient::new("k", "t1", "http://localhost").unwrap();
        let clone = client.clone();

        client.set_credentials("k", "t2", "http://localhost").unwrap();

        assert_eq!(clone.credentials().token(), "t2");
    }
}
