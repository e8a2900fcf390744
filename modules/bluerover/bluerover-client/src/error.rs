use thiserror::Error;
use bytes::Bytes;
use http::StatusCode;

/// Errors returned by BlueRover client operations
///
/// Stream sessions never return these to the caller; they are turned into
/// reconnect decisions and logged.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or malformed input: empty credentials, unparsable URLs,
    /// missing request path, invalid stream configuration
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The API does not support the requested operation (e.g. POST)
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: status={status}")]
    Http { status: StatusCode, body: Bytes },

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl ClientError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns `true` for failures raised by the network layer rather than
    /// by argument validation.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            Self::InvalidArgument(_) | Self::UnsupportedOperation(_)
        )
    }
}
