//! Types shared by the stream session, its handlers and its handle.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::config::StreamConfig;

/// Why a connection ended; each class has its own fixed reconnect delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconnectReason {
    /// No data arrived within the idle window.
    IdleTimeout,
    /// The server ended the body or the connection broke mid-stream.
    Closed,
    /// The connection could not be established (or was refused with a
    /// non-success status).
    TransportError(String),
}

impl ReconnectReason {
    /// Delay before the next connection attempt for this class.
    #[must_use]
    pub fn delay(&self, config: &StreamConfig) -> Duration {
        match self {
            Self::IdleTimeout => config.reconnect_delay_on_timeout,
            Self::Closed => config.reconnect_delay_on_close,
            Self::TransportError(_) => config.reconnect_delay_on_error,
        }
    }
}

impl fmt::Display for ReconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::Closed => write!(f, "connection closed"),
            Self::TransportError(message) => write!(f, "transport error: {message}"),
        }
    }
}

/// Observable session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// A connection attempt is in flight; `attempt` counts from 1 and is
    /// never reset.
    Connecting { attempt: u64 },
    /// Response headers arrived; chunks are being delivered.
    Streaming,
    /// Waiting `retry_in` before the next attempt.
    Reconnecting {
        reason: ReconnectReason,
        retry_in: Duration,
    },
    /// The session was cancelled and will not reconnect.
    Stopped,
}

impl SessionState {
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Item of [`StreamEvents`](super::StreamEvents).
///
/// `Connected` and `Disconnected` bracket every connection, so consumers can
/// tell where one ordered run of chunks ends and the next begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Connected,
    Chunk(Bytes),
    Disconnected {
        reason: ReconnectReason,
        retry_in: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_per_class() {
        let config = StreamConfig::default()
            .reconnect_delay_on_timeout(Duration::from_secs(1))
            .reconnect_delay_on_close(Duration::from_secs(2))
            .reconnect_delay_on_error(Duration::from_secs(3));

        assert_eq!(ReconnectReason::IdleTimeout.delay(&config), Duration::from_secs(1));
        assert_eq!(ReconnectReason::Closed.delay(&config), Duration::from_secs(2));
        assert_eq!(
            ReconnectReason::TransportError("refused".into()).delay(&config),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ReconnectReason::IdleTimeout.to_string(), "idle timeout");
        assert_eq!(ReconnectReason::Closed.to_string(), "connection closed");
        assert_eq!(
            ReconnectReason::TransportError("dns".into()).to_string(),
            "transport error: dns"
        );
    }

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::Streaming.is_streaming());
        assert!(!SessionState::Connecting { attempt: 1 }.is_streaming());
        assert!(SessionState::Stopped.is_stopped());
    }
}
