//! Stream session configuration.

use std::time::Duration;

use crate::error::ClientError;

/// Path opened by [`BlueRoverClient::stream`](crate::BlueRoverClient::stream)
/// when none is given.
pub const DEFAULT_STREAM_PATH: &str = "/eventstream";

/// When the idle window starts counting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdlePolicy {
    /// Restart the window on every received chunk. A stream that keeps
    /// delivering data is never torn down.
    #[default]
    ResetOnData,
    /// Start the window once when the connection is established and never
    /// restart it: the connection is recycled every `idle_timeout` regardless
    /// of traffic.
    FixedWindow,
}

/// Configuration for a [`StreamSession`](super::StreamSession).
///
/// Every reconnect class has its own fixed delay; there is no backoff growth
/// and no attempt limit.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Path appended to the credentials' base URL.
    pub relative_path: String,
    /// Window without data after which the connection is torn down.
    pub idle_timeout: Duration,
    pub idle_policy: IdlePolicy,
    /// Delay before reconnecting after an idle timeout.
    pub reconnect_delay_on_timeout: Duration,
    /// Delay before reconnecting after the server closed the stream.
    pub reconnect_delay_on_close: Duration,
    /// Delay before reconnecting after a failed connection attempt.
    pub reconnect_delay_on_error: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            relative_path: DEFAULT_STREAM_PATH.to_owned(),
            idle_timeout: Duration::from_secs(4 * 60),
            idle_policy: IdlePolicy::default(),
            reconnect_delay_on_timeout: Duration::from_secs(2),
            reconnect_delay_on_close: Duration::from_secs(2),
            reconnect_delay_on_error: Duration::from_secs(4 * 60),
        }
    }
}

impl StreamConfig {
    /// Default configuration for `relative_path`.
    #[must_use]
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn idle_policy(mut self, policy: IdlePolicy) -> Self {
        self.idle_policy = policy;
        self
    }

    #[must_use]
    pub fn reconnect_delay_on_timeout(mut self, delay: Duration) -> Self {
        self.reconnect_delay_on_timeout = delay;
        self
    }

    #[must_use]
    pub fn reconnect_delay_on_close(mut self, delay: Duration) -> Self {
        self.reconnect_delay_on_close = delay;
        self
    }

    #[must_use]
    pub fn reconnect_delay_on_error(mut self, delay: Duration) -> Self {
        self.reconnect_delay_on_error = delay;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the idle timeout or the
    /// error reconnect delay is zero.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.idle_timeout.is_zero() {
            return Err(ClientError::invalid_argument("Idle timeout must be > 0"));
        }
        if self.reconnect_delay_on_error.is_zero() {
            return Err(ClientError::invalid_argument(
                "Reconnect delay after connection errors must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.relative_path, "/eventstream");
        assert_eq!(config.idle_timeout, Duration::from_secs(240));
        assert_eq!(config.idle_policy, IdlePolicy::ResetOnData);
        assert_eq!(config.reconnect_delay_on_timeout, Duration::from_secs(2));
        assert_eq!(config.reconnect_delay_on_close, Duration::from_secs(2));
        assert_eq!(config.reconnect_delay_on_error, Duration::from_secs(240));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = StreamConfig::new("/v2/events")
            .idle_timeout(Duration::from_secs(30))
            .idle_policy(IdlePolicy::FixedWindow)
            .reconnect_delay_on_timeout(Duration::from_millis(100))
            .reconnect_delay_on_close(Duration::from_millis(200))
            .reconnect_delay_on_error(Duration::from_secs(10));

        assert_eq!(config.relative_path, "/v2/events");
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_policy, IdlePolicy::FixedWindow);
        assert_eq!(config.reconnect_delay_on_timeout, Duration::from_millis(100));
        assert_eq!(config.reconnect_delay_on_close, Duration::from_millis(200));
        assert_eq!(config.reconnect_delay_on_error, Duration::from_secs(10));
    }

    #[test]
    fn test_validation_zero_idle_timeout() {
        let err = StreamConfig::default()
            .idle_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_validation_zero_error_delay() {
        let err = StreamConfig::default()
            .reconnect_delay_on_error(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_validation_zero_close_delay_is_allowed() {
        let config = StreamConfig::default().reconnect_delay_on_close(Duration::ZERO);
        assert!(config.validate().is_ok());
    }
}
