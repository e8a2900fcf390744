//! The self-healing stream session.
//!
//! ```text
//!            ┌──────────────── sleep(delay of class) ◄──────────────┐
//!            ▼                                                      │
//!       Connecting ──error / non-2xx──► Reconnecting(TransportError)┤
//!            │ 2xx headers                                          │
//!            ▼                                                      │
//!        Streaming ──idle window elapsed──► Reconnecting(IdleTimeout)┤
//!            │                                                      │
//!            └──body ended / body error──► Reconnecting(Closed) ────┘
//!
//!   any state ──cancel──► Stopped
//!
//! Waiting for response headers is bounded by the idle timeout; expiry is a
//! transport error.
//! ```

use std::sync::Arc;

use futures::StreamExt;
use http::Method;
use secrecy::ExposeSecret;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    config::{IdlePolicy, StreamConfig},
    handler::StreamHandler,
    types::{ReconnectReason, SessionState},
};
use crate::{
    credentials::SharedCredentials,
    error::ClientError,
    response::Response,
    signer::{self, Params},
    transport::{Transport, TransportRequest},
};

/// How a single connection ended.
enum Outcome {
    Reconnect(ReconnectReason),
    Stop,
}

/// One logical, indefinitely reconnecting streaming connection.
///
/// The session owns at most one live connection. Each attempt loads a fresh
/// credential snapshot, so credentials replaced on the shared cell are picked
/// up at the next reconnect. Failures never surface as errors: they are
/// logged and turned into a fixed delay followed by a new attempt.
pub struct StreamSession<T: Transport> {
    transport: Arc<T>,
    credentials: SharedCredentials,
    config: StreamConfig,
}

impl<T: Transport> StreamSession<T> {
    /// Create a session; nothing happens until it is spawned or run.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `config` is invalid.
    pub fn new(
        transport: Arc<T>,
        credentials: SharedCredentials,
        config: StreamConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self::assemble(transport, credentials, config))
    }

    /// Build without validating; for configurations known to be valid.
    pub(crate) fn assemble(
        transport: Arc<T>,
        credentials: SharedCredentials,
        config: StreamConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start the session on a background task and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<H: StreamHandler>(self, handler: H) -> StreamHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting { attempt: 1 });
        let task = tokio::spawn(self.drive(handler, cancel.clone(), state_tx));

        StreamHandle {
            cancel,
            state: state_rx,
            task,
        }
    }

    /// Run the session on the current task until `cancel` fires or the
    /// handler reports itself closed.
    pub async fn run<H: StreamHandler>(self, handler: H, cancel: CancellationToken) {
        let (state_tx, _state_rx) = watch::channel(SessionState::Connecting { attempt: 1 });
        self.drive(handler, cancel, state_tx).await;
    }

    async fn drive<H: StreamHandler>(
        self,
        mut handler: H,
        cancel: CancellationToken,
        state: watch::Sender<SessionState>,
    ) {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            state.send_replace(SessionState::Connecting { attempt });

            let connection = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.connect(attempt) => result,
            };

            let reason = match connection {
                Ok(response) => {
                    info!(path = %self.config.relative_path, attempt, "Stream connection established");
                    state.send_replace(SessionState::Streaming);
                    handler.on_connect();
                    if handler.is_closed() {
                        break;
                    }

                    match self.pump(response, &mut handler, &cancel).await {
                        Outcome::Reconnect(reason) => reason,
                        Outcome::Stop => break,
                    }
                }
                Err(err) => {
                    warn!(error = %err, attempt, "There was an error connecting to the stream API");
                    ReconnectReason::TransportError(err.to_string())
                }
            };

            let retry_in = reason.delay(&self.config);
            warn!(
                reason = %reason,
                delay_ms = u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
                "Resetting stream connection"
            );
            handler.on_disconnect(&reason, retry_in);
            if handler.is_closed() {
                break;
            }
            state.send_replace(SessionState::Reconnecting { reason, retry_in });

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = sleep(retry_in) => {}
            }
        }

        state.send_replace(SessionState::Stopped);
        info!(path = %self.config.relative_path, "Stream session stopped");
    }

    /// Sign and open one connection; `Ok` only for a 2xx response.
    async fn connect(&self, attempt: u64) -> Result<Response, ClientError> {
        let credentials = self.credentials.load();
        let endpoint = credentials.endpoint(&self.config.relative_path);
        info!(url = %endpoint, attempt, "Connecting to stream");

        let signature = signer::sign(
            credentials.key().expose_secret().as_bytes(),
            &Method::GET,
            &endpoint,
            &Params::new(),
        )?;
        let request = TransportRequest::new(endpoint)
            .authorization(&signer::authorization_value(credentials.token(), &signature))?
            .keep_alive();

        let response = timeout(self.config.idle_timeout, self.transport.send(request))
            .await
            .map_err(|_| {
                ClientError::Timeout(format!(
                    "no response headers within {:?}",
                    self.config.idle_timeout
                ))
            })??;
        let status = response.status();
        if !status.is_success() {
            // The body is not read: an error response may itself never end.
            return Err(ClientError::Http {
                status,
                body: bytes::Bytes::new(),
            });
        }
        Ok(response)
    }

    /// Deliver chunks until the idle window elapses, the body ends, or the
    /// session is cancelled. Returning drops the body, which closes the
    /// connection.
    async fn pump<H: StreamHandler>(
        &self,
        response: Response,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Outcome {
        let mut body = response.into_stream();
        let idle = sleep(self.config.idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Outcome::Stop,
                () = &mut idle => {
                    warn!(
                        idle_timeout_ms = u64::try_from(self.config.idle_timeout.as_millis()).unwrap_or(u64::MAX),
                        "Stream connection timed out"
                    );
                    return Outcome::Reconnect(ReconnectReason::IdleTimeout);
                }
                item = body.next() => match item {
                    Some(Ok(chunk)) => {
                        debug!(len = chunk.len(), "Stream chunk received");
                        if self.config.idle_policy == IdlePolicy::ResetOnData {
                            idle.as_mut().reset(Instant::now() + self.config.idle_timeout);
                        }
                        handler.on_chunk(chunk);
                        if handler.is_closed() {
                            return Outcome::Stop;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "Stream connection failed mid-body");
                        return Outcome::Reconnect(ReconnectReason::Closed);
                    }
                    None => {
                        warn!("Stream connection closed by server");
                        return Outcome::Reconnect(ReconnectReason::Closed);
                    }
                }
            }
        }
    }
}

/// Control handle for a spawned [`StreamSession`].
///
/// Dropping the handle does not stop the session; call
/// [`cancel`](Self::cancel) or [`stop`](Self::stop).
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Request the session to stop; it does so at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the session and wait for its task to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Stream session task ended abnormally");
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Token that stops the session when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// `true` once the session task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
