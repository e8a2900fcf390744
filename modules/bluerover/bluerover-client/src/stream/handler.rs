//! Delivery of stream data to the caller.

use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use super::types::{ReconnectReason, StreamEvent};

/// Receives the data of a [`StreamSession`](super::StreamSession).
///
/// All methods run on the session task: a handler that blocks stalls
/// delivery and idle detection for that session.
///
/// Any `FnMut(Bytes) + Send + 'static` closure is a handler that only cares
/// about chunks.
pub trait StreamHandler: Send + 'static {
    /// Called for every chunk, in the order the transport delivered them.
    fn on_chunk(&mut self, chunk: Bytes);

    /// Called when a connection is established (or re-established).
    fn on_connect(&mut self) {}

    /// Called when a connection ends, before the reconnect delay starts.
    fn on_disconnect(&mut self, _reason: &ReconnectReason, _retry_in: Duration) {}

    /// Returning `true` stops the session; checked after every callback.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> StreamHandler for F
where
    F: FnMut(Bytes) + Send + 'static,
{
    fn on_chunk(&mut self, chunk: Bytes) {
        self(chunk);
    }
}

/// Handler forwarding everything into a [`StreamEvents`] channel.
///
/// The channel is unbounded so the session never waits on the consumer.
#[derive(Debug)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl StreamHandler for EventSender {
    fn on_chunk(&mut self, chunk: Bytes) {
        let _ = self.tx.send(StreamEvent::Chunk(chunk));
    }

    fn on_connect(&mut self) {
        let _ = self.tx.send(StreamEvent::Connected);
    }

    fn on_disconnect(&mut self, reason: &ReconnectReason, retry_in: Duration) {
        let _ = self.tx.send(StreamEvent::Disconnected {
            reason: reason.clone(),
            retry_in,
        });
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Stream of [`StreamEvent`]s from a session started with
/// [`BlueRoverClient::stream_events`](crate::BlueRoverClient::stream_events).
///
/// Dropping it stops the session at its next callback.
#[derive(Debug)]
pub struct StreamEvents {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl StreamEvents {
    pub(crate) fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, Self { rx })
    }

    /// Receive the next event; `None` once the session has stopped.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

impl Stream for StreamEvents {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.rx.poll_recv(cx)
    }
}
