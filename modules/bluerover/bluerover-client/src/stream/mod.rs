//! Long-lived event stream with automatic reconnection.
//!
//! A [`StreamSession`] signs a GET for its path, delivers every received
//! chunk to a [`StreamHandler`] and, whatever goes wrong, reconnects after a
//! fixed delay chosen by the [`ReconnectReason`]:
//!
//! | Reason | Default delay |
//! |--------|---------------|
//! | idle timeout | 2 s |
//! | connection closed | 2 s |
//! | transport error | 4 min |
//!
//! There is no retry limit. A session stops only through its
//! [`StreamHandle`] or when its handler reports itself closed.
//!
//! # Architecture
//!
//! ```text
//! BlueRoverClient::stream(handler, path)
//!   └─ StreamSession::spawn ──► tokio::spawn(drive)
//!        │                          │
//!        ├── StreamHandle ──cancel──┤
//!        │                          │
//!        └── handler ◄── on_connect / on_chunk / on_disconnect
//! ```

mod config;
mod handler;
mod session;
mod types;

pub use config::{DEFAULT_STREAM_PATH, IdlePolicy, StreamConfig};
pub use handler::{StreamEvents, StreamHandler};
pub use session::{StreamHandle, StreamSession};
pub use types::{ReconnectReason, SessionState, StreamEvent};
