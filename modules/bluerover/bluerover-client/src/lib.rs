//! BlueRover API client
//!
//! Every request is authenticated with an HMAC-SHA1 signature over a
//! canonical form of the method, URL and parameters, sent as
//! `Authorization: BR <token>:<signature>`.
//!
//! Two ways to talk to the API:
//!
//! - [`BlueRoverClient::call`] for one-shot signed GETs
//! - [`BlueRoverClient::stream`] for a long-lived event stream that
//!   reconnects forever with a fixed delay per failure class
//!
//! # Examples
//!
//! ## One-shot call
//!
//! ```no_run
//! use bluerover_client::BlueRoverClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BlueRoverClient::new("key", "token", "https://developers.bluerover.us")?;
//! let body = client
//!     .call("/devices", [("start", "2013-01-12 00:00")])
//!     .await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Event stream
//!
//! ```no_run
//! use bluerover_client::{BlueRoverClient, ClientConfig};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BlueRoverClient::from_config(ClientConfig::from_env()?)?;
//!
//! let handle = client.stream(
//!     |chunk: Bytes| println!("{}", String::from_utf8_lossy(&chunk)),
//!     None,
//! );
//!
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Signing by hand
//!
//! ```
//! use bluerover_client::{Method, Params, sign};
//!
//! let signature = sign(b"secret", &Method::GET, "http://api.example.com/eventstream", &Params::new())?;
//! assert_eq!(signature, "OPDMRsD9LoGphbvf8ILJ2GZ0FRM=");
//! # Ok::<(), bluerover_client::ClientError>(())
//! ```

mod client;
mod credentials;
mod error;
mod request;
mod response;
pub mod signer;
pub mod stream;
mod transport;

pub use client::{BlueRoverClient, ClientConfig};
pub use credentials::{BASE_URL_ENV, Credentials, KEY_ENV, SharedCredentials, TOKEN_ENV};
pub use error::ClientError;
pub use request::{Request, RequestBuilder};
pub use response::{BoxStream, ChunkStream, Response};
pub use signer::{AUTH_SCHEME, Params, authorization_value, canonical_string, sign};
pub use stream::{
    DEFAULT_STREAM_PATH, IdlePolicy, ReconnectReason, SessionState, StreamConfig, StreamEvent,
    StreamEvents, StreamHandle, StreamHandler, StreamSession,
};
pub use transport::{HttpTransport, Transport, TransportRequest};

pub use http::{Method, StatusCode};
