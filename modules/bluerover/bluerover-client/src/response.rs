use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http::{HeaderMap, StatusCode};

use crate::error::ClientError;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Body chunks as delivered by the transport.
pub type ChunkStream = BoxStream<Result<Bytes, ClientError>>;

/// HTTP response whose body has not been consumed yet
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

enum ResponseBody {
    Buffered(Bytes),
    Streaming(ChunkStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => {
                f.debug_tuple("ResponseBody::Buffered").field(&bytes.len()).finish()
            }
            ResponseBody::Streaming(_) => write!(f, "ResponseBody::Streaming(..)"),
        }
    }
}

impl Response {
    /// Create a response around a chunk stream
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, stream: ChunkStream) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Streaming(stream),
        }
    }

    /// Create a response from buffered bytes
    #[must_use]
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, bytes: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Buffered(bytes.into()),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consume the response and return the entire body
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the body stream.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Consume the response and decode the body as UTF-8
    ///
    /// # Errors
    ///
    /// Returns the body stream's error, or [`ClientError::InvalidResponse`]
    /// if the body is not valid UTF-8.
    pub async fn text(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ClientError::InvalidResponse(format!("Invalid UTF-8: {e}")))
    }

    /// Consume the response and decode the body as UTF-8, replacing invalid
    /// sequences with U+FFFD
    ///
    /// # Errors
    ///
    /// Returns the body stream's error.
    pub async fn text_lossy(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Convert the response into its chunk stream
    #[must_use]
    pub fn into_stream(self) -> ChunkStream {
        match self.body {
            ResponseBody::Buffered(bytes) => {
                Box::pin(futures::stream::once(async move { Ok(bytes) }))
            }
            ResponseBody::Streaming(stream) => stream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_streaming_body_is_concatenated() {
        let chunks = vec![Ok(Bytes::from("hello ")), Ok(Bytes::from("world"))];
        let response = Response::new(StatusCode::OK, HeaderMap::new(), Box::pin(stream::iter(chunks)));

        assert_eq!(response.text().await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_body_error_is_propagated() {
        let chunks = vec![
            Ok(Bytes::from("partial")),
            Err(ClientError::Connection("reset".into())),
        ];
        let response = Response::new(StatusCode::OK, HeaderMap::new(), Box::pin(stream::iter(chunks)));

        assert!(matches!(
            response.bytes().await,
            Err(ClientError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let response = Response::from_bytes(StatusCode::OK, HeaderMap::new(), vec![0xff, 0xfe]);
        assert!(matches!(
            response.text().await,
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_text_lossy_replaces_invalid_utf8() {
        let body = vec![b'o', b'k', 0xff, b'!'];
        let response = Response::from_bytes(StatusCode::OK, HeaderMap::new(), body);
        assert_eq!(response.text_lossy().await.unwrap(), "ok\u{FFFD}!");
    }

    #[tokio::test]
    async fn test_buffered_into_stream() {
        let response = Response::from_bytes(StatusCode::OK, HeaderMap::new(), "abc");
        let mut stream = response.into_stream();

        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("abc"));
        assert!(stream.next().await.is_none());
    }
}
