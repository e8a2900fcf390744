use http::Method;
use std::time::Duration;

use crate::error::ClientError;
use crate::signer::{Params, encode_component};

/// One-shot API request: method, relative path and query parameters
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    params: Params,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a new request builder
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Shorthand for a GET of `path` with `params`
    pub fn get<I, K, V>(path: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::GET,
            path: path.into(),
            params: collect_params(params),
            timeout: None,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the API base URL
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Key-sorted, URI-component encoded `k=v&...`; empty when there are no
    /// parameters.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Builder for constructing requests with a fluent API
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    params: Params,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    /// Set the HTTP method; only GET is accepted when the request executes
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the path relative to the API base URL
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a query parameter, replacing any previous value for `key`
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add several query parameters
    #[must_use]
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params.extend(collect_params(params));
        self
    }

    /// Set request timeout
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Build the request
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if no path was set.
    pub fn build(self) -> Result<Request, ClientError> {
        let method = self.method.unwrap_or(Method::GET);
        let path = self
            .path
            .ok_or_else(|| ClientError::invalid_argument("Request path is required"))?;

        Ok(Request {
            method,
            path,
            params: self.params,
            timeout: self.timeout,
        })
    }
}

fn collect_params<I, K, V>(params: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_get() {
        let request = Request::builder().path("/devices").build().unwrap();
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.path(), "/devices");
        assert!(request.params().is_empty());
        assert!(request.timeout().is_none());
    }

    #[test]
    fn test_builder_requires_path() {
        let err = Request::builder().build().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_query_string_is_sorted_and_encoded() {
        let request = Request::builder()
            .path("/data")
            .param("b", "x/y*'")
            .param("a", "1 2")
            .build()
            .unwrap();

        assert_eq!(request.query_string(), "a=1%202&b=x%2Fy*'");
    }

    #[test]
    fn test_query_string_empty() {
        let request = Request::get("/eventstream", Vec::<(String, String)>::new());
        assert_eq!(request.query_string(), "");
    }

    #[test]
    fn test_get_shorthand_orders_params() {
        let request = Request::get("/x", [("b", "2"), ("a", "1")]);
        let keys: Vec<_> = request.params().keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
