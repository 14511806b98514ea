//! HTTP transport used by the vault client.
//!
//! The client never talks to `reqwest` directly; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and interprets the returned status and
//! bytes itself. [`ReqwestTransport`] is the production implementation. Tests
//! and embedders can substitute their own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use url::Url;

use skyflow_common::RequestMethod;

use crate::error::ClientError;

/// Header names whose values are never printed.
const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-skyflow-authorization"];

/// A request ready to be sent.
#[derive(Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: RequestMethod,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Header name and value pairs, in the order they are applied.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub const fn new(method: RequestMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any existing value with the same name.
    ///
    /// Header names are compared case-insensitively.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// Custom Debug implementation to avoid exposing bearer tokens
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if SENSITIVE_HEADERS
                    .iter()
                    .any(|s| name.eq_ignore_ascii_case(s))
                {
                    "[REDACTED]"
                } else {
                    value.as_str()
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests on behalf of the client.
///
/// Implementations must be safe to share between concurrent calls. A
/// transport only reports failures to exchange bytes; non-2xx statuses are
/// returned as ordinary responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response status and body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportError`] if no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport without a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Creates a transport that gives up on requests after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

const fn to_reqwest_method(method: RequestMethod) -> reqwest::Method {
    match method {
        RequestMethod::Get => reqwest::Method::GET,
        RequestMethod::Post => reqwest::Method::POST,
        RequestMethod::Put => reqwest::Method::PUT,
        RequestMethod::Patch => reqwest::Method::PATCH,
        RequestMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        debug!("Sending {request:?}");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!("Received status {status} with {} body bytes", body.len());

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let request = HttpRequest::new(RequestMethod::Post, url("https://example.com"))
            .with_header("Content-Type", "text/plain")
            .with_header("content-type", "application/json");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let request = HttpRequest::new(RequestMethod::Post, url("https://example.com"))
            .with_header("Authorization", "Bearer super-secret")
            .with_header("X-Skyflow-Authorization", "also-secret")
            .with_header("X-Request-Id", "abc");

        let debug = format!("{request:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("abc"));
    }

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        let redirect = HttpResponse {
            status: 302,
            body: Vec::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[tokio::test]
    async fn test_reqwest_transport_sends_headers_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/things"))
            .and(query_param("a", "1"))
            .and(header("X-Test", "yes"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let request = HttpRequest::new(
            RequestMethod::Put,
            url(&format!("{}/v1/things?a=1", mock_server.uri())),
        )
        .with_header("X-Test", "yes")
        .with_body(b"payload".to_vec());

        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn test_reqwest_transport_returns_error_statuses() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();
        let response = transport
            .send(HttpRequest::new(RequestMethod::Get, url(&mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        assert_eq!(response.text(), "boom");
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_failure() {
        // Server is shut down on drop, leaving nothing listening on its port
        let uri = {
            let mock_server = MockServer::start().await;
            mock_server.uri()
        };

        let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();
        let result = transport
            .send(HttpRequest::new(RequestMethod::Get, url(&uri)))
            .await;

        assert!(matches!(result, Err(ClientError::TransportError(_))));
    }
}
