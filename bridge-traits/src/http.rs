//! HTTP Client Abstraction
//!
//! Provides the async HTTP transport used to fetch remote page and cover images.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    /// Shorthand for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the `Content-Type` header, if present (case-insensitive lookup)
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

/// Async HTTP client trait
///
/// Implementations perform a single attempt per call. Retry decisions belong
/// to the caller of the offline cache, which re-issues a download request.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch_page(client: &dyn HttpClient, url: &str) -> Result<Bytes> {
///     let response = client.execute(HttpRequest::get(url)).await?;
///     Ok(response.body)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails, TLS validation fails or the
    /// request times out. Non-2xx statuses are returned as responses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://cdn.example.com/t1/c1/0.jpg")
            .header("Referer", "https://example.com")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "https://cdn.example.com/t1/c1/0.jpg");
        assert_eq!(
            request.headers.get("Referer"),
            Some(&"https://example.com".to_string())
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_http_response_status_checks() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "image/png".to_string());
        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::from("png"),
        };

        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("image/png"));

        let not_found = HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(!not_found.is_success());
        assert_eq!(not_found.content_type(), None);
    }
}
