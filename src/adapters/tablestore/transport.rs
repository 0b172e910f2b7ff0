//! Transport seam between signed requests and the network
//!
//! [`TableTransport`] is the only place I/O happens. [`ReqwestTransport`]
//! talks to the real service; the in-memory service in
//! [`super::memory`] implements the same trait for tests.

use super::request::{HttpMethod, SignedRequest};
use crate::domain::TableStoreError;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method};
use std::collections::HashMap;
use std::time::Duration;

/// Raw response of the table service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    /// Creates a response without headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, lower-casing its name
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Maps an unsuccessful response to the error taxonomy
    pub fn into_error(self) -> TableStoreError {
        let message = extract_error_message(&self.body);
        TableStoreError::from_status(self.status, message)
    }
}

/// Pulls `odata.error.message.value` out of an error body, or returns the
/// body itself
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/odata.error/message/value")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Sends signed requests
#[async_trait]
pub trait TableTransport: Send + Sync {
    /// Sends one request and returns the raw response
    ///
    /// Non-2xx statuses are returned as responses, not errors. Errors are
    /// reserved for requests that produced no response at all.
    async fn send(&self, request: SignedRequest) -> Result<TransportResponse, TableStoreError>;
}

/// [`TableTransport`] over HTTPS with reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TableStoreError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TableStoreError::ConnectionFailed(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    fn method(method: HttpMethod) -> Result<Method, TableStoreError> {
        Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| TableStoreError::ConnectionFailed(format!("invalid HTTP method: {e}")))
    }
}

#[async_trait]
impl TableTransport for ReqwestTransport {
    async fn send(&self, request: SignedRequest) -> Result<TransportResponse, TableStoreError> {
        let method = Self::method(request.method)?;
        let target = request.redacted_url().to_string();

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        tracing::trace!(method = %request.method, url = %target, "Sending table request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TableStoreError::Timeout(format!("{} {}: {}", request.method, target, e))
            } else {
                TableStoreError::ConnectionFailed(format!("{} {}: {}", request.method, target, e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| {
            TableStoreError::ConnectionFailed(format!("failed to read response body: {e}"))
        })?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = TransportResponse::new(200, "").with_header("ETag", "W/\"1\"");
        assert_eq!(response.header("etag"), Some("W/\"1\""));
        assert_eq!(response.header("ETAG"), Some("W/\"1\""));
    }

    #[test]
    fn test_into_error_uses_odata_message() {
        let body = r#"{"odata.error":{"code":"ResourceNotFound","message":{"lang":"en-US","value":"The specified resource does not exist."}}}"#;
        let err = TransportResponse::new(404, body).into_error();
        assert_eq!(
            err,
            TableStoreError::NotFound("The specified resource does not exist.".to_string())
        );
    }

    #[test]
    fn test_into_error_falls_back_to_body() {
        let err = TransportResponse::new(503, " busy ").into_error();
        assert_eq!(
            err,
            TableStoreError::RateLimited {
                status: 503,
                message: "busy".to_string()
            }
        );
    }

    #[test]
    fn test_merge_verb_is_accepted() {
        assert_eq!(ReqwestTransport::method(HttpMethod::Merge).unwrap().as_str(), "MERGE");
    }
}
