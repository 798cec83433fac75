// # HTTP Client Trait
//
// Defines the transport capability used for every Cloudflare API call and
// for IP discovery.
//
// ## Implementations
//
// - reqwest: `cfddns-http` crate
// - Tests: scripted fakes in `tests/common`
//
// ## Contract
//
// - One call = one request. No retries, no redirects to other hosts.
// - Request state (URL, headers) is per call; a client may be reused
//   sequentially or concurrently.
// - The body is accumulated into a `ResponseBuffer`; a body larger than the
//   buffer fails with `Error::BufferTooSmall` instead of being truncated.
// - Non-2xx statuses are NOT errors at this layer. The caller inspects
//   `HttpResponse::status`.

use async_trait::async_trait;

use crate::buffer::ResponseBuffer;
use crate::types::ApiToken;

/// HTTP method used by the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Patch,
}

/// A single request header
#[derive(Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub name: &'static str,
    pub value: String,
}

impl HttpHeader {
    /// `Authorization: Bearer <token>`
    pub fn bearer(token: &ApiToken) -> Self {
        Self {
            name: "Authorization",
            value: format!("Bearer {}", token.expose()),
        }
    }

    /// `Content-Type: application/json`
    pub fn json_content_type() -> Self {
        Self {
            name: "Content-Type",
            value: "application/json".to_string(),
        }
    }
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for HttpHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = if self.name.eq_ignore_ascii_case("authorization") {
            "<REDACTED>"
        } else {
            self.value.as_str()
        };
        f.debug_struct("HttpHeader")
            .field("name", &self.name)
            .field("value", &value)
            .finish()
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBuffer,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport capability
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the orchestrator issues the record
/// fetch and the IP discovery requests concurrently.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: any status, with the full body
    /// - `Err(Error::Network)`: connection, TLS or timeout failure
    /// - `Err(Error::BufferTooSmall)`: the body did not fit
    async fn get(&self, url: &str, headers: &[HttpHeader]) -> crate::Result<HttpResponse>;

    /// Perform a PATCH request with `body` as the payload
    async fn patch(
        &self,
        url: &str,
        headers: &[HttpHeader],
        body: &str,
    ) -> crate::Result<HttpResponse>;
}
