// # HTTP Transport
//
// reqwest implementation of the `HttpClient` capability.
//
// ## Behaviour
//
// - 30 second timeout per request (configurable)
// - HTTPS only unless explicitly relaxed (tests against local servers)
// - `User-Agent: cloudflare-ddns/<version>`
// - Optional pinning to one address family by binding the unspecified
//   local address of that family, so `cdn-cgi/trace` reports an address of
//   the requested family
// - Bodies are streamed chunk by chunk into a `ResponseBuffer`; a body that
//   does not fit fails with `Error::BufferTooSmall`
// - Non-2xx statuses are returned, not turned into errors
//
// ## Security
//
// The `Authorization` header value is marked sensitive, so reqwest and
// hyper never print it.

use async_trait::async_trait;
use cfddns_core::config::{DEFAULT_HTTP_TIMEOUT, RESPONSE_BUFFER_CAPACITY};
use cfddns_core::traits::{HttpClient, HttpHeader, HttpResponse};
use cfddns_core::{Error, IpFamily, ResponseBuffer, Result};
use reqwest::header::HeaderValue;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("cloudflare-ddns/", env!("CARGO_PKG_VERSION"));

/// Transport settings
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whole-request timeout
    pub timeout: Duration,

    /// Pin connections to one address family
    pub family: Option<IpFamily>,

    /// Refuse plain-HTTP URLs
    pub https_only: bool,

    /// Largest accepted response body
    pub buffer_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            family: None,
            https_only: true,
            buffer_capacity: RESPONSE_BUFFER_CAPACITY,
        }
    }
}

impl ClientOptions {
    /// Defaults pinned to `family`
    pub fn for_family(family: IpFamily) -> Self {
        Self {
            family: Some(family),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

/// reqwest-backed HTTP client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    buffer_capacity: usize,
}

impl ReqwestClient {
    /// Build a client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the TLS backend cannot be initialised
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .https_only(options.https_only)
            .user_agent(USER_AGENT);

        if let Some(family) = options.family {
            builder = builder.local_address(unspecified_address(family));
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            buffer_capacity: options.buffer_capacity,
        })
    }

    /// Client with default settings, pinned to `family`
    pub fn for_family(family: IpFamily, timeout: Duration) -> Result<Self> {
        Self::new(ClientOptions::for_family(family).timeout(timeout))
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        let mut response = request.send().await.map_err(network_error)?;
        let status = response.status().as_u16();

        let mut body = ResponseBuffer::with_capacity(self.buffer_capacity);
        while let Some(chunk) = response.chunk().await.map_err(network_error)? {
            body.try_extend(&chunk)?;
        }

        tracing::trace!("HTTP {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}

fn unspecified_address(family: IpFamily) -> IpAddr {
    match family {
        IpFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

fn with_headers(
    mut request: reqwest::RequestBuilder,
    headers: &[HttpHeader],
) -> Result<reqwest::RequestBuilder> {
    for header in headers {
        let mut value = HeaderValue::from_str(&header.value)
            .map_err(|_| Error::usage(format!("Invalid value for header {}", header.name)))?;
        if header.name.eq_ignore_ascii_case("authorization") {
            value.set_sensitive(true);
        }
        request = request.header(header.name, value);
    }
    Ok(request)
}

fn network_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::network(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        Error::network(format!("Connection failed: {}", e))
    } else {
        Error::network(format!("Request failed: {}", e))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[HttpHeader]) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let request = with_headers(self.client.get(url), headers)?;
        self.execute(request).await
    }

    async fn patch(&self, url: &str, headers: &[HttpHeader], body: &str) -> Result<HttpResponse> {
        tracing::debug!("PATCH {}", url);
        let request = with_headers(self.client.patch(url), headers)?.body(body.to_string());
        self.execute(request).await
    }
}
