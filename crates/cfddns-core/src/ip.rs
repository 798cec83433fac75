// # IP Discovery
//
// Asks Cloudflare's trace endpoint which address a request came from.
//
// ## Response format
//
// `cdn-cgi/trace` answers with `key=value` lines:
//
// ```text
// fl=29f98
// h=one.one.one.one
// ip=203.0.113.7
// ts=1700000000.123
// ```
//
// ## Family selection
//
// The reported address has the family of the connection. Each family has
// its own `HttpClient`, which the transport pins to IPv4 or IPv6 (see
// `cfddns-http`).

use std::sync::Arc;

use crate::config::{DEFAULT_TRACE_URL, IpVersion};
use crate::traits::HttpClient;
use crate::types::{IpAddress, IpFamily};
use crate::{Error, Result};

const IP_MARKER: &str = "ip=";

/// Public IP discovery through a trace endpoint
#[derive(Clone)]
pub struct IpDiscovery {
    trace_url: String,
    v4: Arc<dyn HttpClient>,
    v6: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for IpDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpDiscovery")
            .field("trace_url", &self.trace_url)
            .finish_non_exhaustive()
    }
}

impl IpDiscovery {
    /// Discovery against the default trace URL with one client per family
    pub fn new(v4: Arc<dyn HttpClient>, v6: Arc<dyn HttpClient>) -> Self {
        Self::with_trace_url(DEFAULT_TRACE_URL, v4, v6)
    }

    pub fn with_trace_url(
        trace_url: impl Into<String>,
        v4: Arc<dyn HttpClient>,
        v6: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            trace_url: trace_url.into(),
            v4,
            v6,
        }
    }

    fn client(&self, family: IpFamily) -> &Arc<dyn HttpClient> {
        match family {
            IpFamily::V4 => &self.v4,
            IpFamily::V6 => &self.v6,
        }
    }

    /// Discover the public address of `family`
    ///
    /// No retries; the caller decides what a failure means.
    ///
    /// # Errors
    ///
    /// - `Network` / `Api` if the request fails
    /// - `Parse` if the body has no `ip=` line or the address is not of
    ///   `family`
    /// - `BufferTooSmall` if the address does not fit an `IpAddress`
    pub async fn discover_local_ip(&self, family: IpFamily) -> Result<IpAddress> {
        let response = self.client(family).get(&self.trace_url, &[]).await?;

        if !response.is_success() {
            return Err(Error::Api {
                status: response.status,
                message: format!("IP discovery via {} failed", self.trace_url),
            });
        }

        let ip = parse_trace(response.body.as_str()?, family)?;
        tracing::debug!("Discovered {} address {}", family, ip);
        Ok(ip)
    }

    /// Discover every family selected by `version`, concurrently
    ///
    /// Results come back in the order of [`IpVersion::families`].
    pub async fn discover(&self, version: IpVersion) -> Vec<(IpFamily, Result<IpAddress>)> {
        match version {
            IpVersion::V4 => vec![(IpFamily::V4, self.discover_local_ip(IpFamily::V4).await)],
            IpVersion::V6 => vec![(IpFamily::V6, self.discover_local_ip(IpFamily::V6).await)],
            IpVersion::Both => {
                let (v4, v6) = tokio::join!(
                    self.discover_local_ip(IpFamily::V4),
                    self.discover_local_ip(IpFamily::V6)
                );
                vec![(IpFamily::V4, v4), (IpFamily::V6, v6)]
            }
        }
    }
}

/// Extract the `ip=` value from a trace body
pub fn parse_trace(body: &str, family: IpFamily) -> Result<IpAddress> {
    let value = body
        .lines()
        .find_map(|line| line.strip_prefix(IP_MARKER))
        .map(str::trim)
        .ok_or_else(|| Error::parse("Trace response has no ip= line"))?;

    if value.is_empty() {
        return Err(Error::parse("Trace response has an empty ip= line"));
    }

    IpAddress::for_family(value, family)
}
