//! Configuration types and constants for the DDNS updater
//!
//! All limits imposed by the Cloudflare API live here as named constants, so
//! that request builders and validators agree on the same numbers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{ApiToken, IpFamily, validate_record_name};

/// Cloudflare API v4 base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Plain-text IP echo endpoint (`key=value` lines, one of them `ip=...`)
pub const DEFAULT_TRACE_URL: &str = "https://one.one.one.one/cdn-cgi/trace";

/// Length of every zone ID issued by Cloudflare
pub const ZONE_ID_LENGTH: usize = 32;

/// Length of every DNS record ID issued by Cloudflare
pub const RECORD_ID_LENGTH: usize = 32;

/// Longest record name accepted
pub const RECORD_NAME_MAX_LENGTH: usize = 255;

/// Size of a textual IP address buffer, terminator included
pub const IP_ADDRESS_MAX_LENGTH: usize = 46;

/// Length of a Cloudflare API token
pub const API_TOKEN_LENGTH: usize = 40;

/// Capacity of a single HTTP response body
pub const RESPONSE_BUFFER_CAPACITY: usize = 16 * 1024;

/// Default HTTP timeout for API and trace requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default directory for the zone ID cache
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/cloudflare-ddns";

/// Main updater configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Fully qualified record name (e.g., "home.example.com")
    pub record_name: String,

    /// Address families to reconcile
    #[serde(default)]
    pub ip_version: IpVersion,

    /// Zone ID cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Perform every GET but log instead of PATCHing
    #[serde(default)]
    pub dry_run: bool,

    /// Transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("record_name", &self.record_name)
            .field("ip_version", &self.ip_version)
            .field("cache", &self.cache)
            .field("dry_run", &self.dry_run)
            .field("http", &self.http)
            .finish()
    }
}

impl DdnsConfig {
    /// Create a configuration with defaults for everything but the credentials
    pub fn new(api_token: impl Into<String>, record_name: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            record_name: record_name.into(),
            ip_version: IpVersion::default(),
            cache: CacheConfig::default(),
            dry_run: false,
            http: HttpConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Only length/format preconditions are checked here; nothing touches
    /// the network.
    pub fn validate(&self) -> Result<(), crate::Error> {
        ApiToken::new(self.api_token.as_str())?;
        validate_record_name(&self.record_name)?;
        self.http.validate()?;

        if let CacheConfig::File { dir } = &self.cache
            && dir.as_os_str().is_empty()
        {
            return Err(crate::Error::config("Zone cache directory cannot be empty"));
        }

        Ok(())
    }
}

/// Which address families to reconcile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only (A record)
    V4,
    /// IPv6 only (AAAA record)
    V6,
    /// Both IPv4 and IPv6
    #[default]
    Both,
}

impl IpVersion {
    /// The families this setting selects, IPv4 first
    pub fn families(self) -> &'static [IpFamily] {
        match self {
            IpVersion::V4 => &[IpFamily::V4],
            IpVersion::V6 => &[IpFamily::V6],
            IpVersion::Both => &[IpFamily::V4, IpFamily::V6],
        }
    }
}

impl std::str::FromStr for IpVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4" | "4" | "ipv4" => Ok(IpVersion::V4),
            "v6" | "6" | "ipv6" => Ok(IpVersion::V6),
            "both" => Ok(IpVersion::Both),
            other => Err(crate::Error::config(format!(
                "Invalid IP version '{other}'. Valid values: v4, v6, both"
            ))),
        }
    }
}

/// Zone ID cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheConfig {
    /// One file per record name inside `dir`
    File {
        /// Cache directory
        dir: PathBuf,
    },

    /// In-memory cache (not persistent)
    Memory,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::File {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Cloudflare API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// IP echo endpoint used for discovery
    #[serde(default = "default_trace_url")]
    pub trace_url: String,

    /// Request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.api_base_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "API base URL must use HTTPS. Got: {}",
                self.api_base_url
            )));
        }
        if !self.trace_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "Trace URL must use HTTPS. Got: {}",
                self.trace_url
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(crate::Error::config(format!(
                "HTTP timeout must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            trace_url: default_trace_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    CLOUDFLARE_API_BASE.to_string()
}

fn default_trace_url() -> String {
    DEFAULT_TRACE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT.as_secs()
}
