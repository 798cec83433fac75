//! Data model shared by every stage of the update workflow
//!
//! Identifiers and addresses are validated once, when they are constructed,
//! so code that holds a [`ZoneId`] or an [`IpAddress`] can build requests
//! without re-checking lengths.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::config::{
    API_TOKEN_LENGTH, IP_ADDRESS_MAX_LENGTH, RECORD_ID_LENGTH, RECORD_NAME_MAX_LENGTH,
    ZONE_ID_LENGTH,
};
use crate::{Error, Result};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4, published as an A record
    V4,
    /// IPv6, published as an AAAA record
    V6,
}

impl IpFamily {
    /// The record type that publishes this family
    pub fn record_type(self) -> RecordType {
        match self {
            IpFamily::V4 => RecordType::A,
            IpFamily::V6 => RecordType::Aaaa,
        }
    }

    fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpFamily::V4 => ip.is_ipv4(),
            IpFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IpFamily::V4 => "IPv4",
            IpFamily::V6 => "IPv6",
        })
    }
}

/// DNS record type handled by the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Parse the `type` field of an API record; other types yield `None`
    pub fn from_api(kind: &str) -> Option<Self> {
        match kind {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    pub fn family(self) -> IpFamily {
        match self {
            RecordType::A => IpFamily::V4,
            RecordType::Aaaa => IpFamily::V6,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloudflare API bearer token
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the token.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Validate and wrap a token
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.len() != API_TOKEN_LENGTH {
            return Err(Error::usage(format!(
                "API token must be {} characters, got {}",
                API_TOKEN_LENGTH,
                token.len()
            )));
        }
        if !token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(Error::usage("API token contains invalid characters"));
        }
        Ok(Self(token))
    }

    /// The raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<REDACTED>)")
    }
}

fn validate_api_id(kind: &str, id: &str, expected: usize) -> Result<()> {
    if id.len() != expected {
        return Err(Error::usage(format!(
            "{} must be {} characters, got {}",
            kind,
            expected,
            id.len()
        )));
    }
    if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::usage(format!("{} must be alphanumeric", kind)));
    }
    Ok(())
}

/// Opaque 32-character zone identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_api_id("Zone ID", &id, ZONE_ID_LENGTH)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque 32-character record identifier, scoped to a zone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_api_id("Record ID", &id, RECORD_ID_LENGTH)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Textual IP address, at most `IP_ADDRESS_MAX_LENGTH - 1` bytes
///
/// Compared as an opaque string: `"::1"` and `"0::1"` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpAddress(String);

impl IpAddress {
    /// Wrap an address, failing with `BufferTooSmall` if it does not fit
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        // one byte is reserved for the terminator of C callers
        if text.len() >= IP_ADDRESS_MAX_LENGTH {
            return Err(Error::BufferTooSmall {
                required: text.len() + 1,
                capacity: IP_ADDRESS_MAX_LENGTH,
            });
        }
        Ok(Self(text))
    }

    /// Wrap an address that must parse as `family`
    pub fn for_family(text: impl Into<String>, family: IpFamily) -> Result<Self> {
        let address = Self::new(text)?;
        let parsed: IpAddr = address
            .0
            .parse()
            .map_err(|_| Error::parse(format!("Invalid IP address: {}", address.0)))?;
        if !family.matches(&parsed) {
            return Err(Error::parse(format!(
                "Expected an {} address, got: {}",
                family, address.0
            )));
        }
        Ok(address)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drop the root label: `home.example.com.` names the same record as
/// `home.example.com`, and the API only knows the latter spelling
pub fn normalize_record_name(record_name: &str) -> &str {
    record_name.strip_suffix('.').unwrap_or(record_name)
}

/// Check a record name before it is put into a URL
pub fn validate_record_name(record_name: &str) -> Result<()> {
    if record_name.is_empty() {
        return Err(Error::usage("Record name cannot be empty"));
    }
    if record_name.len() > RECORD_NAME_MAX_LENGTH {
        return Err(Error::usage(format!(
            "Record name too long: {} bytes (max {})",
            record_name.len(),
            RECORD_NAME_MAX_LENGTH
        )));
    }
    if record_name
        .bytes()
        .any(|b| b.is_ascii_whitespace() || b.is_ascii_control() || b"/?#&%".contains(&b))
    {
        return Err(Error::usage(format!(
            "Record name contains characters not allowed in a DNS name: {}",
            record_name
        )));
    }
    Ok(())
}

/// A published A or AAAA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub id: RecordId,
    pub kind: RecordType,
    pub content: IpAddress,
}

/// Credentials supplied by configuration
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_token: ApiToken,
    pub record_name: String,
}

impl Credentials {
    pub fn new(api_token: impl Into<String>, record_name: impl Into<String>) -> Result<Self> {
        let record_name: String = record_name.into();
        let record_name = normalize_record_name(&record_name).to_string();
        validate_record_name(&record_name)?;
        Ok(Self {
            api_token: ApiToken::new(api_token)?,
            record_name,
        })
    }
}
