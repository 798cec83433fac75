// # Cloudflare API v4 client
//
// Thin request layer over the `HttpClient` capability. Each method issues
// exactly one request, maps the HTTP status, and decodes the JSON envelope.
// Retry, search and update decisions live in the callers (`zone`,
// `records`, `reconcile`).
//
// ## API Reference
//
// - List Zones: GET `/zones?per_page=1&name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A,AAAA&name=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
//
// ## Security
//
// The API token only ever appears in the `Authorization` header and is
// never logged.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::CLOUDFLARE_API_BASE;
use crate::traits::{HttpClient, HttpHeader, HttpResponse};
use crate::types::{ApiToken, IpAddress, RecordId, ZoneId, validate_record_name};
use crate::{Error, Result};

/// Longest raw body excerpt carried into an error message
const ERROR_BODY_EXCERPT: usize = 200;

/// Response envelope shared by every Cloudflare endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Element of the `/zones` result array
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Element of the `/dns_records` result array, or the PATCH result
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Cloudflare API client bound to one token
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct CloudflareApi {
    client: Arc<dyn HttpClient>,
    base_url: String,
    token: ApiToken,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl CloudflareApi {
    /// Create a client against the production API
    pub fn new(client: Arc<dyn HttpClient>, token: ApiToken) -> Self {
        Self::with_base_url(client, token, CLOUDFLARE_API_BASE)
    }

    /// Create a client against another base URL (trailing `/` is ignored)
    pub fn with_base_url(
        client: Arc<dyn HttpClient>,
        token: ApiToken,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
        }
    }

    fn read_headers(&self) -> [HttpHeader; 1] {
        [HttpHeader::bearer(&self.token)]
    }

    fn write_headers(&self) -> [HttpHeader; 2] {
        [HttpHeader::bearer(&self.token), HttpHeader::json_content_type()]
    }

    /// List zones named exactly `zone_name`, at most one result
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?per_page=1&name=example.com
    /// Authorization: Bearer <token>
    /// ```
    pub async fn list_zones(&self, zone_name: &str) -> Result<Vec<ZoneEntry>> {
        validate_record_name(zone_name)?;

        let url = format!("{}/zones?per_page=1&name={}", self.base_url, zone_name);
        let response = self.client.get(&url, &self.read_headers()).await?;
        decode_result(response, "zone list")
    }

    /// List the A and AAAA records named `record_name`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A,AAAA&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    pub async fn list_address_records(
        &self,
        zone_id: &ZoneId,
        record_name: &str,
    ) -> Result<Vec<RecordEntry>> {
        validate_record_name(record_name)?;

        let url = format!(
            "{}/zones/{}/dns_records?type=A,AAAA&name={}",
            self.base_url, zone_id, record_name
        );
        let response = self.client.get(&url, &self.read_headers()).await?;
        decode_result(response, "record list")
    }

    /// Set the content of a record, returning what the server stored
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    /// Content-Type: application/json
    ///
    /// {"content":"1.2.3.4"}
    /// ```
    pub async fn patch_record_content(
        &self,
        zone_id: &ZoneId,
        record_id: &RecordId,
        content: &IpAddress,
    ) -> Result<RecordEntry> {
        let url = self.record_url(zone_id, record_id);
        let body = serde_json::json!({ "content": content.as_str() }).to_string();

        let response = self
            .client
            .patch(&url, &self.write_headers(), &body)
            .await?;
        decode_result(response, "record update")
    }

    /// URL of a single record
    pub fn record_url(&self, zone_id: &ZoneId, record_id: &RecordId) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        )
    }
}

/// Map the status and decode the `result` field of an envelope
fn decode_result<T: DeserializeOwned>(response: HttpResponse, what: &str) -> Result<T> {
    if !response.is_success() {
        return Err(status_error(&response));
    }

    let envelope: Envelope<T> = serde_json::from_slice(response.body.as_bytes())
        .map_err(|e| Error::parse(format!("Failed to parse {} response: {}", what, e)))?;

    if !envelope.success {
        let message = first_error_message(&envelope.errors)
            .unwrap_or_else(|| "success=false without error details".to_string());
        return Err(Error::Api {
            status: response.status,
            message,
        });
    }

    envelope
        .result
        .ok_or_else(|| Error::parse(format!("Invalid {} response: result is missing", what)))
}

fn first_error_message(errors: &[ApiMessage]) -> Option<String> {
    errors
        .first()
        .map(|e| format!("{} (code {})", e.message, e.code))
}

/// Build an error for a non-2xx response
fn status_error(response: &HttpResponse) -> Error {
    let status = response.status;
    let message = serde_json::from_slice::<Envelope<serde_json::Value>>(response.body.as_bytes())
        .ok()
        .and_then(|envelope| first_error_message(&envelope.errors))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(response.body.as_bytes());
            text.chars().take(ERROR_BODY_EXCERPT).collect()
        });

    match status {
        401 | 403 => Error::Authentication { status, message },
        429 => Error::Api {
            status,
            message: format!("Rate limit exceeded: {}", message),
        },
        500..=599 => Error::Api {
            status,
            message: format!("Cloudflare server error (transient): {}", message),
        },
        _ => Error::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ResponseBuffer;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: ResponseBuffer::from_bytes(body.as_bytes(), 4096).unwrap(),
        }
    }

    #[test]
    fn test_decode_zone_list() {
        let body = r#"{"success":true,"errors":[],"messages":[],"result":[{"id":"023e105f4ecef8ad9ca31a8372d0c353","name":"example.com","status":"active"}]}"#;
        let zones: Vec<ZoneEntry> = decode_result(response(200, body), "zone list").unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id, "023e105f4ecef8ad9ca31a8372d0c353");
        assert_eq!(zones[0].name.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_decode_auth_failure() {
        let body = r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"result":null}"#;
        let err = decode_result::<Vec<ZoneEntry>>(response(403, body), "zone list").unwrap_err();
        match err {
            Error::Authentication { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Authentication error"));
            }
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_server_error_with_plain_body() {
        let err =
            decode_result::<Vec<ZoneEntry>>(response(502, "Bad Gateway"), "zone list").unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 502);
                assert!(message.ends_with("Bad Gateway"), "got {message}");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_success_false_with_200() {
        let body = r#"{"success":false,"errors":[{"code":7003,"message":"Could not route"}]}"#;
        let err = decode_result::<Vec<ZoneEntry>>(response(200, body), "zone list").unwrap_err();
        assert!(matches!(err, Error::Api { status: 200, .. }));
    }

    #[test]
    fn test_decode_garbage_is_parse_error() {
        let err =
            decode_result::<Vec<ZoneEntry>>(response(200, "<html>"), "zone list").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_decode_missing_result() {
        let err = decode_result::<Vec<ZoneEntry>>(response(200, r#"{"success":true}"#), "zone list")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
