//! Test doubles and common utilities for contract tests
//!
//! The fakes script HTTP answers per (method, URL) and record every request,
//! so tests can assert both outcomes and the exact network traffic.

#![allow(dead_code)]

use async_trait::async_trait;
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{HttpClient, HttpHeader, HttpMethod, HttpResponse, ZoneCache};
use cfddns_core::{ApiToken, CloudflareApi, IpDiscovery, MemoryZoneCache, ResponseBuffer, ZoneId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "0123456789abcdefghij0123456789abcdefghij";
pub const API_BASE: &str = "https://api.cloudflare.test/client/v4";
pub const TRACE_URL: &str = "https://trace.cloudflare.test/cdn-cgi/trace";

pub const ZONE_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";
pub const OTHER_ZONE_ID: &str = "9a7806061c88ada191ed06f989cc3dac";
pub const RECORD_A_ID: &str = "372e67954025e0ba6aaa6d586b9e0b59";
pub const RECORD_AAAA_ID: &str = "6f2b9e7c5a4d3e2f1a0b9c8d7e6f5a4b";

/// Body capacity used by the fake transport
pub const FAKE_BUFFER_CAPACITY: usize = 4096;

/// A request seen by [`FakeHttpClient`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<HttpHeader>,
    pub body: Option<String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, String),
    Network(String),
}

/// Scripted, call-counting HTTP client
///
/// Each (method, URL) pair has a queue of replies; the last one repeats.
/// Unscripted requests fail with a network error.
pub struct FakeHttpClient {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    capacity: usize,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::with_capacity(FAKE_BUFFER_CAPACITY)
    }

    /// Fake whose bodies must fit in `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            capacity,
        }
    }

    fn push(self, method: HttpMethod, url: impl Into<String>, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.into()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_get(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.push(HttpMethod::Get, url, Reply::Status(status, body.into()))
    }

    pub fn on_get_network_error(self, url: impl Into<String>) -> Self {
        self.push(HttpMethod::Get, url, Reply::Network("connection reset".into()))
    }

    pub fn on_patch(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.push(HttpMethod::Patch, url, Reply::Status(status, body.into()))
    }

    pub fn on_patch_network_error(self, url: impl Into<String>) -> Self {
        self.push(HttpMethod::Patch, url, Reply::Network("connection reset".into()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn count(&self, method: HttpMethod) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// URLs of all GET requests, in order
    pub fn get_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == HttpMethod::Get)
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn patches(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == HttpMethod::Patch)
            .cloned()
            .collect()
    }

    fn answer(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[HttpHeader],
        body: Option<&str>,
    ) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.map(str::to_string),
        });

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&(method, url.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse {
                status,
                body: ResponseBuffer::from_bytes(body.as_bytes(), self.capacity)?,
            }),
            Some(Reply::Network(message)) => Err(Error::network(message)),
            None => Err(Error::network(format!("unscripted {:?} {}", method, url))),
        }
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(&self, url: &str, headers: &[HttpHeader]) -> Result<HttpResponse> {
        self.answer(HttpMethod::Get, url, headers, None)
    }

    async fn patch(&self, url: &str, headers: &[HttpHeader], body: &str) -> Result<HttpResponse> {
        self.answer(HttpMethod::Patch, url, headers, Some(body))
    }
}

/// A zone cache that counts calls and can refuse writes
#[derive(Default)]
pub struct CountingZoneCache {
    inner: MemoryZoneCache,
    loads: AtomicUsize,
    stores: AtomicUsize,
    invalidations: AtomicUsize,
    fail_stores: AtomicBool,
}

impl CountingZoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled with one entry
    pub async fn with_entry(record_name: &str, zone_id: &str) -> Self {
        let cache = Self::new();
        cache
            .inner
            .store(record_name, &ZoneId::parse(zone_id).unwrap())
            .await
            .unwrap();
        cache
    }

    pub fn fail_stores(self) -> Self {
        self.fail_stores.store(true, Ordering::SeqCst);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub async fn get(&self, record_name: &str) -> Option<ZoneId> {
        self.inner.load(record_name).await.unwrap()
    }
}

#[async_trait]
impl ZoneCache for CountingZoneCache {
    async fn load(&self, record_name: &str) -> Result<Option<ZoneId>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(record_name).await
    }

    async fn store(&self, record_name: &str, zone_id: &ZoneId) -> Result<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(Error::cache("read-only cache"));
        }
        self.inner.store(record_name, zone_id).await
    }

    async fn invalidate(&self, record_name: &str) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate(record_name).await
    }
}

// URL builders matching the requests the core sends

pub fn zones_url(name: &str) -> String {
    format!("{API_BASE}/zones?per_page=1&name={name}")
}

pub fn records_url(zone_id: &str, name: &str) -> String {
    format!("{API_BASE}/zones/{zone_id}/dns_records?type=A,AAAA&name={name}")
}

pub fn record_url(zone_id: &str, record_id: &str) -> String {
    format!("{API_BASE}/zones/{zone_id}/dns_records/{record_id}")
}

// Cloudflare-shaped bodies

pub fn zone_list_body(zone: Option<(&str, &str)>) -> String {
    let result = match zone {
        Some((id, name)) => serde_json::json!([{ "id": id, "name": name, "status": "active" }]),
        None => serde_json::json!([]),
    };
    serde_json::json!({ "success": true, "errors": [], "messages": [], "result": result })
        .to_string()
}

pub fn records_body(name: &str, records: &[(&str, &str, &str)]) -> String {
    let result: Vec<_> = records
        .iter()
        .map(|(id, kind, content)| {
            serde_json::json!({
                "id": id,
                "type": kind,
                "name": name,
                "content": content,
                "proxied": false,
                "ttl": 1
            })
        })
        .collect();
    serde_json::json!({ "success": true, "errors": [], "messages": [], "result": result })
        .to_string()
}

pub fn patched_body(id: &str, kind: &str, name: &str, content: &str) -> String {
    serde_json::json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": { "id": id, "type": kind, "name": name, "content": content }
    })
    .to_string()
}

pub fn error_body(code: i64, message: &str) -> String {
    serde_json::json!({
        "success": false,
        "errors": [{ "code": code, "message": message }],
        "messages": [],
        "result": null
    })
    .to_string()
}

pub fn trace_body(ip: &str) -> String {
    format!("fl=29f98\nh=one.one.one.one\nip={ip}\nts=1700000000.123\nvisit_scheme=https\n")
}

// Wiring

pub fn token() -> ApiToken {
    ApiToken::new(TOKEN).unwrap()
}

pub fn api(http: &Arc<FakeHttpClient>) -> CloudflareApi {
    CloudflareApi::with_base_url(http.clone(), token(), API_BASE)
}

/// Discovery answering `v4` / `v6` (None = network failure)
pub fn discovery(v4: Option<&str>, v6: Option<&str>) -> (IpDiscovery, Arc<FakeHttpClient>, Arc<FakeHttpClient>) {
    let fake = |ip: Option<&str>| {
        let client = FakeHttpClient::new();
        Arc::new(match ip {
            Some(ip) => client.on_get(TRACE_URL, 200, trace_body(ip)),
            None => client.on_get_network_error(TRACE_URL),
        })
    };
    let v4_client = fake(v4);
    let v6_client = fake(v6);
    let discovery = IpDiscovery::with_trace_url(TRACE_URL, v4_client.clone(), v6_client.clone());
    (discovery, v4_client, v6_client)
}
