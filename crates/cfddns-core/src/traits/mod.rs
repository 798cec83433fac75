//! Capability traits for the DDNS updater
//!
//! The core never talks to the network or the filesystem directly; it goes
//! through these interfaces so every stage can be exercised with fakes.
//!
//! - [`HttpClient`]: GET/PATCH with a bounded response body
//! - [`ZoneCache`]: persisted record-name → zone-ID mapping

pub mod http_client;
pub mod zone_cache;

pub use http_client::{HttpClient, HttpHeader, HttpMethod, HttpResponse};
pub use zone_cache::ZoneCache;
