// # cfddns-core
//
// Core library for the Cloudflare dynamic-DNS updater.
//
// ## Architecture Overview
//
// One run keeps a single A/AAAA record name pointed at the host's public
// address:
// - **IpDiscovery**: asks a trace endpoint for the public IPv4/IPv6 address
// - **Zone resolver**: finds the owning zone ID, from the `ZoneCache` or by
//   iterative suffix search
// - **Record fetcher**: reads the current A and AAAA records
// - **Reconciler**: PATCHes a record only when its content differs
// - **Updater**: runs the above and reports per-family outcomes
//
// ## Design Principles
//
// 1. **Capabilities at the seams**: network and cache I/O go through the
//    `HttpClient` and `ZoneCache` traits
// 2. **Validate before sizing**: IDs, names and tokens are checked when
//    their types are built, before any request exists
// 3. **Bounded bodies**: responses land in a fixed-capacity
//    `ResponseBuffer`; overflow is an error, never truncation
// 4. **Idempotency**: an up-to-date record is never written

pub mod api;
pub mod buffer;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod ip;
pub mod reconcile;
pub mod records;
pub mod traits;
pub mod types;
pub mod zone;

// Re-export core types for convenience
pub use api::CloudflareApi;
pub use buffer::ResponseBuffer;
pub use cache::{FileZoneCache, MemoryZoneCache};
pub use config::{CacheConfig, DdnsConfig, HttpConfig, IpVersion};
pub use engine::{FamilyReport, FamilyStatus, RunReport, Updater, Warning};
pub use error::{Error, Result, Stage, StageError};
pub use ip::IpDiscovery;
pub use reconcile::{Outcome, Reconciler};
pub use records::{RecordSet, fetch_records};
pub use traits::{HttpClient, HttpHeader, HttpMethod, HttpResponse, ZoneCache};
pub use types::{ApiToken, DnsRecord, IpAddress, IpFamily, RecordId, RecordType, ZoneId};
pub use zone::{ResolvedZone, ZoneSource, resolve_zone_id, search_zone_id};
