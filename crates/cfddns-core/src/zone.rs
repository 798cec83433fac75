// # Zone Resolver
//
// Maps a fully qualified record name to the ID of the Cloudflare zone that
// owns it.
//
// ## Flow
//
// ```text
// resolve_zone_id(name)
//   ├─ cache hit (32-byte ID) ──────────────► ZoneSource::Cache
//   └─ miss / invalid entry
//        └─ search_zone_id(name)
//             ddns.example.co.uk → example.co.uk → co.uk   (never "uk")
//             ├─ usage-class error ─► abort
//             ├─ other error, empty or malformed result ─► next suffix
//             └─ valid ID ─► store in cache ─► ZoneSource::Search
// ```
//
// Candidates are tried strictly from longest to shortest, one request at a
// time: each query only happens if every longer candidate failed.

use crate::api::CloudflareApi;
use crate::traits::ZoneCache;
use crate::types::{ZoneId, validate_record_name};
use crate::{Error, Result};

/// Where a resolved zone ID came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSource {
    /// Read from the zone cache, no network call made
    Cache,
    /// Found by the iterative suffix search
    Search,
}

/// A zone ID together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedZone {
    pub zone_id: ZoneId,
    pub source: ZoneSource,
}

/// Zone name candidates for `record_name`, longest first
///
/// The full name comes first since a record may sit at a zone apex. The
/// last label alone is never a candidate: Cloudflare does not host
/// TLD-only zones. A single-label name therefore yields nothing.
pub fn suffix_candidates(record_name: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut rest = record_name.trim_end_matches('.');

    while let Some((_, parent)) = rest.split_once('.') {
        if !rest.starts_with('.') {
            candidates.push(rest);
        }
        rest = parent;
    }

    candidates
}

/// Resolve the zone owning `record_name`, preferring the cache
///
/// A cache read failure is logged and handled like a miss. A failure to
/// write the searched ID back is logged and does not fail the resolution.
pub async fn resolve_zone_id(
    api: &CloudflareApi,
    record_name: &str,
    cache: &dyn ZoneCache,
) -> Result<ResolvedZone> {
    validate_record_name(record_name)?;

    match cache.load(record_name).await {
        Ok(Some(zone_id)) => {
            tracing::debug!("Using cached zone ID {} for {}", zone_id, record_name);
            return Ok(ResolvedZone {
                zone_id,
                source: ZoneSource::Cache,
            });
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Zone cache unreadable, searching instead: {}", e),
    }

    let zone_id = search_zone_id(api, record_name).await?;
    write_back(cache, record_name, &zone_id).await;

    Ok(ResolvedZone {
        zone_id,
        source: ZoneSource::Search,
    })
}

/// Drop the cached entry for `record_name` and search again
///
/// Used when a cached zone ID turned out to be stale.
pub async fn refresh_zone_id(
    api: &CloudflareApi,
    record_name: &str,
    cache: &dyn ZoneCache,
) -> Result<ResolvedZone> {
    if let Err(e) = cache.invalidate(record_name).await {
        tracing::warn!("Failed to invalidate cached zone for {}: {}", record_name, e);
    }

    let zone_id = search_zone_id(api, record_name).await?;
    write_back(cache, record_name, &zone_id).await;

    Ok(ResolvedZone {
        zone_id,
        source: ZoneSource::Search,
    })
}

/// Find the zone owning `record_name` by probing successively shorter
/// suffixes
///
/// # Errors
///
/// - `Usage` (or another usage-class error such as `Authentication`) as
///   soon as any query reports one
/// - `ZoneNotFound` once every candidate has been tried, carrying the last
///   per-candidate failure
pub async fn search_zone_id(api: &CloudflareApi, record_name: &str) -> Result<ZoneId> {
    validate_record_name(record_name)?;

    let mut last_error = None;

    for candidate in suffix_candidates(record_name) {
        tracing::debug!("Probing zone candidate {}", candidate);

        let zones = match api.list_zones(candidate).await {
            Ok(zones) => zones,
            Err(e) if e.is_usage_class() => return Err(e),
            Err(e) => {
                tracing::debug!("Zone lookup for {} failed: {}", candidate, e);
                last_error = Some(e.to_string());
                continue;
            }
        };

        let Some(entry) = zones.into_iter().next() else {
            tracing::debug!("No zone named {}", candidate);
            continue;
        };

        match ZoneId::parse(entry.id) {
            Ok(zone_id) => {
                tracing::info!("Zone {} ({}) owns {}", candidate, zone_id, record_name);
                return Ok(zone_id);
            }
            Err(e) => {
                tracing::debug!("Ignoring malformed zone ID for {}: {}", candidate, e);
                last_error = Some(format!("malformed zone ID for {}", candidate));
            }
        }
    }

    Err(Error::ZoneNotFound {
        name: record_name.to_string(),
        last_error,
    })
}

async fn write_back(cache: &dyn ZoneCache, record_name: &str, zone_id: &ZoneId) {
    if let Err(e) = cache.store(record_name, zone_id).await {
        tracing::warn!("Failed to cache zone ID for {}: {}", record_name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_candidates_order() {
        assert_eq!(
            suffix_candidates("ddns.example.co.uk"),
            vec!["ddns.example.co.uk", "example.co.uk", "co.uk"]
        );
    }

    #[test]
    fn test_suffix_candidates_apex() {
        assert_eq!(suffix_candidates("example.com"), vec!["example.com"]);
        assert_eq!(suffix_candidates("example.com."), vec!["example.com"]);
    }

    #[test]
    fn test_suffix_candidates_single_label() {
        assert!(suffix_candidates("localhost").is_empty());
        assert!(suffix_candidates("").is_empty());
    }

    #[test]
    fn test_suffix_candidates_skip_empty_labels() {
        assert_eq!(
            suffix_candidates("a..example.com"),
            vec!["a..example.com", "example.com"]
        );
    }
}
