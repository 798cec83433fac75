// # Zone Cache Trait
//
// Persists the zone ID that owns a record name, so the expensive iterative
// search only runs when the mapping is unknown.
//
// ## Semantics
//
// - Keyed by record name; the value is exactly one 32-character zone ID.
// - Entries never expire by time. They are replaced by `store` or removed
//   by `invalidate`.
// - An entry of the wrong length or shape is a miss (`Ok(None)`), not an
//   error.
// - Read at most once and written at most once per run. Concurrent writers
//   from different processes are last-writer-wins.
//
// ## Implementations
//
// - `FileZoneCache`: one file per record name
// - `MemoryZoneCache`: process-lifetime map

use async_trait::async_trait;

use crate::types::ZoneId;

/// Trait for zone ID cache implementations
#[async_trait]
pub trait ZoneCache: Send + Sync {
    /// Get the cached zone ID for a record name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ZoneId))`: A valid cached zone ID
    /// - `Ok(None)`: Cache miss (absent or invalid entry)
    /// - `Err(Error)`: Storage error
    async fn load(&self, record_name: &str) -> crate::Result<Option<ZoneId>>;

    /// Store the zone ID for a record name, replacing any previous entry
    async fn store(&self, record_name: &str, zone_id: &ZoneId) -> crate::Result<()>;

    /// Remove the entry for a record name (no-op if absent)
    async fn invalidate(&self, record_name: &str) -> crate::Result<()>;
}
