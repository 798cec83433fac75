// # Zone Cache Implementations
//
// This module provides implementations of the ZoneCache trait for
// different persistence strategies.

pub mod file;
pub mod memory;

use std::sync::Arc;

pub use file::FileZoneCache;
pub use memory::MemoryZoneCache;

use crate::Result;
use crate::config::CacheConfig;
use crate::traits::ZoneCache;

/// Open the zone cache selected by `config`
pub async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn ZoneCache>> {
    match config {
        CacheConfig::File { dir } => Ok(Arc::new(FileZoneCache::new(dir).await?)),
        CacheConfig::Memory => Ok(Arc::new(MemoryZoneCache::new())),
    }
}
