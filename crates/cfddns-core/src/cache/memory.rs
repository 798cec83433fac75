// # Memory Zone Cache
//
// In-memory implementation of ZoneCache.
//
// All entries are lost when the process exits, so every run performs the
// iterative zone search once. Useful for tests, one-shot containers and
// `cache = "memory"` setups.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Result;
use crate::traits::ZoneCache;
use crate::types::ZoneId;

/// In-memory zone cache
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryZoneCache {
    inner: Arc<RwLock<HashMap<String, ZoneId>>>,
}

impl MemoryZoneCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached record names
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ZoneCache for MemoryZoneCache {
    async fn load(&self, record_name: &str) -> Result<Option<ZoneId>> {
        let guard = self.inner.read().await;
        Ok(guard.get(record_name).cloned())
    }

    async fn store(&self, record_name: &str, zone_id: &ZoneId) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.insert(record_name.to_string(), zone_id.clone());
        Ok(())
    }

    async fn invalidate(&self, record_name: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.remove(record_name);
        Ok(())
    }
}
