// # File Zone Cache
//
// File-based implementation of ZoneCache.
//
// ## Purpose
//
// Keeps the zone ID of each record name across runs, so a cron-driven
// updater only pays for the iterative zone search once.
//
// ## File Format
//
// One file per record name, named after the record, inside the cache
// directory. The file contains exactly the 32-byte zone ID: no newline, no
// delimiter, no version header.
//
// ```text
// /var/cache/cloudflare-ddns/
// ├── home.example.com      023e105f4ecef8ad9ca31a8372d0c353
// └── vpn.example.co.uk     9a7806061c88ada191ed06f989cc3dac
// ```
//
// ## Crash Safety
//
// - Atomic writes: the ID is written to `<name>.tmp`, then renamed
// - A truncated or foreign file is treated as a miss and overwritten by the
//   next successful search

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::ZONE_ID_LENGTH;
use crate::traits::ZoneCache;
use crate::types::ZoneId;
use crate::{Error, Result};

/// Zone cache backed by one file per record name
///
/// # Example
///
/// ```rust,no_run
/// use cfddns_core::cache::FileZoneCache;
/// use cfddns_core::traits::ZoneCache;
/// use cfddns_core::types::ZoneId;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = FileZoneCache::new("/var/cache/cloudflare-ddns").await?;
///
///     let zone_id = ZoneId::parse("023e105f4ecef8ad9ca31a8372d0c353")?;
///     cache.store("home.example.com", &zone_id).await?;
///
///     assert_eq!(cache.load("home.example.com").await?, Some(zone_id));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileZoneCache {
    dir: PathBuf,
}

impl FileZoneCache {
    /// Open a cache directory, creating it if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to create cache directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `record_name`
    ///
    /// Record names become file names, so anything that could escape the
    /// cache directory is rejected.
    fn entry_path(&self, record_name: &str) -> Result<PathBuf> {
        if record_name.is_empty()
            || record_name.starts_with('.')
            || record_name.contains(&['/', '\\', '\0'][..])
        {
            return Err(Error::usage(format!(
                "Record name cannot be used as a cache key: {:?}",
                record_name
            )));
        }
        Ok(self.dir.join(record_name))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

#[async_trait]
impl ZoneCache for FileZoneCache {
    async fn load(&self, record_name: &str) -> Result<Option<ZoneId>> {
        let path = self.entry_path(record_name)?;

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cached zone ID for {}", record_name);
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::cache(format!(
                    "Failed to read cache file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        if content.len() != ZONE_ID_LENGTH {
            tracing::warn!(
                "Ignoring cache file {}: {} bytes, expected {}",
                path.display(),
                content.len(),
                ZONE_ID_LENGTH
            );
            return Ok(None);
        }

        let zone_id = String::from_utf8(content)
            .ok()
            .and_then(|id| ZoneId::parse(id).ok());
        if zone_id.is_none() {
            tracing::warn!("Ignoring malformed cache file {}", path.display());
        }
        Ok(zone_id)
    }

    async fn store(&self, record_name: &str, zone_id: &ZoneId) -> Result<()> {
        let path = self.entry_path(record_name)?;
        let temp_path = Self::temp_path(&path);

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(zone_id.as_str().as_bytes())
                .await
                .map_err(|e| {
                    Error::cache(format!(
                        "Failed to write to temp file {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;

            file.flush().await.map_err(|e| {
                Error::cache(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &path).await.map_err(|e| {
            Error::cache(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Zone ID cached in {}", path.display());
        Ok(())
    }

    async fn invalidate(&self, record_name: &str) -> Result<()> {
        let path = self.entry_path(record_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::cache(format!(
                "Failed to remove cache file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ZONE: &str = "023e105f4ecef8ad9ca31a8372d0c353";

    #[tokio::test]
    async fn test_file_cache_roundtrip_across_instances() {
        let dir = tempdir().unwrap();
        let cache = FileZoneCache::new(dir.path()).await.unwrap();

        assert_eq!(cache.load("home.example.com").await.unwrap(), None);

        let zone_id = ZoneId::parse(ZONE).unwrap();
        cache.store("home.example.com", &zone_id).await.unwrap();

        // File holds exactly the 32-byte ID
        let raw = std::fs::read(dir.path().join("home.example.com")).unwrap();
        assert_eq!(raw, ZONE.as_bytes());

        let cache2 = FileZoneCache::new(dir.path()).await.unwrap();
        assert_eq!(
            cache2.load("home.example.com").await.unwrap(),
            Some(zone_id)
        );
    }

    #[tokio::test]
    async fn test_file_cache_wrong_length_is_miss() {
        let dir = tempdir().unwrap();
        let cache = FileZoneCache::new(dir.path()).await.unwrap();

        // Trailing newline makes it 33 bytes
        std::fs::write(dir.path().join("home.example.com"), format!("{ZONE}\n")).unwrap();
        assert_eq!(cache.load("home.example.com").await.unwrap(), None);

        std::fs::write(dir.path().join("home.example.com"), "short").unwrap();
        assert_eq!(cache.load("home.example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_cache_invalidate() {
        let dir = tempdir().unwrap();
        let cache = FileZoneCache::new(dir.path()).await.unwrap();
        let zone_id = ZoneId::parse(ZONE).unwrap();

        cache.store("home.example.com", &zone_id).await.unwrap();
        cache.invalidate("home.example.com").await.unwrap();
        assert_eq!(cache.load("home.example.com").await.unwrap(), None);

        // Removing a missing entry is fine
        cache.invalidate("home.example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_cache_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = FileZoneCache::new(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(cache.dir(), nested.as_path());
    }

    #[tokio::test]
    async fn test_file_cache_rejects_path_escape() {
        let dir = tempdir().unwrap();
        let cache = FileZoneCache::new(dir.path()).await.unwrap();

        assert!(matches!(
            cache.load("../etc/passwd").await,
            Err(Error::Usage(_))
        ));
        assert!(cache.load("..").await.is_err());
        assert!(cache.load("a/b.example.com").await.is_err());
    }
}
