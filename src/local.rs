//! Local snapshot mirror
//!
//! The offline fallback tier. Values live under a fixed key; writes always
//! overwrite, last write wins.

use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::Snapshot;
use crate::types::{PortfolioError, Result};

/// Fixed key the snapshot is stored under
pub const SNAPSHOT_KEY: &str = "portfolio_data";

/// Local persistence for the snapshot
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stored snapshot, or `None` when absent or undecodable
    async fn load(&self) -> Option<Snapshot>;

    /// Overwrite the stored snapshot
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot store backed by one JSON file per key in a directory
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Option<Snapshot> {
        let path = self.key_path(SNAPSHOT_KEY);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local snapshot unreadable");
                return None;
            }
        };

        match Snapshot::from_json(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local snapshot corrupt, ignoring");
                None
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        let path = self.key_path(SNAPSHOT_KEY);
        let tmp = self.key_path(&format!("{}.tmp", SNAPSHOT_KEY));

        let unavailable = |e: std::io::Error| {
            PortfolioError::StorageUnavailable(format!("{}: {}", self.dir.display(), e))
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(unavailable)?;
        tokio::fs::write(&tmp, &bytes).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &path).await.map_err(unavailable)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Local snapshot saved");
        Ok(())
    }
}

/// In-process snapshot store
#[derive(Default)]
pub struct MemorySnapshotStore {
    value: Mutex<Option<String>>,
    unavailable: std::sync::atomic::AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text under the snapshot key (for corrupt-data tests)
    pub async fn put_raw(&self, raw: impl Into<String>) {
        *self.value.lock().await = Some(raw.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Option<Snapshot> {
        let value = self.value.lock().await;
        let raw = value.as_deref()?;
        Snapshot::from_json(raw.as_bytes()).ok()
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PortfolioError::StorageUnavailable(
                "memory store disabled".into(),
            ));
        }
        *self.value.lock().await = Some(serde_json::to_string(snapshot)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Activity;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default_weeks();
        let week = snapshot.week_mut(2).unwrap();
        week.title = "Normalization".into();
        week.description = "1NF to BCNF".into();
        week.activities
            .push(Activity::from_upload("forms.pdf", "https://files.test/forms.pdf"));
        snapshot
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested"));

        assert!(store.load().await.is_none());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await, Some(sample()));

        // Saving again is idempotent
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_is_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("portfolio_data.json"), "{not json").unwrap();

        let store = FileSnapshotStore::new(dir.path());
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_file_store_unavailable_medium() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let store = FileSnapshotStore::new(&blocker);
        let err = store.save(&sample()).await.unwrap_err();
        assert!(matches!(err, PortfolioError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().await.is_none());

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await, Some(sample()));

        store.put_raw("garbage").await;
        assert!(store.load().await.is_none());

        store.set_unavailable(true);
        assert!(matches!(
            store.save(&sample()).await,
            Err(PortfolioError::StorageUnavailable(_))
        ));
    }
}
