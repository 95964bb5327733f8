//! In-process content-addressed store
//!
//! Mirrors the host's versioning rules: every object has a SHA-256 content
//! hash, overwriting requires the current hash and creating requires that
//! the path is free. Used by tests and by the admin tool's offline mode.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::model::attachment_path;
use crate::remote::{RemoteDocument, RemoteDocumentClient};
use crate::types::{PortfolioError, Result};

pub struct InMemoryRemote {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    commit_log: Mutex<Vec<String>>,
    offline: AtomicBool,
    fail_uploads: AtomicBool,
    /// External write applied right before the next `write_document`
    pending_interference: Mutex<Option<(String, Vec<u8>)>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::with_base_url("memory://portfolio")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
            commit_log: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            pending_interference: Mutex::new(None),
        }
    }

    /// Store bytes directly, bypassing version checks (an external writer)
    pub async fn put_raw(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let content = content.into();
        let hash = content_hash(&content);
        self.objects.write().await.insert(path.to_string(), content);
        hash
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn hash_of(&self, path: &str) -> Option<String> {
        self.objects.read().await.get(path).map(|c| content_hash(c))
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// Commit messages of accepted writes, oldest first
    pub async fn commit_messages(&self) -> Vec<String> {
        self.commit_log.lock().await.clone()
    }

    /// Make every call fail with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Simulate another writer landing between a hash read and a write
    pub async fn interfere_before_next_write(&self, path: &str, content: impl Into<Vec<u8>>) {
        *self.pending_interference.lock().await = Some((path.to_string(), content.into()));
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortfolioError::Transport("remote store is offline".into()));
        }
        Ok(())
    }

    async fn apply_interference(&self) {
        if let Some((path, content)) = self.pending_interference.lock().await.take() {
            self.put_raw(&path, content).await;
        }
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteDocumentClient for InMemoryRemote {
    async fn read_document(&self, path: &str) -> Result<RemoteDocument> {
        self.check_online()?;
        let objects = self.objects.read().await;
        let content = objects
            .get(path)
            .ok_or_else(|| PortfolioError::NotFound(path.to_string()))?;

        Ok(RemoteDocument {
            content: content.clone(),
            content_hash: Some(content_hash(content)),
        })
    }

    async fn write_document(
        &self,
        path: &str,
        content: &[u8],
        commit_message: &str,
        expected_hash: Option<&str>,
    ) -> Result<String> {
        self.check_online()?;
        self.apply_interference().await;

        let mut objects = self.objects.write().await;
        let current = objects.get(path).map(|c| content_hash(c));

        match (current.as_deref(), expected_hash) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(PortfolioError::Conflict(format!(
                    "{} does not match {}",
                    path, expected
                )));
            }
            (Some(_), None) => {
                return Err(PortfolioError::Conflict(format!(
                    "{} already exists and \"sha\" wasn't supplied",
                    path
                )));
            }
            (None, Some(expected)) => {
                return Err(PortfolioError::Conflict(format!(
                    "{} does not exist but sha {} was supplied",
                    path, expected
                )));
            }
            _ => {}
        }

        let hash = content_hash(content);
        objects.insert(path.to_string(), content.to_vec());
        drop(objects);

        self.commit_log.lock().await.push(commit_message.to_string());
        debug!(path = path, hash = %hash, "In-memory write accepted");
        Ok(hash)
    }

    async fn upload_attachment(
        &self,
        week: u8,
        file_name: &str,
        content: &[u8],
    ) -> Result<String> {
        self.check_online()?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortfolioError::Transport("upload rejected".into()));
        }

        let path = attachment_path(week, file_name);
        {
            let mut objects = self.objects.write().await;
            if objects.contains_key(&path) {
                return Err(PortfolioError::Conflict(format!(
                    "{} already exists and \"sha\" wasn't supplied",
                    path
                )));
            }
            objects.insert(path.clone(), content.to_vec());
        }
        self.commit_log
            .lock()
            .await
            .push(format!("Add {} to week {}", file_name, week));

        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), path))
    }
}

/// Hex SHA-256 of the stored bytes
fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let remote = InMemoryRemote::new();
        let err = remote.read_document("data/snapshot.json").await.unwrap_err();
        assert!(matches!(err, PortfolioError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_then_update_with_hash() {
        let remote = InMemoryRemote::new();
        let h1 = remote
            .write_document("doc.json", b"one", "create", None)
            .await
            .unwrap();
        let h2 = remote
            .write_document("doc.json", b"two", "update", Some(&h1))
            .await
            .unwrap();

        assert_ne!(h1, h2);
        let doc = remote.read_document("doc.json").await.unwrap();
        assert_eq!(doc.content, b"two");
        assert_eq!(doc.content_hash.as_deref(), Some(h2.as_str()));
        assert_eq!(remote.commit_messages().await, vec!["create", "update"]);
    }

    #[tokio::test]
    async fn test_stale_hash_conflicts_and_keeps_content() {
        let remote = InMemoryRemote::new();
        let stale = remote.put_raw("doc.json", b"v1".to_vec()).await;
        remote.put_raw("doc.json", b"v2".to_vec()).await;

        let err = remote
            .write_document("doc.json", b"mine", "update", Some(&stale))
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Conflict(_)));
        assert_eq!(remote.get("doc.json").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_create_over_existing_conflicts() {
        let remote = InMemoryRemote::new();
        remote.put_raw("doc.json", b"v1".to_vec()).await;

        let err = remote
            .write_document("doc.json", b"mine", "create", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_upload_returns_url_and_refuses_existing_path() {
        let remote = InMemoryRemote::with_base_url("https://files.test/");
        let url = remote.upload_attachment(3, "lab.pdf", b"a").await.unwrap();
        assert_eq!(url, "https://files.test/weeks/week-3/lab.pdf");

        let err = remote.upload_attachment(3, "lab.pdf", b"b").await.unwrap_err();
        assert!(matches!(err, PortfolioError::Conflict(_)));
        assert_eq!(remote.get("weeks/week-3/lab.pdf").await.unwrap(), b"a");
        assert_eq!(remote.commit_messages().await, vec!["Add lab.pdf to week 3"]);
    }

    #[tokio::test]
    async fn test_offline_fails_with_transport() {
        let remote = InMemoryRemote::new();
        remote.set_offline(true);
        let err = remote.read_document("doc.json").await.unwrap_err();
        assert!(matches!(err, PortfolioError::Transport(_)));
    }
}
