//! Remote document access
//!
//! [`RemoteDocumentClient`] is the seam between the data service and the
//! versioned content host. Every object is addressed by path and carries an
//! opaque content hash; overwriting requires the current hash.
//!
//! Implementations:
//! - [`ProxyClient`] - HTTP client for the trusted proxy endpoint
//! - [`InMemoryRemote`] - in-process store with the same hash semantics

pub mod memory;
pub mod proxy_client;

pub use memory::InMemoryRemote;
pub use proxy_client::{ProxyClient, ProxyClientConfig};

use crate::types::Result;

/// Raw bytes and version token of a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub content: Vec<u8>,
    pub content_hash: Option<String>,
}

/// Read/write access to the remote content-addressed store.
///
/// Every call is a single attempt; callers decide how to fall back.
#[async_trait::async_trait]
pub trait RemoteDocumentClient: Send + Sync {
    /// Read the object at `path`. Fails with `NotFound` when absent.
    async fn read_document(&self, path: &str) -> Result<RemoteDocument>;

    /// Create or overwrite the object at `path`, returning the new hash.
    ///
    /// With `content_hash` the current version must match; without it the
    /// path must not exist. Either mismatch fails with `Conflict`.
    async fn write_document(
        &self,
        path: &str,
        content: &[u8],
        commit_message: &str,
        content_hash: Option<&str>,
    ) -> Result<String>;

    /// Store an attachment under `weeks/week-{n}/{file_name}` and return a
    /// public download URL. No existence check is made here.
    async fn upload_attachment(&self, week: u8, file_name: &str, content: &[u8])
        -> Result<String>;
}
