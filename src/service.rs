//! Portfolio data service
//!
//! Owns the session's single authoritative [`Snapshot`] and drives the
//! document lifecycle against two storage tiers:
//!
//! ```text
//! load:   Remote (authoritative) → Local mirror → Default (16 empty weeks)
//! commit: Remote write with freshly read hash, then Local mirror (best effort)
//! ```
//!
//! A successfully fetched remote document always wins over local data.
//! Reads fall back tier by tier; write failures are returned to the caller
//! in a [`CommitOutcome`] and never retried.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::local::SnapshotStore;
use crate::model::{
    attachment_path, file_name_candidates, is_pdf_media_type, Activity, Snapshot, SNAPSHOT_PATH,
};
use crate::remote::RemoteDocumentClient;
use crate::types::{PortfolioError, Result};

/// Commit message used for snapshot writes
pub const SNAPSHOT_COMMIT_MESSAGE: &str = "Update portfolio weeks";

/// Which tier produced the loaded snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Remote,
    Local,
    Default,
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Remote => write!(f, "remote"),
            SnapshotSource::Local => write!(f, "local"),
            SnapshotSource::Default => write!(f, "default"),
        }
    }
}

/// Result of [`PortfolioDataService::load`]
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub source: SnapshotSource,
    pub snapshot: Snapshot,
}

/// Edit-session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing,
    Committing,
}

/// Result of a commit. The remote write failed when `error` is set.
#[derive(Debug)]
pub struct CommitOutcome {
    /// New remote hash on success
    pub content_hash: Option<String>,
    pub error: Option<PortfolioError>,
    /// Whether the local mirror was updated
    pub mirrored: bool,
}

impl CommitOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A mutation that was applied and committed
#[derive(Debug)]
pub struct MutationReceipt<T> {
    pub value: T,
    pub commit: CommitOutcome,
}

pub struct PortfolioDataService<R: RemoteDocumentClient, L: SnapshotStore> {
    remote: Arc<R>,
    local: Arc<L>,
    snapshot: Snapshot,
    /// Hash of the remote document as last seen
    content_hash: Option<String>,
    state: EditState,
}

impl<R: RemoteDocumentClient, L: SnapshotStore> PortfolioDataService<R, L> {
    /// Create a service holding the default snapshot; call [`load`](Self::load) next
    pub fn new(remote: Arc<R>, local: Arc<L>) -> Self {
        Self {
            remote,
            local,
            snapshot: Snapshot::default_weeks(),
            content_hash: None,
            state: EditState::Idle,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Resolve the current snapshot: remote, then local, then default
    pub async fn load(&mut self) -> LoadOutcome {
        let (source, snapshot) = match self.load_remote().await {
            Ok((snapshot, hash)) => {
                self.content_hash = hash;
                if let Err(e) = self.local.save(&snapshot).await {
                    warn!(error = %e, "Could not refresh local mirror after remote load");
                }
                (SnapshotSource::Remote, snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Remote snapshot unavailable, falling back to local");
                self.content_hash = None;
                match self.local.load().await {
                    Some(snapshot) => (SnapshotSource::Local, snapshot),
                    None => (SnapshotSource::Default, Snapshot::default_weeks()),
                }
            }
        };

        info!(
            source = %source,
            activities = snapshot.activity_count(),
            hash = ?self.content_hash,
            "Snapshot loaded"
        );

        self.snapshot = snapshot.clone();
        self.state = EditState::Idle;
        LoadOutcome { source, snapshot }
    }

    async fn load_remote(&self) -> Result<(Snapshot, Option<String>)> {
        let doc = self.remote.read_document(SNAPSHOT_PATH).await?;
        let snapshot = Snapshot::from_json(&doc.content)?;
        Ok((snapshot, doc.content_hash))
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Persist the owned snapshot remotely, mirroring it locally either way
    pub async fn commit(&mut self) -> CommitOutcome {
        self.state = EditState::Committing;

        let remote_result = self.write_remote().await;

        let mirrored = match self.local.save(&self.snapshot).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Local mirror failed");
                false
            }
        };

        match remote_result {
            Ok(hash) => {
                info!(hash = %hash, mirrored, "Snapshot committed");
                self.content_hash = Some(hash.clone());
                self.state = EditState::Idle;
                CommitOutcome {
                    content_hash: Some(hash),
                    error: None,
                    mirrored,
                }
            }
            Err(e) => {
                error!(error = %e, mirrored, "Snapshot commit failed");
                self.state = EditState::Editing;
                CommitOutcome {
                    content_hash: None,
                    error: Some(e),
                    mirrored,
                }
            }
        }
    }

    /// Replace the owned snapshot with an edited draft and commit it
    pub async fn commit_draft(&mut self, draft: Snapshot) -> CommitOutcome {
        self.snapshot = draft.normalized();
        self.state = EditState::Editing;
        self.commit().await
    }

    async fn write_remote(&self) -> Result<String> {
        // The hash is re-read right before writing so the write lands on the
        // current version or fails with Conflict.
        let current = match self.remote.read_document(SNAPSHOT_PATH).await {
            Ok(doc) => doc.content_hash,
            Err(PortfolioError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        debug!(hash = ?current, "Current remote hash");

        let body = self.snapshot.to_pretty_json()?;
        self.remote
            .write_document(
                SNAPSHOT_PATH,
                &body,
                SNAPSHOT_COMMIT_MESSAGE,
                current.as_deref(),
            )
            .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set a week's title and description in memory.
    ///
    /// Nothing is persisted until the next commit.
    pub fn set_week_meta(&mut self, week: u8, title: &str, description: &str) -> Result<()> {
        let target = self.snapshot.week_mut(week)?;
        target.title = title.trim().to_string();
        target.description = description.trim().to_string();
        self.state = EditState::Editing;
        Ok(())
    }

    /// Upload a PDF, append it to the week and commit.
    ///
    /// A file name already used in the week, or still stored on the remote
    /// from an earlier removal, gets a numeric suffix. The snapshot is only
    /// changed once the upload succeeded.
    pub async fn add_activity(
        &mut self,
        week: u8,
        file_name: &str,
        media_type: &str,
        content: &[u8],
    ) -> Result<MutationReceipt<Activity>> {
        if !is_pdf_media_type(media_type) {
            return Err(PortfolioError::InvalidFileType(media_type.to_string()));
        }
        validate_file_name(file_name)?;

        let stored_name = self.free_file_name(week, file_name).await?;
        if stored_name != file_name {
            info!(week, requested = file_name, stored = %stored_name, "Renamed duplicate upload");
        }

        let url = self
            .remote
            .upload_attachment(week, &stored_name, content)
            .await?;

        let activity = Activity::from_upload(&stored_name, url);
        self.snapshot.week_mut(week)?.activities.push(activity.clone());
        self.state = EditState::Editing;
        info!(week, file = %stored_name, bytes = content.len(), "Activity added");

        let commit = self.commit().await;
        Ok(MutationReceipt {
            value: activity,
            commit,
        })
    }

    /// Remove the activity at `index` and commit. The remote file is kept.
    pub async fn remove_activity(
        &mut self,
        week: u8,
        index: usize,
    ) -> Result<MutationReceipt<Activity>> {
        let target = self.snapshot.week_mut(week)?;
        let len = target.activities.len();
        if index >= len {
            return Err(PortfolioError::IndexOutOfRange { week, index, len });
        }

        let removed = target.activities.remove(index);
        self.state = EditState::Editing;
        info!(week, index, file = %removed.file_name, "Activity removed");

        let commit = self.commit().await;
        Ok(MutationReceipt {
            value: removed,
            commit,
        })
    }

    /// First candidate name that neither the week nor the remote holds.
    ///
    /// Removed activities leave their binary on the remote, and the host
    /// refuses to create a path that already exists.
    async fn free_file_name(&self, week: u8, file_name: &str) -> Result<String> {
        let current = self.snapshot.week(week)?;

        for candidate in file_name_candidates(file_name) {
            if current.has_file(&candidate) {
                continue;
            }
            match self
                .remote
                .read_document(&attachment_path(week, &candidate))
                .await
            {
                Err(PortfolioError::NotFound(_)) => return Ok(candidate),
                // A readable path, even one too large to inline, is taken
                Ok(_) | Err(PortfolioError::InvalidResponse(_)) => {
                    debug!(week, file = %candidate, "Attachment path already on remote");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PortfolioError::Internal(format!(
            "no free file name for {}",
            file_name
        )))
    }
}

fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(PortfolioError::BadRequest("file name is empty".into()));
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name == ".." {
        return Err(PortfolioError::BadRequest(format!(
            "file name must not contain path separators: {}",
            file_name
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
