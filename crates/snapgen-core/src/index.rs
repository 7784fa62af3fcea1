//! Snapshot storage
//!
//! Lays out the snapshot tree under a configured root:
//!
//! ```text
//! {root}/{owner}/{name}/snapshots.json
//! {root}/{owner}/{name}/{commit}.html
//! ```
//!
//! Index updates are serialized per repository: the read-modify-write runs
//! under a repository lock and the new index replaces the old one through a
//! rename, so concurrent events for one repository never lose records.
//!
//! Snapshots are fetched into a unique staging file next to their final path
//! and published with a rename, so two fetches of one commit never write the
//! same file.

use crate::error::IndexError;
use crate::types::{CommitId, RepoName, SnapshotIndex, SnapshotRecord};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

const INDEX_FILE: &str = "snapshots.json";

/// Snapshot tree rooted at `{public_dir}/snapshot`
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    locks: DashMap<RepoName, Arc<Mutex<()>>>,
    staged: AtomicU64,
}

impl SnapshotStore {
    /// Create store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
            staged: AtomicU64::new(0),
        }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one repository's snapshots
    #[must_use]
    pub fn repo_dir(&self, repo: &RepoName) -> PathBuf {
        self.root.join(repo.owner()).join(repo.name())
    }

    /// Path of a repository's index
    #[must_use]
    pub fn index_path(&self, repo: &RepoName) -> PathBuf {
        self.repo_dir(repo).join(INDEX_FILE)
    }

    /// Path of a rendered snapshot
    #[must_use]
    pub fn snapshot_path(&self, repo: &RepoName, commit: &CommitId) -> PathBuf {
        self.repo_dir(repo).join(format!("{commit}.html"))
    }

    /// Fresh staging path for a fetch of `commit`
    ///
    /// Unique per call, in the same directory as the final snapshot.
    #[must_use]
    pub fn staging_path(&self, repo: &RepoName, commit: &CommitId) -> PathBuf {
        let n = self.staged.fetch_add(1, Ordering::Relaxed);
        self.repo_dir(repo).join(format!(".{commit}.html.{n}.part"))
    }

    /// Move a staged snapshot over its final path
    ///
    /// On failure the staged file is removed (best effort).
    ///
    /// # Errors
    /// Returns the IO error of the rename.
    pub async fn publish(&self, staged: &Path, dest: &Path) -> std::io::Result<()> {
        let result = tokio::fs::rename(staged, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(staged).await;
        }
        result
    }

    /// Create the repository directory if needed
    ///
    /// # Errors
    /// Returns the IO error of `create_dir_all`.
    pub async fn ensure_repo_dir(&self, repo: &RepoName) -> std::io::Result<PathBuf> {
        let dir = self.repo_dir(repo);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Read a repository's index; a missing file is an empty index
    ///
    /// # Errors
    /// - `IndexError::Io` if the file exists but cannot be read
    /// - `IndexError::Corrupt` if it is not a valid index
    pub async fn load(&self, repo: &RepoName) -> Result<SnapshotIndex, IndexError> {
        read_index(&self.index_path(repo)).await
    }

    /// Append a record to a repository's index
    ///
    /// Creates the index (and its directory) on first use. Returns the number
    /// of records after the append.
    ///
    /// # Errors
    /// Any read, parse or write failure; the index on disk is left as it was.
    pub async fn append(&self, repo: &RepoName, record: SnapshotRecord) -> Result<usize, IndexError> {
        let lock = self.lock_for(repo);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(repo, record).await
        };
        drop(lock);
        self.locks
            .remove_if(repo, |_, idle| Arc::strong_count(idle) == 1);
        result
    }

    async fn append_locked(&self, repo: &RepoName, record: SnapshotRecord) -> Result<usize, IndexError> {
        let dir = self
            .ensure_repo_dir(repo)
            .await
            .map_err(|e| IndexError::io_error(self.repo_dir(repo), e))?;
        let path = dir.join(INDEX_FILE);

        let mut index = read_index(&path).await?;
        index.push(record);
        let json = serde_json::to_vec(&index)?;
        write_replace(&path, &json).await?;

        tracing::debug!(repository = %repo, records = index.len(), "snapshot index updated");
        Ok(index.len())
    }

    /// Held while an append is running or waiting; removed once idle.
    fn lock_for(&self, repo: &RepoName) -> Arc<Mutex<()>> {
        self.locks.entry(repo.clone()).or_default().clone()
    }
}

async fn read_index(path: &Path) -> Result<SnapshotIndex, IndexError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| IndexError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SnapshotIndex::default()),
        Err(e) => Err(IndexError::io_error(path, e)),
    }
}

async fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| IndexError::io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| IndexError::io_error(path, e))
}
