//! Snapshot pipeline
//!
//! One push event runs these steps in order, stopping at the first failure:
//!
//! ```text
//! config lookup → doc type → URLs → repo dir → renderer fetch → index append
//! ```
//!
//! The renderer body goes to a staging file that is renamed over
//! `{commit}.html` once complete, and the index is only appended after that,
//! so every record points at a fully written snapshot.

use crate::config::{Endpoints, SnapgenConfig};
use crate::error::PipelineError;
use crate::fetcher::{http_client, HttpSnapshotFetcher, SnapshotFetcher};
use crate::index::SnapshotStore;
use crate::resolver::{ConfigSource, GitHubConfigResolver};
use crate::types::{CommitId, DocType, PushEvent, RepoName, SnapshotRecord};
use crate::urls::SourceUrls;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A snapshot that was written and indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Repository
    pub repository: RepoName,
    /// Snapshotted commit
    pub commit: CommitId,
    /// Toolchain used
    pub doc_type: DocType,
    /// Renderer request URL
    pub renderer_url: String,
    /// Written HTML file
    pub path: PathBuf,
    /// Renderer HTTP status
    pub status: u16,
    /// Bytes written
    pub bytes: u64,
    /// Records in the index after the append
    pub index_len: usize,
}

/// How a run ended when nothing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Snapshot written and indexed
    Snapshotted(Snapshot),
    /// Repository has no preview config
    NoConfig,
    /// Push carried no commits
    NoCommits,
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshotted(s) => write!(f, "snapshotted {} at {}", s.commit, s.path.display()),
            Self::NoConfig => f.write_str("skipped: no repository config"),
            Self::NoCommits => f.write_str("skipped: push has no commits"),
        }
    }
}

/// Drives a push event through config lookup, rendering and indexing
pub struct SnapshotPipeline {
    config_source: Arc<dyn ConfigSource>,
    fetcher: Arc<dyn SnapshotFetcher>,
    store: Arc<SnapshotStore>,
    endpoints: Endpoints,
}

impl fmt::Debug for SnapshotPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPipeline")
            .field("store", &self.store)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl SnapshotPipeline {
    /// Create pipeline from its parts
    #[must_use]
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        fetcher: Arc<dyn SnapshotFetcher>,
        store: Arc<SnapshotStore>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            config_source,
            fetcher,
            store,
            endpoints,
        }
    }

    /// Create pipeline talking to the configured services
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn from_config(config: &SnapgenConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config)?;
        Ok(Self::new(
            Arc::new(GitHubConfigResolver::new(client.clone(), config)),
            Arc::new(HttpSnapshotFetcher::new(client)),
            Arc::new(SnapshotStore::new(config.snapshot_root())),
            config.endpoints.clone(),
        ))
    }

    /// Snapshot store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run the pipeline for one push
    ///
    /// # Errors
    /// The first failing step; later steps do not run.
    pub async fn run(&self, event: &PushEvent) -> Result<PipelineOutcome, PipelineError> {
        let repo = event.repo();
        let Some(commit) = event.first_commit() else {
            return Ok(PipelineOutcome::NoCommits);
        };
        if event.commits.len() > 1 {
            tracing::info!(
                repository = %repo,
                ignored = event.commits.len() - 1,
                "only the first commit of a push is snapshotted"
            );
        }

        let Some(config) = self.config_source.fetch_config(repo).await? else {
            return Ok(PipelineOutcome::NoConfig);
        };
        tracing::info!(repository = %repo, doc_type = %config.kind, src_file = %config.src_file, "found repository config");

        let doc_type = config.doc_type().map_err(PipelineError::UnknownDocType)?;
        let urls = SourceUrls::build(&self.endpoints, repo, &commit.id, &config.src_file);
        let renderer_url = urls.renderer_url(&self.endpoints, doc_type);
        tracing::info!(repository = %repo, commit = %commit.id, %renderer_url, "requesting snapshot");

        self.store
            .ensure_repo_dir(repo)
            .await
            .map_err(|source| PipelineError::Io {
                path: self.store.repo_dir(repo),
                source,
            })?;

        let dest = self.store.snapshot_path(repo, &commit.id);
        let staged = self.store.staging_path(repo, &commit.id);
        let report = self.fetcher.fetch_to(&renderer_url, &staged).await?;
        self.store
            .publish(&staged, &dest)
            .await
            .map_err(|source| PipelineError::Io {
                path: dest.clone(),
                source,
            })?;
        let index_len = self.store.append(repo, SnapshotRecord::from(commit)).await?;

        Ok(PipelineOutcome::Snapshotted(Snapshot {
            repository: repo.clone(),
            commit: commit.id.clone(),
            doc_type,
            renderer_url,
            path: dest,
            status: report.status,
            bytes: report.bytes,
            index_len,
        }))
    }
}
