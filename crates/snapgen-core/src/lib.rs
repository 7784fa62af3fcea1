//! Snapgen Core - commit snapshots for W3C specification repositories
//!
//! For each push to a repository that carries a `.pr-preview.json` config,
//! snapgen renders the pushed spec source with the matching external
//! renderer and keeps the HTML plus a per-repository index of snapshots.
//!
//! # Pipeline
//!
//! ```text
//! PushEvent → ConfigSource → SourceUrls → SnapshotFetcher → SnapshotStore
//!                (GitHub)      (pure)      (Bikeshed/ReSpec)   (snapshots.json)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use snapgen_core::{PushEvent, SnapgenConfig, SnapshotPipeline};
//!
//! # async fn example(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SnapgenConfig::new().with_public_dir("/srv/public");
//! let pipeline = SnapshotPipeline::from_config(&config)?;
//!
//! let event = PushEvent::from_slice(body)?;
//! let outcome = pipeline.run(&event).await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod pipeline;
pub mod resolver;
pub mod types;
pub mod urls;

// Re-exports for convenience
pub use config::{Endpoints, LoadError, SnapgenConfig};
pub use error::{ConfigError, FetchError, IndexError, PayloadError, PipelineError};
pub use fetcher::{http_client, FetchReport, HttpSnapshotFetcher, SnapshotFetcher};
pub use index::SnapshotStore;
pub use pipeline::{PipelineOutcome, Snapshot, SnapshotPipeline};
pub use resolver::{decode_config, ConfigSource, GitHubConfigResolver};
pub use types::{
    Commit, CommitId, DocType, PushEvent, RepoConfig, RepoName, Repository, SnapshotIndex,
    SnapshotRecord,
};
pub use urls::SourceUrls;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
