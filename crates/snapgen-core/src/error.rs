//! Error types for snapgen
//!
//! One error enum per component:
//! - Inbound payload validation
//! - Repository config lookup
//! - Renderer fetch
//! - Snapshot index persistence
//!
//! `PipelineError` wraps them for a whole snapshot run.

use std::path::PathBuf;

/// Inbound push payload errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Body is not a push event
    #[error("malformed push payload: {0}")]
    Malformed(String),

    /// Repository name is not `owner/name`
    #[error("invalid repository name: '{0}'")]
    InvalidRepository(String),

    /// Commit id contains characters other than ASCII alphanumerics
    #[error("invalid commit id: '{0}'")]
    InvalidCommitId(String),
}

/// Errors while resolving a repository's preview config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Request to the contents API failed
    #[error("config request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Contents API answered with an error status other than 404
    #[error("contents API returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// `message` of the error body, or the body itself
        message: String,
    },

    /// Contents API answered with something other than JSON
    #[error("contents API returned invalid JSON: {0}")]
    InvalidResponse(String),

    /// `content` field is not valid base64
    #[error("config content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Decoded config is not a valid `.pr-preview.json`
    #[error("invalid config file: {0}")]
    Parse(String),
}

/// Errors while fetching a rendered snapshot
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Request to the renderer failed or the body stream broke
    #[error("renderer request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Writing the destination file failed
    #[error("io error writing {path}: {source}")]
    Io {
        /// Destination file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while reading or writing a snapshot index
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Filesystem access failed
    #[error("io error on {path}: {source}")]
    Io {
        /// Index file or directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Existing index is not valid JSON
    #[error("corrupt snapshot index {path}: {source}")]
    Corrupt {
        /// Index file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Index could not be serialized
    #[error("failed to serialize snapshot index: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IndexError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a snapshot run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Config lookup failed
    #[error("config lookup failed: {0}")]
    Config(#[from] ConfigError),

    /// Config names an unsupported toolchain
    #[error("\"type\" should be \"bikeshed\" or \"respec\", got \"{0}\"")]
    UnknownDocType(String),

    /// Renderer fetch failed
    #[error("snapshot fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Index update failed
    #[error("snapshot index update failed: {0}")]
    Index(#[from] IndexError),

    /// Preparing the snapshot directory failed
    #[error("io error on {path}: {source}")]
    Io {
        /// Directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Pipeline stage the error came from, for structured logs
    #[inline]
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::UnknownDocType(_) => "doc_type",
            Self::Fetch(_) => "render",
            Self::Index(_) => "index",
            Self::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_error_display() {
        let err = PayloadError::InvalidRepository("../x".to_string());
        assert!(err.to_string().contains("invalid repository name"));
    }

    #[test]
    fn unknown_doc_type_names_value() {
        let err = PipelineError::UnknownDocType("wattsi".to_string());
        assert!(err.to_string().contains("wattsi"));
        assert_eq!(err.stage(), "doc_type");
    }

    #[test]
    fn stages_follow_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: PipelineError = IndexError::io_error("snapshots.json", io).into();
        assert_eq!(err.stage(), "index");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: PipelineError = FetchError::io_error("abc.html", io).into();
        assert_eq!(err.stage(), "render");

        let err: PipelineError = ConfigError::Parse("missing src_file".into()).into();
        assert_eq!(err.stage(), "config");

        let err: PipelineError = ConfigError::Status {
            status: 403,
            message: "API rate limit exceeded".into(),
        }
        .into();
        assert_eq!(err.stage(), "config");
        assert!(err.to_string().contains("HTTP 403: API rate limit exceeded"));
    }
}
