//! Core types for snapgen
//!
//! Defines the data that flows through a snapshot run:
//! - Push events and commits as delivered by the webhook
//! - Validated repository names and commit ids
//! - Per-repository preview configuration
//! - Snapshot records and the per-repository snapshot index

use crate::error::PayloadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Repository full name (`owner/name`)
///
/// Both parts are restricted to ASCII alphanumerics, `-`, `_` and `.` so the
/// name can be joined onto the public directory without escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName {
    owner: String,
    name: String,
}

impl RepoName {
    /// Repository owner (user or organization)
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name without the owner
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full name as `owner/name`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for RepoName {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| PayloadError::InvalidRepository(s.to_string()))?;

        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(PayloadError::InvalidRepository(s.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for RepoName {
    type Error = PayloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoName> for String {
    fn from(value: RepoName) -> Self {
        value.full_name()
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Commit id (hex SHA as sent by GitHub)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CommitId {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PayloadError::InvalidCommitId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for CommitId {
    type Error = PayloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommitId> for String {
    fn from(value: CommitId) -> Self {
        value.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single commit of a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA
    pub id: CommitId,
    /// Commit message
    #[serde(default)]
    pub message: String,
    /// Commit timestamp as sent by GitHub (ISO 8601)
    #[serde(default)]
    pub timestamp: String,
    /// Commit page URL
    #[serde(default)]
    pub url: String,
}

/// Repository block of a push payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: RepoName,
}

/// Push notification as delivered to `POST /payload`
///
/// Only the fields snapgen reads are modelled; everything else GitHub sends
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Repository the push went to
    pub repository: Repository,
    /// Pushed commits, oldest first
    pub commits: Vec<Commit>,
}

impl PushEvent {
    /// Parse a raw webhook body
    ///
    /// # Errors
    /// - `PayloadError::Malformed` for invalid JSON, missing fields, or
    ///   repository names and commit ids that fail validation
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(body).map_err(|e| PayloadError::Malformed(e.to_string()))
    }

    /// Repository full name
    #[inline]
    #[must_use]
    pub fn repo(&self) -> &RepoName {
        &self.repository.full_name
    }

    /// The commit a snapshot is taken for
    ///
    /// Only the first commit of a push is snapshotted.
    #[inline]
    #[must_use]
    pub fn first_commit(&self) -> Option<&Commit> {
        self.commits.first()
    }
}

/// Documentation toolchain a repository uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// Bikeshed source, rendered by the CSSWG Bikeshed API
    Bikeshed,
    /// ReSpec source, rendered by the W3C spec-generator
    Respec,
}

impl DocType {
    /// Name as it appears in `.pr-preview.json`
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bikeshed => "bikeshed",
            Self::Respec => "respec",
        }
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bikeshed" => Ok(Self::Bikeshed),
            "respec" => Ok(Self::Respec),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository preview configuration (`.pr-preview.json`)
///
/// `type` is kept verbatim so an unsupported toolchain can be reported by
/// name; use [`RepoConfig::doc_type`] to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Toolchain name (`bikeshed` or `respec`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Path of the spec source inside the repository
    pub src_file: String,
}

impl RepoConfig {
    /// Create config for a known toolchain
    #[must_use]
    pub fn new(doc_type: DocType, src_file: impl Into<String>) -> Self {
        Self {
            kind: doc_type.as_str().to_string(),
            src_file: src_file.into(),
        }
    }

    /// Interpret the `type` field
    ///
    /// # Errors
    /// Returns the raw value when it names neither `bikeshed` nor `respec`.
    pub fn doc_type(&self) -> Result<DocType, String> {
        self.kind.parse()
    }
}

/// One entry of a snapshot index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Commit SHA
    pub id: String,
    /// Commit message
    #[serde(default)]
    pub message: String,
    /// Commit timestamp
    #[serde(default)]
    pub timestamp: String,
    /// Commit URL
    #[serde(default)]
    pub url: String,
}

impl From<&Commit> for SnapshotRecord {
    fn from(commit: &Commit) -> Self {
        Self {
            id: commit.id.to_string(),
            message: commit.message.clone(),
            timestamp: commit.timestamp.clone(),
            url: commit.url.clone(),
        }
    }
}

/// Per-repository ledger of snapshots (`snapshots.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndex {
    /// Records in insertion order
    pub snapshots: Vec<SnapshotRecord>,
}

impl SnapshotIndex {
    /// Append a record
    #[inline]
    pub fn push(&mut self, record: SnapshotRecord) {
        self.snapshots.push(record);
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the index has no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
