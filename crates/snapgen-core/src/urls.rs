//! Source and renderer URLs for a commit
//!
//! Every URL is a pure function of the repository, the commit and the
//! configured `src_file`; nothing here touches the network.

use crate::config::Endpoints;
use crate::types::{CommitId, DocType, RepoName};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, as `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URLs derived for one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    /// `{raw_content}/{repo}/{commit}/{src_file}`
    pub raw: String,
    /// `{mirror}/{repo}/{commit}/{src_file}`
    pub mirror: String,
}

impl SourceUrls {
    /// Build source URLs against the given endpoints
    #[must_use]
    pub fn build(endpoints: &Endpoints, repo: &RepoName, commit: &CommitId, src_file: &str) -> Self {
        let file = format!("{repo}/{commit}/{}", src_file.trim_start_matches('/'));
        Self {
            raw: format!("{}/{file}", endpoints.raw_content.trim_end_matches('/')),
            mirror: format!("{}/{file}", endpoints.mirror.trim_end_matches('/')),
        }
    }

    /// Renderer URL for the toolchain
    ///
    /// Bikeshed renders the raw source; ReSpec renders the mirrored copy.
    #[must_use]
    pub fn renderer_url(&self, endpoints: &Endpoints, doc_type: DocType) -> String {
        match doc_type {
            DocType::Bikeshed => bikeshed_url(&endpoints.bikeshed, &self.raw),
            DocType::Respec => respec_url(&endpoints.respec, &self.mirror),
        }
    }
}

/// Bikeshed API URL rendering `source`
#[must_use]
pub fn bikeshed_url(endpoint: &str, source: &str) -> String {
    format!("{endpoint}?url={}", encode(source))
}

/// Spec-generator URL rendering `source` with ReSpec
#[must_use]
pub fn respec_url(endpoint: &str, source: &str) -> String {
    format!("{endpoint}?type=respec&url={}", encode(source))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}
