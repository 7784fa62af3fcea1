//! Repository config lookup
//!
//! The preview config lives in the repository itself and is read through the
//! GitHub contents API, which returns the file base64-encoded in a JSON
//! envelope. A 404 is not an error: the repository simply has not opted in.
//! Any other error status (bad token, rate limit, outage) is.

use crate::config::SnapgenConfig;
use crate::error::ConfigError;
use crate::types::{RepoConfig, RepoName};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;

/// Source of per-repository preview configs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the config for `repo`
    ///
    /// Returns `Ok(None)` when the repository has no config file.
    async fn fetch_config(&self, repo: &RepoName) -> Result<Option<RepoConfig>, ConfigError>;
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Reads `.pr-preview.json` through the GitHub contents API
#[derive(Debug, Clone)]
pub struct GitHubConfigResolver {
    client: reqwest::Client,
    api_base: String,
    config_file: String,
    token: Option<String>,
}

impl GitHubConfigResolver {
    /// Create resolver with an existing client
    #[must_use]
    pub fn new(client: reqwest::Client, config: &SnapgenConfig) -> Self {
        Self {
            client,
            api_base: config.endpoints.github_api.trim_end_matches('/').to_string(),
            config_file: config.endpoints.config_file.clone(),
            token: config.github_token.clone(),
        }
    }

    /// Contents API URL for the config file of `repo`
    #[must_use]
    pub fn contents_url(&self, repo: &RepoName) -> String {
        format!("{}/repos/{repo}/contents/{}", self.api_base, self.config_file)
    }
}

#[async_trait]
impl ConfigSource for GitHubConfigResolver {
    async fn fetch_config(&self, repo: &RepoName) -> Result<Option<RepoConfig>, ConfigError> {
        let url = self.contents_url(repo);
        tracing::debug!(repository = %repo, %url, "fetching repository config");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(repository = %repo, "no config file");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ConfigError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let envelope: ContentsResponse = serde_json::from_slice(&body)
            .map_err(|e| ConfigError::InvalidResponse(format!("HTTP {status}: {e}")))?;

        match envelope.content.filter(|c| !c.is_empty()) {
            Some(content) => decode_config(&content).map(Some),
            None => {
                tracing::warn!(repository = %repo, %status, "config file has no content");
                Ok(None)
            }
        }
    }
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(e) => e.message,
        Err(_) => String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}

/// Decode the base64 `content` field of a contents API response
///
/// GitHub wraps the base64 payload at 60 columns, so whitespace is dropped
/// before decoding.
///
/// # Errors
/// - `ConfigError::Decode` if the content is not base64
/// - `ConfigError::Parse` if the decoded file is not a valid config
pub fn decode_config(content: &str) -> Result<RepoConfig, ConfigError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocType;
    use pretty_assertions::assert_eq;
    use snapgen_test_utils::{encode_config, FakeGitHub};

    fn resolver_for(api: &str) -> GitHubConfigResolver {
        let mut config = SnapgenConfig::new();
        config.endpoints.github_api = api.to_string();
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap();
        GitHubConfigResolver::new(client, &config)
    }

    #[test]
    fn decode_wrapped_content() {
        let encoded = STANDARD.encode(r#"{"type":"bikeshed","src_file":"Overview.bs"}"#);
        let (head, tail) = encoded.split_at(20);
        let wrapped = format!("{head}\n{tail}\n");

        let config = decode_config(&wrapped).unwrap();
        assert_eq!(config, RepoConfig::new(DocType::Bikeshed, "Overview.bs"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_config("!!!"), Err(ConfigError::Decode(_))));

        let not_config = STANDARD.encode(r#"{"type":"respec"}"#);
        assert!(matches!(decode_config(&not_config), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn contents_url_shape() {
        let resolver = resolver_for("https://api.github.com/");
        let repo: RepoName = "w3c/payment-request".parse().unwrap();
        assert_eq!(
            resolver.contents_url(&repo),
            "https://api.github.com/repos/w3c/payment-request/contents/.pr-preview.json"
        );
    }

    #[tokio::test]
    async fn fetches_config_from_contents_api() {
        let github = FakeGitHub::new()
            .with_content("w3c/webauthn", encode_config(r#"{"type":"bikeshed","src_file":"index.bs"}"#))
            .spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/webauthn".parse().unwrap();
        let config = resolver.fetch_config(&repo).await.unwrap();
        assert_eq!(config, Some(RepoConfig::new(DocType::Bikeshed, "index.bs")));
        assert_eq!(github.user_agents(), vec!["W3C Commit Snapshot Generator".to_string()]);
    }

    #[tokio::test]
    async fn missing_config_is_none() {
        let github = FakeGitHub::new().spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/no-config".parse().unwrap();
        assert_eq!(resolver.fetch_config(&repo).await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_json_success_is_invalid_response() {
        let github = FakeGitHub::new()
            .with_response("w3c/broken", 200, "<html>ok</html>")
            .spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/broken".parse().unwrap();
        let err = resolver.fetch_config(&repo).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn error_status_with_json_body_is_not_missing_config() {
        let github = FakeGitHub::new()
            .with_raw_body("w3c/limited", r#"{"message":"API rate limit exceeded"}"#)
            .spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/limited".parse().unwrap();
        let err = resolver.fetch_config(&repo).await.unwrap_err();
        match err {
            ConfigError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "API rate limit exceeded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_credentials_are_reported() {
        let github = FakeGitHub::new()
            .with_response("w3c/private", 401, r#"{"message":"Bad credentials"}"#)
            .spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/private".parse().unwrap();
        let err = resolver.fetch_config(&repo).await.unwrap_err();
        assert!(matches!(err, ConfigError::Status { status: 401, .. }));
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn error_status_with_html_body_keeps_body_text() {
        let github = FakeGitHub::new()
            .with_raw_body("w3c/outage", "<html>502 Bad Gateway</html>")
            .spawn();
        let resolver = resolver_for(&github.base_url());

        let repo: RepoName = "w3c/outage".parse().unwrap();
        let err = resolver.fetch_config(&repo).await.unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Status { status: 502, ref message } if message.contains("Bad Gateway")
        ));
    }
}
