//! GitHub Contents API forwarding
//!
//! The proxy is the only holder of the token. Reads become
//! `GET /repos/{owner}/{repo}/contents/{path}`, every other action becomes a
//! `PUT` to the same URL with `{message, content, sha?, branch?}`.

use reqwest::{header, Client};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

use crate::proxy::protocol::ProxyRequest;
use crate::types::{PortfolioError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update from portfolio";
pub const TOKEN_MISSING_MESSAGE: &str =
    "GitHub token is not configured. Set GITHUB_TOKEN in the proxy environment.";

/// Upstream connection settings
pub struct GithubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub token: Option<Zeroizing<String>>,
    pub user_agent: String,
    pub timeout_ms: u64,
}

/// Failure reported by (or while reaching) the host
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// Host HTTP status, when a response was received
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Client for the repository's contents endpoint
pub struct GithubContents {
    config: GithubConfig,
    client: Client,
}

impl GithubContents {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PortfolioError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn has_token(&self) -> bool {
        self.config
            .token
            .as_ref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.config.owner, self.config.repo)
    }

    pub fn branch(&self) -> Option<&str> {
        self.config.branch.as_deref()
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            encoded.join("/")
        )
    }

    /// Forward one proxy request and return the host's JSON body
    pub async fn forward(
        &self,
        request: &ProxyRequest,
    ) -> std::result::Result<serde_json::Value, UpstreamError> {
        let token = self
            .config
            .token
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UpstreamError::new(None, TOKEN_MISSING_MESSAGE))?;

        let url = self.contents_url(&request.path);

        let builder = if request.action.is_write() {
            let content = request
                .content
                .as_deref()
                .ok_or_else(|| UpstreamError::new(None, "content is required for writes"))?;

            let mut body = json!({
                "message": request.message.as_deref().unwrap_or(DEFAULT_COMMIT_MESSAGE),
                "content": content,
            });
            if let Some(ref sha) = request.sha {
                body["sha"] = json!(sha);
            }
            if let Some(ref branch) = self.config.branch {
                body["branch"] = json!(branch);
            }
            self.client.put(&url).json(&body)
        } else {
            let mut builder = self.client.get(&url);
            if let Some(ref branch) = self.config.branch {
                builder = builder.query(&[("ref", branch.as_str())]);
            }
            builder
        };

        debug!(
            action = request.action.as_str(),
            url = %url,
            has_sha = request.sha.is_some(),
            "Forwarding to GitHub"
        );

        let response = builder
            .bearer_auth(token.as_str())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await
            .map_err(|e| UpstreamError::new(None, format!("Failed to reach GitHub: {}", e)))?;

        let status = response.status();
        let data: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!(
                        "Error {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    )
                });
            return Err(UpstreamError::new(Some(status.as_u16()), message));
        }

        Ok(data)
    }
}
