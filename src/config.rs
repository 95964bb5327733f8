//! Configuration for the proxy and the admin tool
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::proxy::github::{GithubConfig, DEFAULT_API_URL};
use crate::remote::ProxyClientConfig;
use crate::types::{PortfolioError, Result};

/// Portfolio proxy - holds the GitHub token and forwards content requests
#[derive(Parser, Clone)]
#[command(name = "portfolio-proxy")]
#[command(about = "Credential-holding proxy for the portfolio GitHub repository")]
pub struct ProxyArgs {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Owner of the repository holding the portfolio data
    #[arg(long, env = "GITHUB_OWNER")]
    pub github_owner: String,

    /// Repository holding the portfolio data
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: String,

    /// Branch to read and commit to (repository default when unset)
    #[arg(long, env = "GITHUB_BRANCH")]
    pub github_branch: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Bearer token; when unset the proxy answers every action with 500
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// User-Agent sent upstream
    #[arg(long, env = "USER_AGENT", default_value = "Portfolio-Weeks-App")]
    pub user_agent: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl std::fmt::Debug for ProxyArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyArgs")
            .field("listen", &self.listen)
            .field("github_owner", &self.github_owner)
            .field("github_repo", &self.github_repo)
            .field("github_branch", &self.github_branch)
            .field("github_api_url", &self.github_api_url)
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("log_level", &self.log_level)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl ProxyArgs {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.github_owner.trim().is_empty() || self.github_repo.trim().is_empty() {
            return Err(PortfolioError::Config(
                "GITHUB_OWNER and GITHUB_REPO must not be empty".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(PortfolioError::Config(
                "REQUEST_TIMEOUT_MS must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Upstream settings; moves the token into zeroizing storage
    pub fn github_config(&self) -> GithubConfig {
        GithubConfig {
            api_url: self.github_api_url.clone(),
            owner: self.github_owner.clone(),
            repo: self.github_repo.clone(),
            branch: self.github_branch.clone().filter(|b| !b.is_empty()),
            token: self.github_token.clone().map(Zeroizing::new),
            user_agent: self.user_agent.clone(),
            timeout_ms: self.request_timeout_ms,
        }
    }
}

/// Portfolio admin - edit weeks and attach PDFs
#[derive(Parser, Debug, Clone)]
#[command(name = "portfolio-admin")]
#[command(about = "Edit the weekly portfolio through the proxy")]
pub struct AdminArgs {
    /// Proxy endpoint URL
    #[arg(
        long,
        env = "PORTFOLIO_PROXY_URL",
        default_value = "http://localhost:3000/api/github"
    )]
    pub proxy_url: String,

    /// Directory of the local snapshot mirror
    #[arg(long, env = "PORTFOLIO_DATA_DIR", default_value = ".portfolio")]
    pub data_dir: PathBuf,

    /// Use an in-memory remote instead of the proxy (local mirror only)
    #[arg(long, default_value = "false")]
    pub offline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Proxy request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Print all weeks and their activities
    Show {
        /// Print the raw snapshot JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Set a week's title and/or description and commit
    SetMeta {
        week: u8,
        /// New title (kept when omitted)
        #[arg(long)]
        title: Option<String>,
        /// New description (kept when omitted)
        #[arg(long)]
        description: Option<String>,
    },
    /// Upload a PDF to a week
    Add {
        week: u8,
        file: PathBuf,
        /// Declared media type (guessed from the extension when omitted)
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Remove an activity from a week (the remote file is kept)
    Remove { week: u8, index: usize },
}

impl AdminArgs {
    pub fn proxy_client_config(&self) -> ProxyClientConfig {
        ProxyClientConfig {
            proxy_url: self.proxy_url.clone(),
            timeout_ms: self.request_timeout_ms,
        }
    }
}
