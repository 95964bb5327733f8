//! Portfolio proxy - holds the GitHub token on behalf of the portfolio

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use portfolio::{
    config::ProxyArgs,
    logging,
    proxy::{self, GithubContents, ProxyState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = ProxyArgs::parse();
    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Portfolio proxy");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Repository: {}/{}", args.github_owner, args.github_repo);
    info!(
        "Branch: {}",
        args.github_branch.as_deref().unwrap_or("(repository default)")
    );
    info!("API: {}", args.github_api_url);
    info!(
        "Token: {}",
        if args.github_token.is_some() { "configured" } else { "MISSING" }
    );
    info!("======================================");

    if args.github_token.is_none() {
        warn!("GITHUB_TOKEN is not set; proxy actions will fail until it is configured");
    }

    let github = GithubContents::new(args.github_config())?;
    let state = Arc::new(ProxyState::new(github));

    proxy::run(args.listen, state).await?;
    Ok(())
}
