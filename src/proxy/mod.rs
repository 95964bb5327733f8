//! Credential-holding proxy in front of the GitHub Contents API

pub mod github;
pub mod protocol;
pub mod server;

pub use github::{GithubConfig, GithubContents, UpstreamError};
pub use protocol::{ProxyAction, ProxyRequest, ProxyResponse};
pub use server::{dispatch, run, serve, ProxyState};
