//! Portfolio - weekly portfolio document store
//!
//! Sixteen week slots with titles, descriptions and attached PDFs, persisted
//! as one JSON document in a GitHub repository. The repository is reached
//! through a proxy that holds the token; a local mirror is the offline
//! fallback.
//!
//! ## Components
//!
//! - **Remote**: [`RemoteDocumentClient`] with the proxy-backed [`ProxyClient`]
//! - **Local**: [`SnapshotStore`] mirror under a fixed key
//! - **Service**: [`PortfolioDataService`] - load, mutate, commit
//! - **Proxy**: hyper server forwarding to the GitHub Contents API

pub mod config;
pub mod local;
pub mod logging;
pub mod model;
pub mod proxy;
pub mod remote;
pub mod service;
pub mod types;

pub use config::{AdminArgs, AdminCommand, ProxyArgs};
pub use local::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use model::{Activity, Snapshot, Week};
pub use remote::{InMemoryRemote, ProxyClient, ProxyClientConfig, RemoteDocumentClient};
pub use service::{CommitOutcome, EditState, LoadOutcome, PortfolioDataService, SnapshotSource};
pub use types::{PortfolioError, Result};
