//! Shared types

pub mod error;

pub use error::{PortfolioError, Result};
