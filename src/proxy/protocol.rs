//! Wire types of the proxy endpoint
//!
//! Request: `{action, path, content?, message?, sha?}`.
//! Response: `{success, data}` or `{success: false, error, status?}`, where
//! `status` carries the upstream HTTP status when the host rejected the call.

use serde::{Deserialize, Serialize};

/// Proxy action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyAction {
    Read,
    Save,
    Upload,
}

impl ProxyAction {
    pub fn is_write(self) -> bool {
        !matches!(self, ProxyAction::Read)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProxyAction::Read => "read",
            ProxyAction::Save => "save",
            ProxyAction::Upload => "upload",
        }
    }
}

/// Body posted to the proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub action: ProxyAction,
    pub path: String,
    /// Base64-encoded content (writes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Version token of the object being overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl ProxyRequest {
    pub fn read(path: impl Into<String>) -> Self {
        Self {
            action: ProxyAction::Read,
            path: path.into(),
            content: None,
            message: None,
            sha: None,
        }
    }

    pub fn write(
        action: ProxyAction,
        path: impl Into<String>,
        content_b64: String,
        message: impl Into<String>,
        sha: Option<String>,
    ) -> Self {
        Self {
            action,
            path: path.into(),
            content: Some(content_b64),
            message: Some(message.into()),
            sha,
        }
    }
}

/// Body returned by the proxy endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Upstream HTTP status of a failed call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ProxyResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: None,
        }
    }

    pub fn failure(error: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
        }
    }
}
