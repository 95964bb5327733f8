//! HTTP client for the portfolio proxy endpoint

use base64::Engine;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::attachment_path;
use crate::proxy::protocol::{ProxyAction, ProxyRequest, ProxyResponse};
use crate::remote::{RemoteDocument, RemoteDocumentClient};
use crate::types::{PortfolioError, Result};

/// Proxy client configuration
#[derive(Debug, Clone)]
pub struct ProxyClientConfig {
    /// Full URL of the proxy endpoint (e.g. `http://localhost:3000/api/github`)
    pub proxy_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for ProxyClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://localhost:3000/api/github".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Remote client that talks to the proxy, which holds the credential
pub struct ProxyClient {
    config: ProxyClientConfig,
    client: Client,
}

impl ProxyClient {
    pub fn new(config: ProxyClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PortfolioError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn proxy_url(&self) -> &str {
        &self.config.proxy_url
    }

    /// Post one request to the proxy and return its `data` payload
    async fn call(&self, request: &ProxyRequest) -> Result<serde_json::Value> {
        debug!(
            action = request.action.as_str(),
            path = %request.path,
            has_sha = request.sha.is_some(),
            "Calling proxy"
        );

        let response = self
            .client
            .post(&self.config.proxy_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path = %request.path, "Proxy unreachable");
                PortfolioError::from(e)
            })?;

        let http_status = response.status();
        let body = response.bytes().await?;

        let parsed: ProxyResponse = serde_json::from_slice(&body).map_err(|e| {
            PortfolioError::Transport(format!(
                "proxy returned HTTP {} with an unreadable body: {}",
                http_status, e
            ))
        })?;

        if parsed.success {
            return parsed
                .data
                .ok_or_else(|| PortfolioError::InvalidResponse("response has no data".into()));
        }

        let message = parsed
            .error
            .unwrap_or_else(|| format!("proxy returned HTTP {}", http_status));
        let err = classify_failure(&request.path, parsed.status, message);
        warn!(
            action = request.action.as_str(),
            path = %request.path,
            error = %err,
            "Proxy call failed"
        );
        Err(err)
    }
}

#[async_trait::async_trait]
impl RemoteDocumentClient for ProxyClient {
    async fn read_document(&self, path: &str) -> Result<RemoteDocument> {
        let data = self.call(&ProxyRequest::read(path)).await?;

        let encoded = data
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| PortfolioError::InvalidResponse(format!("{} has no content", path)))?;

        Ok(RemoteDocument {
            content: decode_content(encoded)?,
            content_hash: data.get("sha").and_then(|s| s.as_str()).map(str::to_string),
        })
    }

    async fn write_document(
        &self,
        path: &str,
        content: &[u8],
        commit_message: &str,
        content_hash: Option<&str>,
    ) -> Result<String> {
        let request = ProxyRequest::write(
            ProxyAction::Save,
            path,
            encode_content(content),
            commit_message,
            content_hash.map(str::to_string),
        );

        let data = self.call(&request).await?;
        data.pointer("/content/sha")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| PortfolioError::InvalidResponse("write response has no content.sha".into()))
    }

    async fn upload_attachment(
        &self,
        week: u8,
        file_name: &str,
        content: &[u8],
    ) -> Result<String> {
        let request = ProxyRequest::write(
            ProxyAction::Upload,
            attachment_path(week, file_name),
            encode_content(content),
            format!("Add {} to week {}", file_name, week),
            None,
        );

        let data = self.call(&request).await?;
        ["/content/download_url", "/content/html_url"]
            .iter()
            .filter_map(|ptr| data.pointer(ptr).and_then(|u| u.as_str()))
            .find(|u| !u.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PortfolioError::InvalidResponse("upload response has no download URL".into()))
    }
}

fn encode_content(content: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(content)
}

/// Decode host base64, which arrives wrapped with newlines
fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

/// Map a proxy failure onto the error taxonomy.
///
/// The upstream status is used when present; older proxies only send the
/// message, so it is inspected as well.
fn classify_failure(path: &str, status: Option<u16>, message: String) -> PortfolioError {
    let lower = message.to_ascii_lowercase();
    let mentions_sha = lower.contains("sha") || lower.contains("does not match");

    match status {
        Some(404) => PortfolioError::NotFound(path.to_string()),
        Some(409) => PortfolioError::Conflict(message),
        Some(422) if mentions_sha => PortfolioError::Conflict(message),
        None if lower.contains("not found") => PortfolioError::NotFound(path.to_string()),
        None if mentions_sha => PortfolioError::Conflict(message),
        _ => PortfolioError::Transport(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ProxyClient {
        ProxyClient::new(ProxyClientConfig {
            proxy_url: format!("{}/api/github", server.uri()),
            timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[test]
    fn test_classify_failure() {
        let p = "data/snapshot.json";
        assert!(matches!(
            classify_failure(p, Some(404), "Not Found".into()),
            PortfolioError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure(p, None, "Not Found".into()),
            PortfolioError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure(p, Some(409), "data/snapshot.json does not match abc".into()),
            PortfolioError::Conflict(_)
        ));
        assert!(matches!(
            classify_failure(p, Some(422), "Invalid request.\n\n\"sha\" wasn't supplied.".into()),
            PortfolioError::Conflict(_)
        ));
        assert!(matches!(
            classify_failure(p, Some(422), "Invalid request.".into()),
            PortfolioError::Transport(_)
        ));
        assert!(matches!(
            classify_failure(p, Some(401), "Bad credentials".into()),
            PortfolioError::Transport(_)
        ));
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let decoded = decode_content("eyJ3ZWVr\ncyI6W119\n").unwrap();
        assert_eq!(decoded, br#"{"weeks":[]}"#);
    }

    #[tokio::test]
    async fn test_read_document_decodes_content_and_sha() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/github"))
            .and(body_partial_json(json!({"action": "read", "path": "data/snapshot.json"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"content": "eyJ3ZWVr\ncyI6W119\n", "sha": "abc123"}
            })))
            .mount(&server)
            .await;

        let doc = client_for(&server)
            .await
            .read_document("data/snapshot.json")
            .await
            .unwrap();
        assert_eq!(doc.content, br#"{"weeks":[]}"#);
        assert_eq!(doc.content_hash.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_read_document_not_found_from_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"success": false, "error": "Not Found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .read_document("data/snapshot.json")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_document_sends_sha_and_returns_new_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "action": "save",
                "path": "data/snapshot.json",
                "sha": "old-sha",
                "content": "e30="
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"content": {"sha": "new-sha"}, "commit": {"sha": "c1"}}
            })))
            .mount(&server)
            .await;

        let hash = client_for(&server)
            .await
            .write_document("data/snapshot.json", b"{}", "Update weeks", Some("old-sha"))
            .await
            .unwrap();
        assert_eq!(hash, "new-sha");
    }

    #[tokio::test]
    async fn test_write_document_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "data/snapshot.json does not match old-sha",
                "status": 409
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .write_document("data/snapshot.json", b"{}", "Update weeks", Some("old-sha"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_upload_attachment_returns_download_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "action": "upload",
                "path": "weeks/week-5/report.pdf"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"content": {
                    "sha": "f1",
                    "download_url": "https://raw.example.test/weeks/week-5/report.pdf",
                    "html_url": "https://example.test/blob/main/weeks/week-5/report.pdf"
                }}
            })))
            .mount(&server)
            .await;

        let url = client_for(&server)
            .await
            .upload_attachment(5, "report.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(url, "https://raw.example.test/weeks/week-5/report.pdf");
    }

    #[tokio::test]
    async fn test_non_json_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .read_document("data/snapshot.json")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Transport(_)));
    }
}
