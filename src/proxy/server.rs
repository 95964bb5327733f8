//! Proxy HTTP server
//!
//! Pattern adapted from doorway's `server/http.rs`: hyper http1 with one
//! task per connection and a single routing function.
//!
//! Routes:
//! - `OPTIONS *` - CORS preflight, 200 with no body
//! - `GET /health` - liveness and configuration summary
//! - `POST /api/github` (or `POST /`) - proxy action

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::proxy::github::{GithubContents, TOKEN_MISSING_MESSAGE};
use crate::proxy::protocol::{ProxyRequest, ProxyResponse};
use crate::types::{PortfolioError, Result};

/// Shared proxy state
pub struct ProxyState {
    pub github: GithubContents,
    pub started: Instant,
}

impl ProxyState {
    pub fn new(github: GithubContents) -> Self {
        Self {
            github,
            started: Instant::now(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    healthy: bool,
    version: &'static str,
    token_configured: bool,
    repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    uptime: u64,
    timestamp: String,
}

/// Bind `listen` and serve until the process stops
pub async fn run(listen: SocketAddr, state: Arc<ProxyState>) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| PortfolioError::Config(format!("bind {}: {}", listen, e)))?;
    info!(
        "Portfolio proxy listening on {} for {}",
        listen,
        state.github.repository()
    );
    serve(listener, state).await
}

/// Serve connections from an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<ProxyState>) -> Result<()> {
    if !state.github.has_token() {
        warn!("GITHUB_TOKEN not set - proxy actions will answer 500");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<ProxyState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    info!("[{}] {} {}", addr, method, path);

    let body = if method == Method::POST {
        req.collect().await?.to_bytes()
    } else {
        Bytes::new()
    };

    Ok(dispatch(&state, &method, &path, body).await)
}

/// Route a request that has been fully read
pub async fn dispatch(
    state: &ProxyState,
    method: &Method,
    path: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::OPTIONS, _) => preflight_response(),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => health_response(state),
        (&Method::POST, "/api/github") | (&Method::POST, "/") => {
            handle_proxy_action(state, &body).await
        }
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"success": false, "error": "Not Found", "path": path}),
        ),
    }
}

async fn handle_proxy_action(state: &ProxyState, body: &[u8]) -> Response<Full<Bytes>> {
    if !state.github.has_token() {
        error!("Rejecting proxy action: token not configured");
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ProxyResponse::failure(TOKEN_MISSING_MESSAGE, None),
        );
    }

    let request: ProxyRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Proxy request parse error: {}", e);
            return json_response(
                StatusCode::BAD_REQUEST,
                &ProxyResponse::failure(format!("Invalid request body: {}", e), None),
            );
        }
    };

    if let Err(message) = validate_request(&request) {
        warn!(path = %request.path, "Rejected proxy request: {}", message);
        return json_response(
            StatusCode::BAD_REQUEST,
            &ProxyResponse::failure(message, None),
        );
    }

    match state.github.forward(&request).await {
        Ok(data) => {
            info!(action = request.action.as_str(), path = %request.path, "Proxy action succeeded");
            json_response(StatusCode::OK, &ProxyResponse::ok(data))
        }
        Err(e) => {
            error!(
                action = request.action.as_str(),
                path = %request.path,
                status = ?e.status,
                "Error in proxy action: {}",
                e.message
            );
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ProxyResponse::failure(e.message, e.status),
            )
        }
    }
}

/// Reject paths that could leave the repository root and writes without content
fn validate_request(request: &ProxyRequest) -> std::result::Result<(), String> {
    let path = request.path.as_str();
    if path.trim().is_empty() {
        return Err("path must not be empty".into());
    }
    if path.starts_with('/') || path.contains('\\') || path.split('/').any(|s| s == "..") {
        return Err(format!("invalid path: {}", path));
    }
    if request.action.is_write() && request.content.as_deref().map_or(true, str::is_empty) {
        return Err(format!("content is required for {}", request.action.as_str()));
    }
    Ok(())
}

fn health_response(state: &ProxyState) -> Response<Full<Bytes>> {
    let health = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        token_configured: state.github.has_token(),
        repository: state.github.repository(),
        branch: state.github.branch().map(str::to_string),
        uptime: state.started.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json_response(StatusCode::OK, &health)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    with_cors(Response::new(Full::new(Bytes::new())))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let bytes = match serde_json::to_vec(body) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            br#"{"success":false,"error":"Internal serialization error"}"#.to_vec()
        }
    };

    let mut response = with_cors(Response::new(Full::new(Bytes::from(bytes))));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}
