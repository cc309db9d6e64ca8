//! Same-origin forwarding to the Solana RPC node and the crowdfunding backend.
//!
//! # Responsibilities
//! - `/api/solana-rpc/proxy`: forward JSON-RPC to the configured cluster
//! - `/api/backend/{*path}`: forward path, query and body to `backend.api_url`
//!   with the platform headers attached
//!
//! # Design Decisions
//! - Upstream bodies are buffered; JSON-RPC payloads and backend replies
//!   are small and the error shapes depend on the full text
//! - JSON backend errors collapse to `{ "error": ... }` with the upstream
//!   status; non-JSON replies pass through untouched

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::backend::client::{API_KEY_HEADER, FROM_PROXY_HEADER};
use crate::http::response::{forwardable_headers, json_error};
use crate::http::server::AppState;
use crate::observability::metrics;

const RPC_ROUTE: &str = "rpc_proxy";
const BACKEND_ROUTE: &str = "backend";

/// Forward a JSON-RPC call to the selected cluster endpoint.
pub async fn proxy_rpc(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let network = &state.config.network;
    let Some(target) = network.selected_rpc_url() else {
        tracing::error!(cluster = %network.cluster, "No RPC endpoint configured");
        metrics::record_proxy_request(RPC_ROUTE, 500);
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "RPC endpoint not configured");
    };

    tracing::debug!(method = %method, target, "Proxying RPC request");
    let mut request = state
        .http
        .request(method.clone(), target)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json");
    if carries_body(&method) {
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(target, error = %e, "RPC proxy error");
            metrics::record_proxy_request(RPC_ROUTE, 500);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy RPC request");
        }
    };

    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(target, error = %e, "Failed to read RPC response");
            metrics::record_proxy_request(RPC_ROUTE, 500);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy RPC request");
        }
    };
    metrics::record_proxy_request(RPC_ROUTE, status.as_u16());

    if !status.is_success() {
        tracing::warn!(status = %status, "RPC upstream error");
        return json_error(status, text);
    }
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        text,
    )
        .into_response()
}

/// Forward a backend call to `backend.api_url/{path}`.
pub async fn proxy_backend(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = backend_url(&state.config.backend.api_url, &path, query.as_deref());
    tracing::debug!(method = %method, url = %url, bytes = body.len(), "Forwarding to backend");

    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| state.config.network.api_key.clone());
    let from_proxy = headers
        .get(FROM_PROXY_HEADER)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("true"));

    let mut request = state
        .http
        .request(method.clone(), &url)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(FROM_PROXY_HEADER, from_proxy);
    if let Some(key) = api_key {
        request = request.header(API_KEY_HEADER, key);
    }
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    if carries_body(&method) {
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Error calling backend");
            metrics::record_proxy_request(BACKEND_ROUTE, 500);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to call backend");
        }
    };

    let status = response.status();
    let upstream_headers = response.headers().clone();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Failed to read backend response");
            metrics::record_proxy_request(BACKEND_ROUTE, 500);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to call backend");
        }
    };

    let is_json = upstream_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if !is_json {
        tracing::warn!(url = %url, status = %status, "Unexpected content type from backend");
        metrics::record_proxy_request(BACKEND_ROUTE, status.as_u16());
        return (status, forwardable_headers(&upstream_headers), text).into_response();
    }

    let data: Value = match serde_json::from_str(&text) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Invalid JSON from backend");
            metrics::record_proxy_request(BACKEND_ROUTE, 500);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Invalid JSON response from backend",
                    "rawResponse": text,
                })),
            )
                .into_response();
        }
    };

    metrics::record_proxy_request(BACKEND_ROUTE, status.as_u16());
    if !status.is_success() {
        let message = data
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Backend error");
        return json_error(status, message);
    }
    (
        status,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))],
        Json(data),
    )
        .into_response()
}

fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

fn backend_url(api_url: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        api_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_joins_path_and_query() {
        assert_eq!(
            backend_url("http://api/", "funds/f1", Some("page=2")),
            "http://api/funds/f1?page=2"
        );
        assert_eq!(backend_url("http://api", "funds", Some("")), "http://api/funds");
        assert_eq!(backend_url("http://api", "/funds", None), "http://api/funds");
    }

    #[test]
    fn test_only_writes_carry_body() {
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::HEAD));
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::PUT));
    }
}
