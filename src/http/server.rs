//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Own the outbound HTTP client shared by the proxy handlers
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::{proxy, rpc_config};
use crate::lifecycle::Shutdown;

/// Token images are uploaded through the backend proxy.
pub const MAX_BODY_BYTES: usize = 26 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}

/// Same-origin gateway for the RPC node and the backend.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let state = AppState::new(config)?;
        let config = state.config.clone();
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let rpc_config_route = get(rpc_config::get_rpc_config).layer(
            SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ),
        );

        Router::new()
            .route("/api/solana-rpc", rpc_config_route)
            .route(
                "/api/solana-rpc/proxy",
                get(proxy::proxy_rpc).post(proxy::proxy_rpc),
            )
            .route("/api/backend/{*path}", any(proxy::proxy_backend))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            path = %req.uri().path(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The fully layered router; tests drive it without binding a port.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            cluster = %self.config.network.cluster,
            backend = %self.config.backend.api_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.notified())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn gateway(config: GatewayConfig) -> SocketAddr {
        spawn(HttpServer::new(config).unwrap().router()).await
    }

    fn config_with(rpc: Option<String>, api_url: String) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.network.dev_rpc_url = rpc;
        config.network.api_key = Some("platform-key".into());
        config.backend.api_url = api_url;
        config
    }

    #[tokio::test]
    async fn test_rpc_config_returns_endpoint() {
        let addr = gateway(config_with(Some("https://dev.example".into()), "http://x".into())).await;

        let resp = reqwest::get(format!("http://{addr}/api/solana-rpc")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(resp.headers()["cache-control"], "no-store");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "rpcUrl": "https://dev.example", "apiKey": "platform-key" }));
    }

    #[tokio::test]
    async fn test_rpc_config_missing_endpoint() {
        let addr = gateway(config_with(None, "http://x".into())).await;

        let resp = reqwest::get(format!("http://{addr}/api/solana-rpc")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "RPC endpoint not configured");
    }

    #[tokio::test]
    async fn test_rpc_proxy_forwards_and_maps_errors() {
        let node = spawn(Router::new().route(
            "/",
            post(|Json(req): Json<Value>| async move {
                if req["method"] == "getHealth" {
                    Json(json!({ "jsonrpc": "2.0", "id": 1, "result": "ok" })).into_response()
                } else {
                    (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response()
                }
            }),
        ))
        .await;
        let addr = gateway(config_with(Some(format!("http://{node}/")), "http://x".into())).await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/api/solana-rpc/proxy");

        let ok: Value = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "getHealth" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ok["result"], "ok");

        let limited = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "getBalance" }))
            .send()
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = limited.json().await.unwrap();
        assert_eq!(body["error"], "slow down");
    }

    #[tokio::test]
    async fn test_rpc_proxy_unreachable_node() {
        let addr = gateway(config_with(Some("http://127.0.0.1:1/".into()), "http://x".into())).await;

        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api/solana-rpc/proxy"))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Failed to proxy RPC request");
    }
}
