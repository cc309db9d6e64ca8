//! `GET /api/solana-rpc`: hands clients the RPC endpoint for the configured
//! cluster together with the platform API key.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::response::json_error;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::solana::RpcEndpoint;

pub const ROUTE: &str = "rpc_config";

pub async fn get_rpc_config(State(state): State<AppState>) -> Response {
    let network = &state.config.network;
    let Some(rpc_url) = network.selected_rpc_url() else {
        tracing::error!(cluster = %network.cluster, "No RPC endpoint configured");
        metrics::record_proxy_request(ROUTE, 500);
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "RPC endpoint not configured");
    };

    tracing::debug!(cluster = %network.cluster, rpc_url, "Serving RPC endpoint");
    metrics::record_proxy_request(ROUTE, 200);
    Json(RpcEndpoint {
        rpc_url: rpc_url.to_string(),
        api_key: network.api_key.clone(),
    })
    .into_response()
}
