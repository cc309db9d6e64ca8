//! RPC endpoint and API key discovery.
//!
//! Clients ask the gateway (`GET /api/solana-rpc`) which endpoint to use and
//! which API key to send to the backend. The first successful answer is
//! cached for the life of the resolver; failures fall back to configured
//! defaults without being cached, so a later call can still succeed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::NetworkConfig;

/// Endpoint and key served by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEndpoint {
    pub rpc_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Resolves and caches the [`RpcEndpoint`].
#[derive(Debug)]
pub struct RpcUrlResolver {
    http: reqwest::Client,
    lookup_url: String,
    fallback: RpcEndpoint,
    cached: OnceCell<RpcEndpoint>,
}

impl RpcUrlResolver {
    /// `gateway_url` is the gateway origin, e.g. `http://localhost:8080`.
    pub fn new(gateway_url: &str, network: &NetworkConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(network.rpc_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            lookup_url: format!("{}/api/solana-rpc", gateway_url.trim_end_matches('/')),
            fallback: RpcEndpoint {
                rpc_url: network.fallback_rpc_url.clone(),
                api_key: Some(network.fallback_api_key.clone()),
            },
            cached: OnceCell::new(),
        })
    }

    /// A resolver that never performs a lookup.
    pub fn fixed(endpoint: RpcEndpoint) -> Self {
        Self {
            http: reqwest::Client::new(),
            lookup_url: String::new(),
            fallback: endpoint.clone(),
            cached: OnceCell::new_with(Some(endpoint)),
        }
    }

    /// Current endpoint; never fails.
    pub async fn resolve(&self) -> RpcEndpoint {
        if let Some(endpoint) = self.cached.get() {
            return endpoint.clone();
        }
        match self.fetch().await {
            Ok(endpoint) => {
                tracing::info!(rpc_url = %endpoint.rpc_url, "Fetched RPC endpoint");
                self.cached.get_or_init(|| async { endpoint }).await.clone()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = %self.fallback.rpc_url,
                    "RPC endpoint lookup failed, using fallback"
                );
                self.fallback.clone()
            }
        }
    }

    /// API key to attach to backend requests.
    pub async fn api_key(&self) -> String {
        self.resolve()
            .await
            .api_key
            .or_else(|| self.fallback.api_key.clone())
            .unwrap_or_default()
    }

    async fn fetch(&self) -> Result<RpcEndpoint, String> {
        let resp = self
            .http
            .get(&self.lookup_url)
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("gateway returned {}", resp.status()));
        }
        let endpoint: RpcEndpoint = resp.json().await.map_err(|e| e.to_string())?;
        if endpoint.rpc_url.is_empty() {
            return Err("empty rpcUrl".to_string());
        }
        Ok(endpoint)
    }
}
