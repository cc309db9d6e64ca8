//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway,
//! the CLI front end and the funded transaction flow. All types derive Serde
//! traits for deserialization from TOML files; every field has a default so a
//! minimal (or empty) file is valid.

use serde::{Deserialize, Serialize};

/// Endpoint used when neither the gateway nor the config supplies one.
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// API key sent to the backend when the gateway cannot be reached.
pub const DEFAULT_API_KEY: &str = "anonymous";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Solana network selection and RPC endpoints.
    pub network: NetworkConfig,

    /// Crowdfunding backend location.
    pub backend: BackendConfig,

    /// Funded transaction flow parameters.
    pub flow: FlowConfig,

    /// Token launch follow-up.
    pub launch: LaunchConfig,

    /// Session store (pending flags, launch cooldowns).
    pub session: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for idempotent backend reads.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Solana network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Cluster name. `mainnet` selects `live_rpc_url`, anything else `dev_rpc_url`.
    pub cluster: String,

    /// Mainnet RPC endpoint served by the gateway.
    pub live_rpc_url: Option<String>,

    /// Devnet RPC endpoint served by the gateway.
    pub dev_rpc_url: Option<String>,

    /// API key handed out alongside the RPC endpoint.
    pub api_key: Option<String>,

    /// Endpoint used by clients when the gateway lookup fails.
    pub fallback_rpc_url: String,

    /// API key used by clients when the gateway lookup fails.
    pub fallback_api_key: String,

    /// Additional RPC endpoints tried in order after the primary.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl NetworkConfig {
    /// The RPC endpoint the gateway serves for the configured cluster.
    pub fn selected_rpc_url(&self) -> Option<&str> {
        if self.cluster == "mainnet" {
            self.live_rpc_url.as_deref()
        } else {
            self.dev_rpc_url.as_deref()
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cluster: "devnet".to_string(),
            live_rpc_url: None,
            dev_rpc_url: Some(DEFAULT_RPC_URL.to_string()),
            api_key: None,
            fallback_rpc_url: DEFAULT_RPC_URL.to_string(),
            fallback_api_key: DEFAULT_API_KEY.to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
        }
    }
}

/// Backend location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL clients call (normally the gateway's `/api/backend` prefix).
    pub base_url: String,

    /// Upstream origin the gateway forwards `/api/backend/*` to.
    pub api_url: String,

    /// Gateway origin the RPC resolver queries.
    pub gateway_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/backend".to_string(),
            api_url: "http://localhost:5000/api".to_string(),
            gateway_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Funded transaction flow parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Time allowed for network confirmation before giving up.
    pub confirmation_timeout_secs: u64,

    /// Interval between signature status polls.
    pub confirmation_poll_ms: u64,

    /// SOL kept back for fees on a donation.
    pub donation_reserve_sol: f64,

    /// SOL kept back for fees on fund creation.
    pub creation_reserve_sol: f64,

    /// Compute unit price attached to fund creation transactions.
    pub priority_fee_micro_lamports: u64,

    /// Platform wallet receiving fund creation fees (base58).
    pub platform_wallet: Option<String>,

    /// Creation fee used when the backend does not report one.
    pub default_creation_fee_sol: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 60,
            confirmation_poll_ms: 1000,
            donation_reserve_sol: 0.01,
            creation_reserve_sol: 0.005,
            priority_fee_micro_lamports: 10_000,
            platform_wallet: None,
            default_creation_fee_sol: 0.1,
        }
    }
}

/// Token launch follow-up configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Interval between fund polls after a launch request.
    pub poll_interval_secs: u64,

    /// Polls before giving up on seeing a token address.
    pub max_poll_attempts: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_poll_attempts: 60,
        }
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file the session survives restarts in.
    pub persistence_path: Option<String>,

    /// Age after which a pending flag is considered stuck.
    pub stuck_timeout_secs: u64,

    /// Cooldown applied after a launch request.
    pub launch_cooldown_secs: u64,

    /// Watchdog tick interval.
    pub tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persistence_path: None,
            stuck_timeout_secs: 300,
            launch_cooldown_secs: 300,
            tick_ms: 1000,
        }
    }
}

/// Timeout configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream connect timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
