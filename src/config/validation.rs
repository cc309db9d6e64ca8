//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks value ranges and
//! that every URL and address parses. All errors are returned, not just the
//! first one.

use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::solana::types::Pubkey;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must be a non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("flow.platform_wallet: invalid address '{0}'")]
    InvalidPlatformWallet(String),

    #[error("listener.bind_address: invalid socket address '{0}'")]
    InvalidBindAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    check_url(&mut errors, "backend.base_url", &config.backend.base_url);
    check_url(&mut errors, "backend.api_url", &config.backend.api_url);
    check_url(&mut errors, "backend.gateway_url", &config.backend.gateway_url);
    check_url(&mut errors, "network.fallback_rpc_url", &config.network.fallback_rpc_url);
    if let Some(url) = &config.network.live_rpc_url {
        check_url(&mut errors, "network.live_rpc_url", url);
    }
    if let Some(url) = &config.network.dev_rpc_url {
        check_url(&mut errors, "network.dev_rpc_url", url);
    }
    for url in &config.network.failover_urls {
        check_url(&mut errors, "network.failover_urls", url);
    }

    check_positive(&mut errors, "network.rpc_timeout_secs", config.network.rpc_timeout_secs);
    check_positive(&mut errors, "backend.request_timeout_secs", config.backend.request_timeout_secs);
    check_positive(&mut errors, "flow.confirmation_timeout_secs", config.flow.confirmation_timeout_secs);
    check_positive(&mut errors, "flow.confirmation_poll_ms", config.flow.confirmation_poll_ms);
    check_positive(&mut errors, "session.tick_ms", config.session.tick_ms);
    check_positive(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);
    check_positive(&mut errors, "launch.poll_interval_secs", config.launch.poll_interval_secs);

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "retries.max_attempts" });
    }

    check_non_negative(&mut errors, "flow.donation_reserve_sol", config.flow.donation_reserve_sol);
    check_non_negative(&mut errors, "flow.creation_reserve_sol", config.flow.creation_reserve_sol);
    check_non_negative(&mut errors, "flow.default_creation_fee_sol", config.flow.default_creation_fee_sol);

    if let Some(wallet) = &config.flow.platform_wallet {
        if Pubkey::from_str(wallet).is_err() {
            errors.push(ValidationError::InvalidPlatformWallet(wallet.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if url::Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

fn check_non_negative(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(value >= 0.0) {
        errors.push(ValidationError::Negative { field, value });
    }
}
