//! Structured logging.
//!
//! Both binaries install one `tracing` subscriber at startup. `RUST_LOG`
//! wins over the configured level so operators can raise verbosity
//! without editing the config file.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `default_directives` is used when `RUST_LOG` is unset, e.g.
/// `"crowdfund_gateway=info,tower_http=info"`. Calling this twice is
/// harmless; the second call is ignored.
pub fn init(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Default directives for a configured level.
pub fn directives_for(level: &str) -> String {
    format!("crowdfund_gateway={level},fund_cli={level},tower_http={level}")
}
