//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Flows, RPC client and gateway produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through gateway logs
//! - Metric updates are no-ops until a recorder is installed
//! - Secret material (keypairs, API keys) is never logged

pub mod logging;
pub mod metrics;
