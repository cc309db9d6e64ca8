//! Solana crowdfunding client library and same-origin gateway.

pub mod config;
pub mod http;
pub mod backend;
pub mod solana;
pub mod flow;
pub mod session;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use flow::FundedTransactionFlow;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
