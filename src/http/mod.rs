//! Same-origin HTTP gateway.
//!
//! # Data Flow
//! ```text
//! client request
//!     → server.rs (request ID, trace span, timeout, body limit)
//!     → rpc_config.rs  GET /api/solana-rpc
//!     → proxy.rs       /api/solana-rpc/proxy → Solana RPC node
//!                      /api/backend/{*path}  → crowdfunding backend
//!     → response.rs (error bodies, header filtering)
//!     → client response
//! ```

pub mod proxy;
pub mod response;
pub mod rpc_config;
pub mod server;

pub use server::{AppState, HttpServer};
