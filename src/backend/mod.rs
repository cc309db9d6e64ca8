//! Crowdfunding backend integration.
//!
//! # Data Flow
//! ```text
//! flow / launch / CLI
//!     → client.rs (FundsBackend: typed requests, headers, retries)
//!     → gateway /api/backend/* (same-origin proxy)
//!     → external backend
//!     → types.rs (Fund, FeeSchedule, user and leaderboard records)
//! ```

pub mod client;
pub mod types;

pub use client::{BackendClient, FundsBackend};
pub use types::{BackendError, BackendResult, FeeSchedule, Fund, FundStatus};
