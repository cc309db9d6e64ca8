//! Funded transaction flows.
//!
//! # Data Flow
//! ```text
//! DonateRequest / CreateFundRequest (request.rs, validated)
//!     → executor.rs (five steps, pending guard, confirmation race)
//!     → FlowReceipt | FlowError (errors.rs)
//!     → Notice (notice.rs, one per outcome)
//!
//! Completed fund:
//!     → launch.rs (creator-only launch with cooldown, transfer, status)
//! ```

pub mod errors;
pub mod executor;
pub mod launch;
pub mod notice;
pub mod request;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{FlowError, LaunchError};
pub use executor::{reconcile, Finalized, FlowReceipt, FundedTransactionFlow};
pub use launch::LaunchCoordinator;
pub use notice::{Notice, Severity};
pub use request::{CreateFundRequest, DonateRequest, FlowAction};
pub use state::{FlowObserver, FlowState, NoopObserver};
