//! Client session state.
//!
//! # Data Flow
//! ```text
//! flow::executor ──begin(fund)──▶ pending.rs (guard clears on every exit)
//! flow::launch ──start_cooldown─▶ cooldown.rs
//!                                     │
//! store.rs timer (1 s) ──tick────────┘ clear stuck flags, expire cooldowns
//!     → SessionSnapshot → JSON file
//! ```

pub mod cooldown;
pub mod pending;
pub mod store;

pub use cooldown::LaunchCooldowns;
pub use pending::{PendingGuard, PendingOperations};
pub use store::{SessionError, SessionSnapshot, SessionStore, TimerHandle};
