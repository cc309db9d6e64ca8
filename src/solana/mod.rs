//! Solana network integration subsystem.
//!
//! # Data Flow
//! ```text
//! gateway /api/solana-rpc
//!     → resolver.rs (endpoint + API key, cached, with fallback)
//!     → rpc.rs (RpcClient per endpoint, timeouts and failover)
//!     → transaction.rs (transfer + priority fee, compiled by solana-sdk)
//!     → wallet.rs (approve, sign, broadcast)
//! ```
//!
//! # Security Constraints
//! - Keypairs ONLY from environment variables or key files
//! - Never log secret key material
//! - All RPC calls have configurable timeouts

pub mod resolver;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use resolver::{RpcEndpoint, RpcUrlResolver};
pub use rpc::{ChainClient, SolanaRpcClient};
pub use types::{short_signature, ConfirmationStatus, Hash, Lamports, Pubkey, RpcError, Signature};
pub use wallet::{KeypairWallet, WalletError, WalletProvider};
