//! Chain-specific types and error definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use solana_sdk::hash::Hash;
pub use solana_sdk::native_token::LAMPORTS_PER_SOL;
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::Signature;

/// First characters of a signature, for log lines and notices.
pub fn short_signature(signature: &Signature) -> String {
    signature.to_string().chars().take(8).collect()
}

/// An amount of native currency in lamports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Lamports(pub u64);

impl Lamports {
    /// Convert a SOL amount, rounding to the nearest lamport. Negative and
    /// non-finite inputs map to zero.
    pub fn from_sol(sol: f64) -> Self {
        if !sol.is_finite() || sol <= 0.0 {
            return Self(0);
        }
        Self((sol * LAMPORTS_PER_SOL as f64).round() as u64)
    }

    pub fn as_sol(self) -> f64 {
        self.0 as f64 / LAMPORTS_PER_SOL as f64
    }

    pub fn saturating_add(self, other: Lamports) -> Lamports {
        Lamports(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.as_sol())
    }
}

/// Errors that can occur talking to a Solana RPC node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport failure or every endpoint failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node answered with something we could not decode.
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    /// No endpoint configured.
    #[error("RPC not available: {0}")]
    NotAvailable(String),
}

impl RpcError {
    /// Whether a request that failed this way may still have reached the node.
    ///
    /// A JSON-RPC error object is a definite answer; a lost or garbled answer
    /// is not.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            RpcError::Rpc(_) | RpcError::Timeout(_) | RpcError::InvalidResponse(_)
        )
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Status of a submitted signature as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Not yet seen by the node.
    Pending,
    /// Seen, but below the requested commitment.
    Processed { slot: u64 },
    /// Reached `confirmed` or `finalized`.
    Confirmed { slot: u64 },
    /// Landed with an error; the transfer did not happen.
    Failed(String),
}

/// Balance of an SPL token account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
    pub ui_amount: Option<f64>,
}
