//! Error types for funded flows and launches.

use thiserror::Error;

use crate::backend::BackendError;
use crate::flow::state::FlowState;
use crate::solana::{Lamports, RpcError, Signature, WalletError};

/// Every way a funded flow can end other than success.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Bad input or amount outside the backend's bounds. Nothing was paid.
    #[error("{0}")]
    Validation(String),

    /// Another flow for the same fund is still in flight.
    #[error("An operation for {0} is already in progress")]
    AlreadyPending(String),

    /// Balance does not cover amount plus fee reserve. Nothing was signed.
    #[error("Insufficient SOL. Need at least {needed}, have {available}")]
    InsufficientFunds { needed: Lamports, available: Lamports },

    /// The user declined in the wallet.
    #[error("Transaction cancelled in wallet")]
    UserRejected,

    /// No confirmation within the deadline; the transfer may still land.
    #[error("Transaction confirmation timed out after {timeout_secs} seconds ({signature})")]
    ConfirmationTimeout { signature: Signature, timeout_secs: u64 },

    /// The transaction landed with an error; no funds moved.
    #[error("Transaction {signature} failed: {reason}")]
    ConfirmationFailed { signature: Signature, reason: String },

    /// Payment confirmed on-chain but the backend did not record it.
    #[error("Payment sent but not recorded ({signature}): {reason}")]
    Finalization {
        signature: Signature,
        reason: String,
        refund_signature: Option<String>,
    },

    /// The fund reached its target first. Terminal, not a failure.
    #[error("Crowdfund is already completed")]
    AlreadyCompleted {
        fund_id: String,
        /// Set when the race was lost after paying.
        signature: Option<Signature>,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Wallet(WalletError),
}

impl From<WalletError> for FlowError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Rejected => FlowError::UserRejected,
            other => FlowError::Wallet(other),
        }
    }
}

impl FlowError {
    /// Terminal state for this error, given the last step entered.
    pub fn terminal_state(&self, step: FlowState) -> FlowState {
        match self {
            FlowError::Validation(_) | FlowError::AlreadyPending(_) | FlowError::Backend(_) => {
                FlowState::FailedValidation
            }
            FlowError::InsufficientFunds { .. } => FlowState::FailedBalance,
            FlowError::UserRejected => FlowState::Cancelled,
            FlowError::ConfirmationTimeout { .. } => FlowState::FailedConfirmationTimeout,
            FlowError::ConfirmationFailed { .. } => FlowState::FailedConfirmation,
            FlowError::Finalization { .. } => FlowState::FailedFinalization,
            FlowError::AlreadyCompleted { .. } => FlowState::RejectedAlreadyCompleted,
            FlowError::Rpc(_) if step == FlowState::BalanceChecking => FlowState::FailedBalance,
            FlowError::Wallet(WalletError::Unconfirmed { .. }) => {
                FlowState::FailedConfirmationTimeout
            }
            FlowError::Rpc(_) | FlowError::Wallet(_) => FlowState::FailedSubmission,
        }
    }

    /// Whether native currency may have left the payer's wallet.
    pub fn funds_may_have_moved(&self) -> bool {
        matches!(
            self,
            FlowError::ConfirmationTimeout { .. }
                | FlowError::Finalization { .. }
                | FlowError::AlreadyCompleted { signature: Some(_), .. }
                | FlowError::Wallet(WalletError::Unconfirmed { .. })
        )
    }

    /// The transaction signature, when one was broadcast.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            FlowError::ConfirmationTimeout { signature, .. }
            | FlowError::ConfirmationFailed { signature, .. }
            | FlowError::Finalization { signature, .. }
            | FlowError::Wallet(WalletError::Unconfirmed { signature, .. }) => Some(signature),
            FlowError::AlreadyCompleted { signature, .. } => signature.as_ref(),
            _ => None,
        }
    }
}

/// Errors from launching a token or transferring it to the target wallet.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Only the fund creator can {0}")]
    NotCreator(&'static str),

    #[error("An image is required to launch the token. Please upload an image first.")]
    MissingImage,

    #[error("Please wait {} minute(s) before launching again.", .remaining_secs.div_ceil(60))]
    CoolingDown { remaining_secs: u64 },

    #[error("Fund is not completed yet")]
    NotCompleted,

    #[error("Token address did not appear after {attempts} checks")]
    TokenNotReady { attempts: u32 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_rejection_maps_to_cancel() {
        let e: FlowError = WalletError::Rejected.into();
        assert!(matches!(e, FlowError::UserRejected));
        assert_eq!(
            e.terminal_state(FlowState::AwaitingSignature),
            FlowState::Cancelled
        );
    }

    #[test]
    fn test_rpc_terminal_depends_on_step() {
        let e = FlowError::Rpc(RpcError::Timeout(10));
        assert_eq!(e.terminal_state(FlowState::BalanceChecking), FlowState::FailedBalance);
        assert_eq!(
            e.terminal_state(FlowState::AwaitingSignature),
            FlowState::FailedSubmission
        );
    }

    #[test]
    fn test_funds_may_have_moved() {
        let sig = Signature::from([1; 64]);
        assert!(FlowError::ConfirmationTimeout {
            signature: sig,
            timeout_secs: 60
        }
        .funds_may_have_moved());
        assert!(!FlowError::UserRejected.funds_may_have_moved());
        assert!(!FlowError::AlreadyCompleted {
            fund_id: "f".into(),
            signature: None
        }
        .funds_may_have_moved());

        let unconfirmed = FlowError::Wallet(WalletError::Unconfirmed {
            signature: sig,
            source: RpcError::Timeout(30),
        });
        assert!(unconfirmed.funds_may_have_moved());
        assert_eq!(unconfirmed.signature(), Some(&sig));
        assert_eq!(
            unconfirmed.terminal_state(FlowState::AwaitingSignature),
            FlowState::FailedConfirmationTimeout
        );
    }

    #[test]
    fn test_cooldown_message_rounds_up() {
        let e = LaunchError::CoolingDown { remaining_secs: 61 };
        assert_eq!(e.to_string(), "Please wait 2 minute(s) before launching again.");
    }
}
