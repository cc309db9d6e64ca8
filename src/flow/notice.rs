//! User-facing notifications for flow outcomes.
//!
//! Every flow ends in exactly one [`Notice`]. Finalization failures are
//! `Critical` and sticky: the user has paid and must not dismiss the message
//! by accident.

use std::fmt;

use crate::backend::types::Fund;
use crate::flow::errors::{FlowError, LaunchError};
use crate::flow::executor::{Finalized, FlowReceipt};
use crate::solana::{short_signature, WalletError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    /// Requires explicit acknowledgement.
    pub sticky: bool,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            sticky: severity == Severity::Critical,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Notice for a successful flow.
    pub fn for_receipt(receipt: &FlowReceipt) -> Self {
        match &receipt.finalized {
            Finalized::Donation(fund) => {
                let mut message = format!(
                    "Successfully donated {:.2} SOL! Tx: {}",
                    receipt.amount.as_sol(),
                    short_signature(&receipt.signature)
                );
                if fund.is_completed() {
                    message.push_str(" Fund completed!");
                    if let Some(token) = token_hint(fund) {
                        message.push_str(&format!(" Token: {token}"));
                    }
                }
                Self::success(message)
            }
            Finalized::Created(created) => {
                let mut message = format!("Fund created successfully! Id: {}", created.id);
                if let Some(extra) = &created.message {
                    message.push(' ');
                    message.push_str(extra);
                }
                Self::success(message)
            }
        }
    }

    pub fn for_launch_error(error: &LaunchError) -> Self {
        match error {
            LaunchError::CoolingDown { .. } => Self::new(Severity::Warning, error.to_string()),
            _ => Self::error(error.to_string()),
        }
    }
}

impl From<&FlowError> for Notice {
    fn from(error: &FlowError) -> Self {
        match error {
            FlowError::UserRejected => {
                Notice::info("Transaction canceled. Please try again if you wish to proceed.")
            }
            FlowError::AlreadyCompleted { .. } => Notice::success(
                "This crowdfund is already completed. No further donations are accepted.",
            ),
            FlowError::AlreadyPending(_) => Notice::new(Severity::Warning, error.to_string()),
            FlowError::ConfirmationTimeout { signature, .. } => Notice::new(
                Severity::Warning,
                format!(
                    "Transaction confirmation timed out. It may still land; check {signature} \
                     before trying again."
                ),
            ),
            FlowError::Wallet(WalletError::Unconfirmed { signature, .. }) => Notice::new(
                Severity::Warning,
                format!(
                    "Transaction was sent but the network did not answer. It may still land; \
                     check {signature} before trying again."
                ),
            ),
            FlowError::Finalization {
                signature,
                reason,
                refund_signature,
            } => {
                let mut message = format!(
                    "Payment sent but not recorded: {reason}. Transaction {signature}. \
                     Do not pay again; retry finalization or contact support."
                );
                if let Some(refund) = refund_signature {
                    if refund.contains("failed") {
                        message.push_str(" Refund attempted but failed. Please contact support.");
                    } else {
                        message.push_str(&format!(" Refunded: {refund}"));
                    }
                }
                Notice::new(Severity::Critical, message)
            }
            other => Notice::error(other.to_string()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

fn token_hint(fund: &Fund) -> Option<String> {
    let token = fund.token_address.as_deref()?;
    if token.len() <= 8 {
        return Some(token.to_string());
    }
    Some(format!("{}...{}", &token[..4], &token[token.len() - 4..]))
}
