//! Flow states and the observer hook.

use std::fmt;

/// Position of one flow invocation in its state machine.
///
/// ```text
/// Idle → Validating → BalanceChecking → AwaitingSignature
///      → AwaitingConfirmation → Finalizing → terminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    Idle,
    Validating,
    BalanceChecking,
    AwaitingSignature,
    AwaitingConfirmation,
    Finalizing,
    Succeeded,
    FailedValidation,
    FailedBalance,
    Cancelled,
    /// Signing or broadcasting failed for a reason other than rejection.
    FailedSubmission,
    FailedConfirmationTimeout,
    /// Landed with an on-chain error.
    FailedConfirmation,
    FailedFinalization,
    RejectedAlreadyCompleted,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            FlowState::Idle
                | FlowState::Validating
                | FlowState::BalanceChecking
                | FlowState::AwaitingSignature
                | FlowState::AwaitingConfirmation
                | FlowState::Finalizing
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Validating => "validating",
            FlowState::BalanceChecking => "balance_checking",
            FlowState::AwaitingSignature => "awaiting_signature",
            FlowState::AwaitingConfirmation => "awaiting_confirmation",
            FlowState::Finalizing => "finalizing",
            FlowState::Succeeded => "succeeded",
            FlowState::FailedValidation => "failed_validation",
            FlowState::FailedBalance => "failed_balance",
            FlowState::Cancelled => "cancelled",
            FlowState::FailedSubmission => "failed_submission",
            FlowState::FailedConfirmationTimeout => "failed_confirmation_timeout",
            FlowState::FailedConfirmation => "failed_confirmation",
            FlowState::FailedFinalization => "failed_finalization",
            FlowState::RejectedAlreadyCompleted => "rejected_already_completed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every state transition of a flow, keyed by pending key.
pub trait FlowObserver: Send + Sync {
    fn on_transition(&self, key: &str, state: FlowState);
}

impl<F> FlowObserver for F
where
    F: Fn(&str, FlowState) + Send + Sync,
{
    fn on_transition(&self, key: &str, state: FlowState) {
        self(key, state)
    }
}

/// Ignores transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {
    fn on_transition(&self, _key: &str, _state: FlowState) {}
}
