//! Funded transaction flow.
//!
//! # Responsibilities
//! - Run donate and create-fund actions through five strictly ordered steps
//! - Hold the per-fund pending flag for the whole invocation
//! - Race confirmation against a deadline with exactly one outcome
//! - Report "paid but not recorded" distinctly from every other failure
//!
//! # Data Flow
//! ```text
//! execute(action)
//!     → session.begin(key)           (AlreadyPending if held)
//!     → 1 Validating                 (local checks, fee schedule, pre-donate)
//!     → 2 BalanceChecking            (balance >= amount + reserve)
//!     → 3 AwaitingSignature          (blockhash, transfer, wallet sign+send)
//!     → 4 AwaitingConfirmation       (poll, raced against timeout)
//!     → 5 Finalizing                 (donate / create on the backend)
//!     → terminal state, guard dropped, metrics recorded
//! ```
//!
//! # Design Decisions
//! - Only steps 1 and 2 are side-effect free; nothing here retries step 3
//! - A broadcast whose answer was lost still goes to step 4 with the
//!   locally computed signature
//! - Backend errors after step 4 become `Finalization`, never a plain error
//! - "Already completed" from the backend is a terminal outcome, not a failure

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::types::{
    CreatedFund, DonateRecord, FeeSchedule, Fund, PreDonateRequest,
};
use crate::backend::{BackendError, FundsBackend};
use crate::config::FlowConfig;
use crate::flow::errors::FlowError;
use crate::flow::request::{CreateFundRequest, DonateRequest, FlowAction};
use crate::flow::state::{FlowObserver, FlowState, NoopObserver};
use crate::observability::metrics;
use crate::resilience::timeouts::{race, Race};
use crate::session::SessionStore;
use crate::solana::transaction::unsigned_transfer;
use crate::solana::{
    ChainClient, ConfirmationStatus, Lamports, Pubkey, Signature, WalletError, WalletProvider,
};

/// What the backend returned at step 5.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalized {
    /// Updated fund after a donation.
    Donation(Fund),
    /// Newly created fund.
    Created(CreatedFund),
}

/// Result of a successful flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowReceipt {
    pub signature: Signature,
    pub amount: Lamports,
    pub finalized: Finalized,
}

/// Step 1 result: where the money goes and how much.
struct Validated {
    recipient: Pubkey,
    amount: Lamports,
    reserve: Lamports,
}

/// Orchestrates donate and create-fund flows.
pub struct FundedTransactionFlow {
    backend: Arc<dyn FundsBackend>,
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn WalletProvider>,
    session: Arc<SessionStore>,
    config: FlowConfig,
    observer: Arc<dyn FlowObserver>,
}

impl FundedTransactionFlow {
    pub fn new(
        backend: Arc<dyn FundsBackend>,
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn WalletProvider>,
        session: Arc<SessionStore>,
        config: FlowConfig,
    ) -> Self {
        Self {
            backend,
            chain,
            wallet,
            session,
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn FlowObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn donate(&self, request: DonateRequest) -> Result<FlowReceipt, FlowError> {
        self.execute(FlowAction::Donate(request)).await
    }

    pub async fn create_fund(&self, request: CreateFundRequest) -> Result<FlowReceipt, FlowError> {
        self.execute(FlowAction::CreateFund(request)).await
    }

    /// Run one action to a terminal state.
    ///
    /// The pending flag for the action's key is held for the whole call and
    /// released on every exit path.
    pub async fn execute(&self, action: FlowAction) -> Result<FlowReceipt, FlowError> {
        let start = Instant::now();
        let payer = self.wallet.address();
        let key = action.pending_key(&payer);

        let Some(_guard) = self.session.begin(&key) else {
            tracing::warn!(key = %key, action = action.name(), "Flow already in progress");
            metrics::record_flow(action.name(), "already_pending", start);
            return Err(FlowError::AlreadyPending(key));
        };
        self.observer.on_transition(&key, FlowState::Idle);

        let mut step = FlowState::Idle;
        let result = self.run(&action, &key, payer, &mut step).await;

        let terminal = match &result {
            Ok(_) => FlowState::Succeeded,
            Err(e) => e.terminal_state(step),
        };
        self.observer.on_transition(&key, terminal);
        metrics::record_flow(action.name(), terminal.as_str(), start);

        let amount = requested_sol(&action);
        match &result {
            Ok(receipt) => tracing::info!(
                key = %key,
                action = action.name(),
                amount,
                signature = %receipt.signature,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Flow succeeded"
            ),
            Err(e @ FlowError::Finalization { .. }) => tracing::error!(
                key = %key,
                action = action.name(),
                amount,
                step = %step,
                error = %e,
                "Payment confirmed but not recorded"
            ),
            Err(e) => tracing::warn!(
                key = %key,
                action = action.name(),
                amount,
                step = %step,
                outcome = %terminal,
                error = %e,
                "Flow ended without success"
            ),
        }
        result
    }

    async fn run(
        &self,
        action: &FlowAction,
        key: &str,
        payer: Pubkey,
        step: &mut FlowState,
    ) -> Result<FlowReceipt, FlowError> {
        self.enter(key, step, FlowState::Validating);
        let validated = match action {
            FlowAction::Donate(req) => self.validate_donation(req, payer).await?,
            FlowAction::CreateFund(req) => self.validate_creation(req).await?,
        };

        self.enter(key, step, FlowState::BalanceChecking);
        let available = self.chain.get_balance(&payer).await?;
        let needed = validated.amount.saturating_add(validated.reserve);
        if available < needed {
            return Err(FlowError::InsufficientFunds { needed, available });
        }

        self.enter(key, step, FlowState::AwaitingSignature);
        let (blockhash, _) = self.chain.get_latest_blockhash().await?;
        let priority_fee = matches!(action, FlowAction::CreateFund(_))
            .then_some(self.config.priority_fee_micro_lamports);
        let tx = unsigned_transfer(
            &payer,
            &validated.recipient,
            validated.amount,
            priority_fee,
            blockhash,
        );
        let signature = match self.wallet.sign_and_send(tx).await {
            Ok(signature) => {
                tracing::info!(key = %key, signature = %signature, "Transaction sent, awaiting confirmation");
                signature
            }
            Err(WalletError::Unconfirmed { signature, source }) => {
                tracing::warn!(
                    key = %key,
                    signature = %signature,
                    error = %source,
                    "Broadcast answer lost, polling signature"
                );
                signature
            }
            Err(e) => return Err(e.into()),
        };

        self.enter(key, step, FlowState::AwaitingConfirmation);
        self.confirm(signature).await?;

        self.enter(key, step, FlowState::Finalizing);
        let finalized = match action {
            FlowAction::Donate(req) => {
                let record = DonateRecord {
                    amount: req.amount_sol,
                    donor_wallet: payer.to_string(),
                    tx_signature: signature.to_string(),
                };
                self.backend
                    .donate(&req.fund_id, &record)
                    .await
                    .map(Finalized::Donation)
                    .map_err(|e| finalization_error(&req.fund_id, signature, e))?
            }
            FlowAction::CreateFund(req) => {
                let payload = req
                    .clone()
                    .into_payload(payer.to_string(), signature.to_string());
                self.backend
                    .create_fund(&payload)
                    .await
                    .map(Finalized::Created)
                    .map_err(|e| finalization_error(key, signature, e))?
            }
        };

        Ok(FlowReceipt {
            signature,
            amount: validated.amount,
            finalized,
        })
    }

    fn enter(&self, key: &str, step: &mut FlowState, next: FlowState) {
        *step = next;
        tracing::debug!(key = %key, step = %next, "Flow step");
        self.observer.on_transition(key, next);
    }

    async fn validate_donation(
        &self,
        req: &DonateRequest,
        payer: Pubkey,
    ) -> Result<Validated, FlowError> {
        req.validate(None)?;
        let limits = self.fee_schedule().await;
        req.validate(limits.as_ref())?;

        let pre = PreDonateRequest {
            amount: req.amount_sol,
            donor_wallet: payer.to_string(),
        };
        let answer = self
            .backend
            .pre_donate(&req.fund_id, &pre)
            .await
            .map_err(|e| {
                if e.is_already_completed() {
                    FlowError::AlreadyCompleted {
                        fund_id: req.fund_id.clone(),
                        signature: None,
                    }
                } else {
                    FlowError::Backend(e)
                }
            })?;
        let recipient = answer.fund_wallet_address.parse::<Pubkey>().map_err(|_| {
            FlowError::Validation(format!(
                "Backend returned an invalid fund wallet address: {}",
                answer.fund_wallet_address
            ))
        })?;

        Ok(Validated {
            recipient,
            amount: Lamports::from_sol(req.amount_sol),
            reserve: Lamports::from_sol(self.config.donation_reserve_sol),
        })
    }

    async fn validate_creation(&self, req: &CreateFundRequest) -> Result<Validated, FlowError> {
        req.validate()?;
        let recipient = self
            .config
            .platform_wallet
            .as_deref()
            .ok_or_else(|| {
                FlowError::Validation("Platform wallet address is not configured".into())
            })?
            .parse::<Pubkey>()
            .map_err(|e| FlowError::Validation(format!("Invalid platform wallet address: {e}")))?;

        let default_fee = self.config.default_creation_fee_sol;
        let fee = self
            .fee_schedule()
            .await
            .map(|s| s.creation_fee_or(default_fee))
            .unwrap_or(default_fee);

        Ok(Validated {
            recipient,
            amount: Lamports::from_sol(fee),
            reserve: Lamports::from_sol(self.config.creation_reserve_sol),
        })
    }

    /// Fee schedule, or `None` when the backend cannot provide one; the
    /// backend still enforces its bounds at pre-donate.
    async fn fee_schedule(&self) -> Option<FeeSchedule> {
        match self.backend.get_fee_schedule().await {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                tracing::warn!(error = %e, "Fee schedule unavailable, using defaults");
                None
            }
        }
    }

    async fn confirm(&self, signature: Signature) -> Result<(), FlowError> {
        let limit = Duration::from_secs(self.config.confirmation_timeout_secs);
        let poll = Duration::from_millis(self.config.confirmation_poll_ms.max(1));

        match race(limit, self.chain.confirm_transaction(&signature, poll)).await {
            Race::Finished(Ok(ConfirmationStatus::Confirmed { slot })) => {
                tracing::info!(signature = %signature, slot, "Transaction confirmed");
                Ok(())
            }
            Race::Finished(Ok(ConfirmationStatus::Failed(reason))) => {
                Err(FlowError::ConfirmationFailed { signature, reason })
            }
            Race::Finished(Ok(status)) => Err(FlowError::ConfirmationFailed {
                signature,
                reason: format!("unexpected status {status:?}"),
            }),
            Race::Finished(Err(e)) => {
                tracing::warn!(signature = %signature, error = %e, "Confirmation polling failed");
                Err(FlowError::ConfirmationTimeout {
                    signature,
                    timeout_secs: self.config.confirmation_timeout_secs,
                })
            }
            Race::TimedOut => Err(FlowError::ConfirmationTimeout {
                signature,
                timeout_secs: self.config.confirmation_timeout_secs,
            }),
        }
    }
}

fn finalization_error(key: &str, signature: Signature, e: BackendError) -> FlowError {
    if e.is_already_completed() {
        return FlowError::AlreadyCompleted {
            fund_id: key.to_string(),
            signature: Some(signature),
        };
    }
    FlowError::Finalization {
        signature,
        reason: e.to_string(),
        refund_signature: e.refund_signature().map(str::to_string),
    }
}

fn requested_sol(action: &FlowAction) -> f64 {
    match action {
        FlowAction::Donate(req) => req.amount_sol,
        FlowAction::CreateFund(_) => 0.0,
    }
}

/// Merge a flow result into the caller's copy of `fund`.
///
/// Returns whether the local copy changed.
pub fn reconcile(fund: &mut Fund, result: &Result<FlowReceipt, FlowError>) -> bool {
    match result {
        Ok(FlowReceipt {
            finalized: Finalized::Donation(snapshot),
            ..
        }) if snapshot.id == fund.id => {
            fund.apply_snapshot(snapshot.clone());
            true
        }
        Err(FlowError::AlreadyCompleted { fund_id, .. }) if *fund_id == fund.id => {
            fund.mark_completed();
            true
        }
        _ => false,
    }
}
