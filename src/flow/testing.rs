//! In-memory fakes for flow and launch tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use tokio::time::Instant;

use crate::backend::types::{
    BackendError, BackendResult, CreateFundPayload, CreatedFund, DonateRecord, FeeSchedule, Fund,
    FundStatus, FundStatusResponse, MessageResponse, PreDonateRequest, PreDonateResponse,
    UserWalletRequest,
};
use crate::backend::FundsBackend;
use crate::solana::rpc::ChainClient;
use crate::solana::transaction::Transaction;
use crate::solana::types::{
    ConfirmationStatus, Hash, Lamports, Pubkey, RpcError, RpcResult, Signature, TokenAmount,
};
use crate::solana::wallet::{WalletError, WalletProvider, WalletResult};

/// Base58 of `[8; 32]`.
pub const PLATFORM: &str = "YMN9Qj5jPNp7j14VPcML1B6xGgcPWVZUGLFU3Mnyfaf";
/// Base58 of `[9; 32]`.
pub const FUND_WALLET: &str = "cGfHiC6Kgg3FpFZvgwGcswsCRtp4aBP2fzuXRQPizuN";

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeMode {
    Ok,
    Unreachable,
    AlreadyCompleted,
    Refunded(String),
}

fn completed_error() -> BackendError {
    BackendError::Api {
        status: 400,
        message: "Crowdfund is already completed".into(),
        refund_signature: None,
    }
}

pub struct FakeBackend {
    pub fund: Mutex<Fund>,
    pub fees: FeeSchedule,
    pub mode: FinalizeMode,
    /// `get_fee_schedule` fails, leaving bounds to pre-donate.
    pub fees_unavailable: bool,
    /// `pre_donate` never gets an answer.
    pub pre_donate_unreachable: bool,
    /// `get_fund` reports a token address from this read onwards.
    pub token_after_reads: Option<u32>,
    pub pre_donations: AtomicU32,
    pub donations: AtomicU32,
    pub creations: AtomicU32,
    pub fund_reads: AtomicU32,
    pub launches: AtomicU32,
    pub transfers: AtomicU32,
}

impl FakeBackend {
    pub fn with_fund(mut fund: Fund) -> Self {
        fund.fund_wallet_address = FUND_WALLET.to_string();
        Self {
            fund: Mutex::new(fund),
            fees: FeeSchedule {
                min_donation: 0.1,
                max_donation: 5.0,
                creation_fee: None,
            },
            mode: FinalizeMode::Ok,
            fees_unavailable: false,
            pre_donate_unreachable: false,
            token_after_reads: None,
            pre_donations: AtomicU32::new(0),
            donations: AtomicU32::new(0),
            creations: AtomicU32::new(0),
            fund_reads: AtomicU32::new(0),
            launches: AtomicU32::new(0),
            transfers: AtomicU32::new(0),
        }
    }

    pub fn finalize(mut self, mode: FinalizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn without_fee_schedule(mut self) -> Self {
        self.fees_unavailable = true;
        self
    }

    pub fn pre_donate_unreachable(mut self) -> Self {
        self.pre_donate_unreachable = true;
        self
    }

    pub fn token_after(mut self, reads: u32) -> Self {
        self.token_after_reads = Some(reads);
        self
    }
}

#[async_trait]
impl FundsBackend for FakeBackend {
    async fn get_fee_schedule(&self) -> BackendResult<FeeSchedule> {
        if self.fees_unavailable {
            return Err(BackendError::Api {
                status: 503,
                message: "Fee schedule unavailable".into(),
                refund_signature: None,
            });
        }
        Ok(self.fees)
    }

    async fn get_fund(&self, _fund_id: &str) -> BackendResult<Fund> {
        let reads = self.fund_reads.fetch_add(1, Ordering::SeqCst) + 1;
        let mut fund = self.fund.lock().unwrap().clone();
        if matches!(self.token_after_reads, Some(n) if reads >= n) {
            fund.token_address = Some(FUND_WALLET.to_string());
        }
        Ok(fund)
    }

    async fn get_fund_status(&self, _fund_id: &str) -> BackendResult<FundStatusResponse> {
        Ok(FundStatusResponse {
            is_completed: self.fund.lock().unwrap().is_completed(),
        })
    }

    async fn pre_donate(
        &self,
        _fund_id: &str,
        request: &PreDonateRequest,
    ) -> BackendResult<PreDonateResponse> {
        self.pre_donations.fetch_add(1, Ordering::SeqCst);
        if self.pre_donate_unreachable {
            return Err(BackendError::Transport("connection reset".into()));
        }
        let fund = self.fund.lock().unwrap();
        if fund.is_completed() {
            return Err(completed_error());
        }
        if !self.fees.contains(request.amount) {
            return Err(BackendError::Api {
                status: 400,
                message: "Donation amount out of bounds".into(),
                refund_signature: None,
            });
        }
        Ok(PreDonateResponse {
            fund_wallet_address: fund.fund_wallet_address.clone(),
        })
    }

    async fn donate(&self, _fund_id: &str, record: &DonateRecord) -> BackendResult<Fund> {
        self.donations.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            FinalizeMode::Unreachable => {
                return Err(BackendError::Transport("connection refused".into()))
            }
            FinalizeMode::AlreadyCompleted => return Err(completed_error()),
            _ => {}
        }
        let mut fund = self.fund.lock().unwrap();
        fund.current_donated_sol += record.amount;
        if fund.current_donated_sol >= fund.target_sol_amount {
            fund.status = FundStatus::Completed;
        }
        Ok(fund.clone())
    }

    async fn create_fund(&self, _payload: &CreateFundPayload) -> BackendResult<CreatedFund> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            FinalizeMode::Unreachable => Err(BackendError::Transport("connection refused".into())),
            FinalizeMode::Refunded(sig) => Err(BackendError::Api {
                status: 500,
                message: "Token creation failed".into(),
                refund_signature: Some(sig.clone()),
            }),
            _ => Ok(CreatedFund {
                id: "new-fund".into(),
                message: Some("Fund created".into()),
                fund: None,
            }),
        }
    }

    async fn launch(
        &self,
        _fund_id: &str,
        _request: &UserWalletRequest,
    ) -> BackendResult<MessageResponse> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(MessageResponse {
            message: Some("Launch started".into()),
        })
    }

    async fn transfer(
        &self,
        _fund_id: &str,
        _request: &UserWalletRequest,
    ) -> BackendResult<MessageResponse> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(MessageResponse {
            message: Some("Tokens transferred".into()),
        })
    }
}

pub struct FakeChain {
    pub balance: Lamports,
    pub confirm_after: Duration,
    pub on_chain_error: Option<String>,
    pub token_balance: Option<TokenAmount>,
    pub token_lookup_fails: bool,
    pub blockhash_requests: AtomicU32,
    pub sends: AtomicU32,
    pub token_queries: Mutex<Vec<Pubkey>>,
    broadcast_error: Mutex<Option<RpcError>>,
    first_poll: Mutex<Option<Instant>>,
}

impl FakeChain {
    pub fn funded(balance: Lamports) -> Self {
        Self {
            balance,
            confirm_after: Duration::ZERO,
            on_chain_error: None,
            token_balance: None,
            token_lookup_fails: false,
            blockhash_requests: AtomicU32::new(0),
            sends: AtomicU32::new(0),
            token_queries: Mutex::new(Vec::new()),
            broadcast_error: Mutex::new(None),
            first_poll: Mutex::new(None),
        }
    }

    /// Report `Confirmed` only once `delay` has passed since the first poll.
    pub fn confirm_after(mut self, delay: Duration) -> Self {
        self.confirm_after = delay;
        self
    }

    pub fn fail_on_chain(mut self, reason: &str) -> Self {
        self.on_chain_error = Some(reason.to_string());
        self
    }

    /// The next `send_transaction` reaches the chain but answers with `error`.
    pub fn broadcast_fails(self, error: RpcError) -> Self {
        *self.broadcast_error.lock().unwrap() = Some(error);
        self
    }

    pub fn holding_tokens(mut self, ui_amount: f64) -> Self {
        self.token_balance = Some(TokenAmount {
            amount: ((ui_amount * 1e6) as u64).to_string(),
            decimals: 6,
            ui_amount: Some(ui_amount),
        });
        self
    }

    pub fn token_lookup_fails(mut self) -> Self {
        self.token_lookup_fails = true;
        self
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_balance(&self, _address: &Pubkey) -> RpcResult<Lamports> {
        Ok(self.balance)
    }

    async fn get_latest_blockhash(&self) -> RpcResult<(Hash, u64)> {
        self.blockhash_requests.fetch_add(1, Ordering::SeqCst);
        Ok((Hash::new_from_array([3; 32]), 100))
    }

    async fn get_signature_status(&self, _signature: &Signature) -> RpcResult<ConfirmationStatus> {
        if let Some(reason) = &self.on_chain_error {
            return Ok(ConfirmationStatus::Failed(reason.clone()));
        }
        let first = *self.first_poll.lock().unwrap().get_or_insert_with(Instant::now);
        if first.elapsed() >= self.confirm_after {
            Ok(ConfirmationStatus::Confirmed { slot: 7 })
        } else {
            Ok(ConfirmationStatus::Pending)
        }
    }

    async fn send_transaction(&self, tx: &Transaction) -> RpcResult<Signature> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.broadcast_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(tx.signatures[0])
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> RpcResult<Option<TokenAmount>> {
        self.token_queries.lock().unwrap().push(*account);
        if self.token_lookup_fails {
            return Err(RpcError::Node {
                code: -32602,
                message: "Invalid param: not a Token account".into(),
            });
        }
        Ok(self.token_balance.clone())
    }
}

pub struct FakeWallet {
    keypair: Keypair,
    reject: bool,
    pub sign_requests: AtomicU32,
    pub sent: AtomicU32,
    last: Mutex<Option<Transaction>>,
}

impl FakeWallet {
    pub fn approving() -> Self {
        Self {
            keypair: keypair_from_seed(&[1; 32]).unwrap(),
            reject: false,
            sign_requests: AtomicU32::new(0),
            sent: AtomicU32::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::approving()
        }
    }

    pub fn last_tx(&self) -> Option<Transaction> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_send(&self, mut tx: Transaction) -> WalletResult<Signature> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(WalletError::Rejected);
        }
        *self.last.lock().unwrap() = Some(tx.clone());
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Key(e.to_string()))?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(tx.signatures[0])
    }
}
