//! Typed requests for each funded action, validated before dispatch.

use crate::backend::types::{CreateFundPayload, FeeSchedule};
use crate::flow::errors::FlowError;
use crate::solana::Pubkey;

pub const MAX_TICKER_LEN: usize = 12;
pub const MAX_DESCRIPTION_LEN: usize = 150;

/// Donate `amount_sol` to a fund.
#[derive(Debug, Clone, PartialEq)]
pub struct DonateRequest {
    pub fund_id: String,
    pub amount_sol: f64,
}

impl DonateRequest {
    pub fn new(fund_id: impl Into<String>, amount_sol: f64) -> Self {
        Self {
            fund_id: fund_id.into(),
            amount_sol,
        }
    }

    /// Local checks; `limits` adds the backend's donation bounds.
    pub fn validate(&self, limits: Option<&FeeSchedule>) -> Result<(), FlowError> {
        if self.fund_id.trim().is_empty() {
            return Err(FlowError::Validation("Fund id is required".into()));
        }
        if !self.amount_sol.is_finite() || self.amount_sol <= 0.0 {
            return Err(FlowError::Validation(
                "Donation amount must be a positive number".into(),
            ));
        }
        if let Some(limits) = limits {
            if !limits.contains(self.amount_sol) {
                return Err(FlowError::Validation(format!(
                    "Donation amount must be between {:.2} and {:.2} SOL",
                    limits.min_donation, limits.max_donation
                )));
            }
        }
        Ok(())
    }
}

/// Fund creation form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateFundRequest {
    pub name: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_description: String,
    pub target_percentage: f64,
    /// Wallet that receives the launched tokens; may be empty.
    pub target_wallet: String,
    pub token_twitter: Option<String>,
    pub token_telegram: Option<String>,
    pub token_website: Option<String>,
}

impl CreateFundRequest {
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::Validation("Fund name is required".into()));
        }
        if self.token_name.trim().is_empty() {
            return Err(FlowError::Validation("Token name is required".into()));
        }
        let symbol = &self.token_symbol;
        if symbol.is_empty()
            || symbol.len() > MAX_TICKER_LEN
            || !symbol.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(FlowError::Validation(
                "Ticker must be 1-12 alphanumeric characters with no spaces or special characters."
                    .into(),
            ));
        }
        if self.token_description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(FlowError::Validation(
                "Description must be 150 characters or fewer.".into(),
            ));
        }
        if !(self.target_percentage > 0.0 && self.target_percentage <= 100.0) {
            return Err(FlowError::Validation(
                "Target percentage must be between 0 and 100".into(),
            ));
        }
        if !self.target_wallet.is_empty() && self.target_wallet.parse::<Pubkey>().is_err() {
            return Err(FlowError::Validation(format!(
                "Target wallet {} is not a valid address",
                self.target_wallet
            )));
        }
        Ok(())
    }

    /// Backend body for `POST /funds` once the fee is paid.
    pub fn into_payload(self, user_wallet: String, tx_signature: String) -> CreateFundPayload {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        CreateFundPayload {
            name: self.name,
            token_name: self.token_name,
            token_symbol: self.token_symbol,
            token_description: self.token_description,
            target_percentage: self.target_percentage,
            target_wallet: self.target_wallet,
            token_twitter: non_empty(self.token_twitter),
            token_telegram: non_empty(self.token_telegram),
            token_website: non_empty(self.token_website),
            user_wallet,
            tx_signature,
        }
    }
}

/// One funded action.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowAction {
    Donate(DonateRequest),
    CreateFund(CreateFundRequest),
}

impl FlowAction {
    pub fn name(&self) -> &'static str {
        match self {
            FlowAction::Donate(_) => "donate",
            FlowAction::CreateFund(_) => "create_fund",
        }
    }

    /// Key in the pending map: the fund id, or `create:<payer>`.
    pub fn pending_key(&self, payer: &Pubkey) -> String {
        match self {
            FlowAction::Donate(req) => req.fund_id.clone(),
            FlowAction::CreateFund(_) => format!("create:{payer}"),
        }
    }
}
