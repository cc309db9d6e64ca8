//! Crowdfunding backend data model and wire types.
//!
//! Field names follow the backend's camelCase JSON; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundStatus {
    Active,
    Completed,
}

impl std::fmt::Display for FundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundStatus::Active => f.write_str("active"),
            FundStatus::Completed => f.write_str("completed"),
        }
    }
}

/// Owner reference; populated as a user object on most endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    User {
        #[serde(rename = "walletAddress")]
        wallet_address: String,
    },
    Id(String),
}

impl UserRef {
    pub fn wallet_address(&self) -> Option<&str> {
        match self {
            UserRef::User { wallet_address } => Some(wallet_address),
            UserRef::Id(_) => None,
        }
    }
}

/// A fundraising campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub owner: Option<UserRef>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub fund_wallet_address: String,
    pub token_name: String,
    pub token_symbol: String,
    #[serde(default)]
    pub token_description: String,
    #[serde(default)]
    pub token_twitter: Option<String>,
    #[serde(default)]
    pub token_telegram: Option<String>,
    #[serde(default)]
    pub token_website: Option<String>,
    #[serde(default)]
    pub target_percentage: f64,
    pub target_sol_amount: f64,
    #[serde(default)]
    pub current_donated_sol: f64,
    #[serde(default)]
    pub initial_fee_paid: f64,
    #[serde(default)]
    pub target_wallet: String,
    pub status: FundStatus,
    #[serde(default)]
    pub launch_fee: f64,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub token_ca: Option<String>,
    #[serde(default)]
    pub launch_error: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Fund {
    pub fn is_completed(&self) -> bool {
        self.status == FundStatus::Completed || self.current_donated_sol >= self.target_sol_amount
    }

    /// Whether the client should still offer donation input.
    pub fn accepts_donations(&self) -> bool {
        !self.is_completed()
    }

    pub fn remaining_sol(&self) -> f64 {
        (self.target_sol_amount - self.current_donated_sol).max(0.0)
    }

    /// Progress towards the target, clamped to `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        if self.target_sol_amount <= 0.0 {
            return 100.0;
        }
        (self.current_donated_sol / self.target_sol_amount * 100.0).clamp(0.0, 100.0)
    }

    pub fn owner_wallet(&self) -> Option<&str> {
        self.owner.as_ref().and_then(UserRef::wallet_address)
    }

    /// Replace the local copy with a backend snapshot.
    ///
    /// The raised amount never moves backwards while the fund is active, and a
    /// populated owner is kept when the snapshot only carries an id.
    pub fn apply_snapshot(&mut self, snapshot: Fund) {
        let raised = if snapshot.status == FundStatus::Active {
            snapshot.current_donated_sol.max(self.current_donated_sol)
        } else {
            snapshot.current_donated_sol
        };
        let keep_local_owner = matches!(snapshot.owner, Some(UserRef::Id(_)) | None)
            && matches!(self.owner, Some(UserRef::User { .. }));
        let owner = if keep_local_owner {
            self.owner.take()
        } else {
            snapshot.owner.clone()
        };
        *self = Fund {
            current_donated_sol: raised,
            owner,
            ..snapshot
        };
    }

    /// Patch after losing the completion race.
    pub fn mark_completed(&mut self) {
        self.status = FundStatus::Completed;
        self.current_donated_sol = self.current_donated_sol.max(self.target_sol_amount);
    }
}

/// Donation bounds and creation fee, owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub min_donation: f64,
    pub max_donation: f64,
    #[serde(default)]
    pub creation_fee: Option<f64>,
}

impl FeeSchedule {
    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min_donation && amount <= self.max_donation
    }

    pub fn creation_fee_or(&self, default: f64) -> f64 {
        self.creation_fee.filter(|fee| *fee > 0.0).unwrap_or(default)
    }
}

/// One page of a fund listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPage {
    pub funds: Vec<Fund>,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundStatusResponse {
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreDonateRequest {
    pub amount: f64,
    pub donor_wallet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreDonateResponse {
    pub fund_wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateRecord {
    pub amount: f64,
    pub donor_wallet: String,
    pub tx_signature: String,
}

/// Fund creation form as the backend receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFundPayload {
    pub name: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_description: String,
    pub target_percentage: f64,
    pub target_wallet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_website: Option<String>,
    pub user_wallet: String,
    pub tx_signature: String,
}

/// Result of `POST /funds`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedFund {
    pub id: String,
    pub message: Option<String>,
    /// Present when the backend echoes the full record.
    pub fund: Option<Fund>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWalletRequest {
    pub user_wallet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationFund {
    pub name: String,
    pub token_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[serde(rename = "fundId")]
    pub fund: DonationFund,
    pub amount: f64,
    pub donated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub wallet_address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_donated_sol: f64,
    #[serde(default)]
    pub donations: Vec<Donation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub wallet_address: String,
    pub total_donated_sol: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundLeaderboardEntry {
    pub wallet_address: String,
    pub total_for_fund: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundLeaderboard {
    #[serde(default)]
    pub fund_name: Option<String>,
    #[serde(default)]
    pub leaderboard: Vec<FundLeaderboardEntry>,
}

/// Error body of a non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub refund_signature: Option<String>,
}

/// Errors from the crowdfunding backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        refund_signature: Option<String>,
    },

    /// The request never got an answer.
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// The answer could not be decoded.
    #[error("Invalid backend response: {0}")]
    Decode(String),

    /// The client could not be built from its configuration.
    #[error("Invalid backend client configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// The fund reached its target before this request was processed.
    pub fn is_already_completed(&self) -> bool {
        matches!(self, BackendError::Api { message, .. }
            if message.to_ascii_lowercase().contains("already completed"))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn refund_signature(&self) -> Option<&str> {
        match self {
            BackendError::Api { refund_signature, .. } => refund_signature.as_deref(),
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
