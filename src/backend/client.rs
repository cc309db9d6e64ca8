//! HTTP client for the crowdfunding backend.
//!
//! # Responsibilities
//! - Typed calls for every backend endpoint the client uses
//! - Attach `X-API-Key` (from the resolver) and `X-From-Vercel` to each request
//! - Decode `{ "error": "..." }` bodies into [`BackendError::Api`]
//! - Retry idempotent reads with jittered backoff
//!
//! # Design Decisions
//! - The flow only depends on the [`FundsBackend`] trait so it can run
//!   against in-memory fakes
//! - Writes (`pre-donate`, `donate`, `funds`, `launch`, `transfer`) are
//!   sent exactly once; a duplicate `donate` would record a payment twice

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backend::types::{
    BackendError, BackendResult, CreateFundPayload, CreatedFund, DonateRecord, ErrorBody,
    FeeSchedule, Fund, FundLeaderboard, FundPage, FundStatus, FundStatusResponse,
    LeaderboardEntry, MessageResponse, PreDonateRequest, PreDonateResponse, ProfileUpdate,
    RegisterUserRequest, TokenImage, UserProfile, UserWalletRequest,
};
use crate::config::{BackendConfig, RetryConfig};
use crate::resilience::backoff::backoff_for;
use crate::resilience::retries::is_retryable;
use crate::solana::RpcUrlResolver;

/// Marker header the backend uses to accept requests relayed by the gateway.
pub const FROM_PROXY_HEADER: &str = "X-From-Vercel";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Backend operations the funded flows and launch coordinator depend on.
#[async_trait]
pub trait FundsBackend: Send + Sync {
    async fn get_fee_schedule(&self) -> BackendResult<FeeSchedule>;

    async fn get_fund(&self, fund_id: &str) -> BackendResult<Fund>;

    async fn get_fund_status(&self, fund_id: &str) -> BackendResult<FundStatusResponse>;

    /// Step 1 of a donation: returns the authoritative receiving address.
    async fn pre_donate(
        &self,
        fund_id: &str,
        request: &PreDonateRequest,
    ) -> BackendResult<PreDonateResponse>;

    /// Step 5 of a donation: returns the updated fund.
    async fn donate(&self, fund_id: &str, record: &DonateRecord) -> BackendResult<Fund>;

    /// Step 5 of a fund creation.
    async fn create_fund(&self, payload: &CreateFundPayload) -> BackendResult<CreatedFund>;

    async fn launch(&self, fund_id: &str, request: &UserWalletRequest)
        -> BackendResult<MessageResponse>;

    async fn transfer(
        &self,
        fund_id: &str,
        request: &UserWalletRequest,
    ) -> BackendResult<MessageResponse>;
}

/// reqwest-backed [`FundsBackend`].
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    resolver: Arc<RpcUrlResolver>,
    retry: RetryConfig,
}

impl BackendClient {
    pub fn new(
        config: &BackendConfig,
        retry: RetryConfig,
        resolver: Arc<RpcUrlResolver>,
    ) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::Config(format!("base_url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "base_url '{}' cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            http,
            base_url,
            resolver,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `GET /funds?status=&page=&limit=`
    pub async fn list_funds(
        &self,
        status: Option<FundStatus>,
        page: u32,
        limit: u32,
    ) -> BackendResult<FundPage> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.request(Method::GET, &["funds"], &query, None::<&()>)
            .await
    }

    pub async fn get_token_image(&self, fund_id: &str) -> BackendResult<TokenImage> {
        self.get(&["token-images", fund_id, "token-image"]).await
    }

    pub async fn delete_token_image(&self, fund_id: &str) -> BackendResult<MessageResponse> {
        self.request(
            Method::DELETE,
            &["token-images", fund_id, "token-image"],
            &[],
            None::<&()>,
        )
        .await
    }

    pub async fn register_user(&self, wallet_address: &str) -> BackendResult<UserProfile> {
        let body = RegisterUserRequest {
            wallet_address: wallet_address.to_string(),
        };
        self.request(Method::POST, &["users", "register"], &[], Some(&body))
            .await
    }

    pub async fn get_user(&self, wallet_address: &str) -> BackendResult<UserProfile> {
        self.get(&["users", wallet_address]).await
    }

    pub async fn update_user(
        &self,
        wallet_address: &str,
        update: &ProfileUpdate,
    ) -> BackendResult<UserProfile> {
        self.request(
            Method::PUT,
            &["users", "update", wallet_address],
            &[],
            Some(update),
        )
        .await
    }

    pub async fn total_leaderboard(&self) -> BackendResult<Vec<LeaderboardEntry>> {
        self.get(&["users", "leaderboard", "total"]).await
    }

    pub async fn fund_leaderboard(&self, fund_id: &str) -> BackendResult<FundLeaderboard> {
        self.get(&["users", "leaderboard", "fund", fund_id]).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> BackendResult<T> {
        self.request(Method::GET, segments, &[], None::<&()>).await
    }

    /// `base_url` with `segments` appended, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request, retrying only when [`is_retryable`] allows it.
    async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> BackendResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let max_attempts = if self.retry.enabled {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let api_key = self.resolver.api_key().await;
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut req = self
                .http
                .request(method.clone(), url.clone())
                .header(API_KEY_HEADER, &api_key)
                .header(FROM_PROXY_HEADER, "true");
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            let result = req.send().await;
            let retry_status = match &result {
                Ok(resp) => Some(resp.status().as_u16()),
                Err(_) => None,
            };
            if attempt < max_attempts
                && is_retryable(&method, retry_status, result.is_err())
            {
                let delay = backoff_for(attempt, &self.retry);
                tracing::info!(
                    method = %method,
                    path = %path,
                    attempt,
                    delay = ?delay,
                    status = ?retry_status,
                    "Retrying backend request"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let resp = result.map_err(|e| {
                tracing::warn!(method = %method, path = %path, error = %e, "Backend unreachable");
                BackendError::Transport(e.to_string())
            })?;
            return decode(resp).await;
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> BackendResult<T> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    if !status.is_success() {
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .error
            .unwrap_or_else(|| format!("Backend returned {}", status.as_u16()));
        return Err(BackendError::Api {
            status: status.as_u16(),
            message,
            refund_signature: body.refund_signature,
        });
    }

    let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| BackendError::Decode(e.to_string()))
}

/// `POST /funds` answers with the created record, or `{ _id, message }`.
fn parse_created(value: Value) -> BackendResult<CreatedFund> {
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    let record = value.get("fund").cloned().unwrap_or_else(|| value.clone());
    let id = record
        .get("_id")
        .or_else(|| value.get("_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BackendError::Decode("created fund has no _id".to_string()))?;
    let fund = serde_json::from_value::<Fund>(record).ok();
    Ok(CreatedFund { id, message, fund })
}

#[async_trait]
impl FundsBackend for BackendClient {
    async fn get_fee_schedule(&self) -> BackendResult<FeeSchedule> {
        self.get(&["funds", "fee"]).await
    }

    async fn get_fund(&self, fund_id: &str) -> BackendResult<Fund> {
        self.get(&["funds", fund_id]).await
    }

    async fn get_fund_status(&self, fund_id: &str) -> BackendResult<FundStatusResponse> {
        self.get(&["funds", fund_id, "status"]).await
    }

    async fn pre_donate(
        &self,
        fund_id: &str,
        request: &PreDonateRequest,
    ) -> BackendResult<PreDonateResponse> {
        self.request(Method::POST, &["funds", fund_id, "pre-donate"], &[], Some(request))
            .await
    }

    async fn donate(&self, fund_id: &str, record: &DonateRecord) -> BackendResult<Fund> {
        self.request(Method::POST, &["funds", fund_id, "donate"], &[], Some(record))
            .await
    }

    async fn create_fund(&self, payload: &CreateFundPayload) -> BackendResult<CreatedFund> {
        let value: Value = self
            .request(Method::POST, &["funds"], &[], Some(payload))
            .await?;
        parse_created(value)
    }

    async fn launch(
        &self,
        fund_id: &str,
        request: &UserWalletRequest,
    ) -> BackendResult<MessageResponse> {
        self.request(Method::POST, &["funds", fund_id, "launch"], &[], Some(request))
            .await
    }

    async fn transfer(
        &self,
        fund_id: &str,
        request: &UserWalletRequest,
    ) -> BackendResult<MessageResponse> {
        self.request(Method::POST, &["funds", fund_id, "transfer"], &[], Some(request))
            .await
    }
}
