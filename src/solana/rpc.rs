//! Solana RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Hold one nonblocking `RpcClient` per endpoint, all at `confirmed`
//! - Query chain state (balances, blockhash, signature status, token balances)
//! - Broadcast signed transactions
//! - Handle timeouts and network errors by moving to the next endpoint

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind, Result as ClientResult};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError as ClientRpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::solana::transaction::Transaction;
use crate::solana::types::{
    ConfirmationStatus, Hash, Lamports, Pubkey, RpcError, RpcResult, Signature, TokenAmount,
};

/// Token account lookups for accounts that do not exist come back as this code.
const INVALID_PARAMS: i64 = -32602;

/// Chain operations the funded transaction flow depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance of `address`.
    async fn get_balance(&self, address: &Pubkey) -> RpcResult<Lamports>;

    /// A recent blockhash and the last block height it is valid for.
    async fn get_latest_blockhash(&self) -> RpcResult<(Hash, u64)>;

    /// Current status of `signature`.
    async fn get_signature_status(&self, signature: &Signature) -> RpcResult<ConfirmationStatus>;

    /// Broadcast a signed transaction.
    async fn send_transaction(&self, tx: &Transaction) -> RpcResult<Signature>;

    /// Balance of an SPL token account; `None` when the account does not exist.
    async fn get_token_account_balance(&self, account: &Pubkey) -> RpcResult<Option<TokenAmount>>;

    /// Poll `signature` until it is confirmed or fails.
    ///
    /// Never returns on its own while the transaction stays pending; callers
    /// race it against a deadline.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        poll_interval: Duration,
    ) -> RpcResult<ConfirmationStatus> {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            match self.get_signature_status(signature).await {
                Ok(status @ (ConfirmationStatus::Confirmed { .. } | ConfirmationStatus::Failed(_))) => {
                    return Ok(status);
                }
                Ok(status) => {
                    tracing::debug!(signature = %signature, ?status, "Transaction pending");
                }
                Err(e) => {
                    tracing::warn!(signature = %signature, error = %e, "Status poll failed");
                }
            }
        }
    }
}

struct Endpoint {
    url: String,
    client: Arc<RpcClient>,
}

/// Solana RPC client with failover support.
pub struct SolanaRpcClient {
    /// Primary endpoint followed by failovers.
    endpoints: Vec<Endpoint>,
    timeout_duration: Duration,
}

impl SolanaRpcClient {
    /// Create a client for `primary` plus `failovers`, each call bounded by `timeout_secs`.
    pub fn new(primary: &str, failovers: &[String], timeout_secs: u64) -> RpcResult<Self> {
        let timeout_duration = Duration::from_secs(timeout_secs);
        let connect = |url: &str| Endpoint {
            url: url.to_string(),
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout_duration,
                CommitmentConfig::confirmed(),
            )),
        };

        url::Url::parse(primary)
            .map_err(|e| RpcError::Rpc(format!("Invalid RPC URL '{}': {}", primary, e)))?;
        let mut endpoints = vec![connect(primary)];

        for url_str in failovers {
            if url::Url::parse(url_str).is_ok() {
                endpoints.push(connect(url_str));
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(rpc_url = %primary, failovers = endpoints.len() - 1, "RPC client initialized");

        Ok(Self {
            endpoints,
            timeout_duration,
        })
    }

    /// Primary endpoint.
    pub fn url(&self) -> &str {
        &self.endpoints[0].url
    }

    /// Run `op` against each endpoint in turn until one answers.
    ///
    /// A JSON-RPC error object is an answer, not a transport failure, and is
    /// returned without trying the remaining endpoints.
    async fn call<T, F, Fut>(&self, method: &'static str, op: F) -> RpcResult<T>
    where
        F: Fn(Arc<RpcClient>) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            match timeout(self.timeout_duration, op(endpoint.client.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => match classify(e) {
                    answered @ (RpcError::Node { .. } | RpcError::InvalidResponse(_)) => {
                        return Err(answered);
                    }
                    other => {
                        tracing::warn!(provider_idx = i, method, error = %other, "RPC error, trying next provider");
                    }
                },
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                }
            }
            metrics::record_rpc_failover(method);
        }
        Err(RpcError::Rpc(format!("All RPC providers failed for {}", method)))
    }

    /// Check if the node is reachable and healthy.
    pub async fn is_healthy(&self) -> bool {
        self.call("getHealth", |rpc| async move { rpc.get_health().await })
            .await
            .is_ok()
    }
}

/// Map a client error onto [`RpcError`], keeping node answers apart from
/// transport failures.
fn classify(e: ClientError) -> RpcError {
    match e.kind() {
        ClientErrorKind::RpcError(ClientRpcError::RpcResponseError { code, message, .. }) => {
            RpcError::Node {
                code: *code,
                message: message.clone(),
            }
        }
        ClientErrorKind::RpcError(ClientRpcError::ParseError(what)) => {
            RpcError::InvalidResponse(what.clone())
        }
        ClientErrorKind::SerdeJson(err) => RpcError::InvalidResponse(err.to_string()),
        _ => RpcError::Rpc(e.to_string()),
    }
}

#[async_trait]
impl ChainClient for SolanaRpcClient {
    async fn get_balance(&self, address: &Pubkey) -> RpcResult<Lamports> {
        let address = *address;
        let lamports = self
            .call("getBalance", |rpc| async move { rpc.get_balance(&address).await })
            .await?;
        Ok(Lamports(lamports))
    }

    async fn get_latest_blockhash(&self) -> RpcResult<(Hash, u64)> {
        self.call("getLatestBlockhash", |rpc| async move {
            rpc.get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
                .await
        })
        .await
    }

    async fn get_signature_status(&self, signature: &Signature) -> RpcResult<ConfirmationStatus> {
        let signature = *signature;
        let response = self
            .call("getSignatureStatuses", |rpc| async move {
                rpc.get_signature_statuses(&[signature]).await
            })
            .await?;
        let status = match response.value.into_iter().next().flatten() {
            None => ConfirmationStatus::Pending,
            Some(s) => match s.err {
                Some(err) => ConfirmationStatus::Failed(err.to_string()),
                None if s.satisfies_commitment(CommitmentConfig::confirmed()) => {
                    ConfirmationStatus::Confirmed { slot: s.slot }
                }
                None => ConfirmationStatus::Processed { slot: s.slot },
            },
        };
        Ok(status)
    }

    async fn send_transaction(&self, tx: &Transaction) -> RpcResult<Signature> {
        self.call("sendTransaction", |rpc| {
            let tx = tx.clone();
            async move { rpc.send_transaction(&tx).await }
        })
        .await
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> RpcResult<Option<TokenAmount>> {
        let account = *account;
        let result = self
            .call("getTokenAccountBalance", |rpc| async move {
                rpc.get_token_account_balance(&account).await
            })
            .await;
        match result {
            Ok(balance) => Ok(Some(TokenAmount {
                amount: balance.amount,
                decimals: balance.decimals,
                ui_amount: balance.ui_amount,
            })),
            Err(RpcError::Node { code: INVALID_PARAMS, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for SolanaRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpcClient")
            .field("rpc_url", &self.endpoints[0].url)
            .field("failovers", &(self.endpoints.len() - 1))
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
