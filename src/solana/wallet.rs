//! Wallet management and transaction signing.
//!
//! # Security
//! - Keypairs are loaded ONLY from environment variables or files
//! - Keys are never logged or serialized

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use thiserror::Error;

use crate::solana::rpc::ChainClient;
use crate::solana::transaction::Transaction;
use crate::solana::types::{Pubkey, RpcError, Signature};

/// Environment variable holding the base58 (64-byte) keypair or a JSON byte array.
pub const KEYPAIR_ENV_VAR: &str = "CROWDFUND_WALLET_KEYPAIR";

#[derive(Debug, Error)]
pub enum WalletError {
    /// The user declined to sign.
    #[error("Transaction cancelled in wallet")]
    Rejected,

    /// Invalid keypair format or derivation error.
    #[error("Wallet error: {0}")]
    Key(String),

    /// The node refused the signed transaction; it was not broadcast.
    #[error("Broadcast failed: {0}")]
    Broadcast(RpcError),

    /// The signed transaction was handed to the network but no answer came
    /// back. It may still land under `signature`.
    #[error("Broadcast of {signature} unconfirmed: {source}")]
    Unconfirmed {
        signature: Signature,
        source: RpcError,
    },
}

pub type WalletResult<T> = Result<T, WalletError>;

/// A wallet that can sign a transaction and broadcast it in one step.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Address of the signing account.
    fn address(&self) -> Pubkey;

    /// Sign `tx` and submit it; returns the transaction signature.
    async fn sign_and_send(&self, tx: Transaction) -> WalletResult<Signature>;
}

/// Asks the user to approve a transaction before it is signed.
pub trait Approval: Send + Sync {
    fn approve(&self, tx: &Transaction) -> bool;
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Approval for AutoApprove {
    fn approve(&self, _tx: &Transaction) -> bool {
        true
    }
}

/// A local keypair that signs and broadcasts through a [`ChainClient`].
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    chain: Arc<dyn ChainClient>,
    approval: Arc<dyn Approval>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, chain: Arc<dyn ChainClient>) -> Self {
        tracing::info!(address = %keypair.pubkey(), "Wallet initialized");
        Self {
            keypair: Arc::new(keypair),
            chain,
            approval: Arc::new(AutoApprove),
        }
    }

    /// Require `approval` before every signature.
    pub fn with_approval(mut self, approval: Arc<dyn Approval>) -> Self {
        self.approval = approval;
        self
    }

    /// Parse a keypair from base58 (64 bytes: secret || public) or a JSON
    /// array of 64 numbers, the two formats wallets export.
    ///
    /// The public half must match the one derived from the secret half.
    pub fn parse_keypair(encoded: &str) -> WalletResult<Keypair> {
        let encoded = encoded.trim();
        let bytes: Vec<u8> = if encoded.starts_with('[') {
            serde_json::from_str(encoded)
                .map_err(|e| WalletError::Key(format!("Invalid keypair JSON: {}", e)))?
        } else {
            bs58::decode(encoded)
                .into_vec()
                .map_err(|e| WalletError::Key(format!("Invalid keypair encoding: {}", e)))?
        };
        if bytes.len() != 64 {
            return Err(WalletError::Key(format!(
                "Invalid keypair length: {}",
                bytes.len()
            )));
        }
        let (secret, public) = bytes.split_at(32);
        let keypair = keypair_from_seed(secret)
            .map_err(|e| WalletError::Key(format!("Invalid keypair: {}", e)))?;
        if keypair.pubkey().as_ref() != public {
            return Err(WalletError::Key(
                "Invalid keypair: public key does not match secret key".to_string(),
            ));
        }
        Ok(keypair)
    }

    /// Load keypair from environment variable.
    pub fn from_env(chain: Arc<dyn ChainClient>) -> WalletResult<Self> {
        let encoded = std::env::var(KEYPAIR_ENV_VAR).map_err(|_| {
            WalletError::Key(format!("Environment variable {} not set", KEYPAIR_ENV_VAR))
        })?;
        Ok(Self::new(Self::parse_keypair(&encoded)?, chain))
    }

    /// Load keypair from a file in either supported format.
    pub fn from_file(path: &std::path::Path, chain: Arc<dyn ChainClient>) -> WalletResult<Self> {
        let encoded = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Key(format!("Cannot read {}: {}", path.display(), e)))?;
        Ok(Self::new(Self::parse_keypair(&encoded)?, chain))
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_send(&self, mut tx: Transaction) -> WalletResult<Signature> {
        if !self.approval.approve(&tx) {
            return Err(WalletError::Rejected);
        }
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&*self.keypair], blockhash)
            .map_err(|e| WalletError::Key(e.to_string()))?;
        let signature = tx
            .signatures
            .first()
            .copied()
            .ok_or_else(|| WalletError::Key("Transaction has no signature slot".to_string()))?;

        match self.chain.send_transaction(&tx).await {
            Ok(returned) => {
                if returned != signature {
                    tracing::warn!(expected = %signature, %returned, "Node returned a different signature");
                }
                Ok(signature)
            }
            Err(e) if e.outcome_unknown() => {
                tracing::warn!(%signature, error = %e, "Broadcast outcome unknown");
                Err(WalletError::Unconfirmed {
                    signature,
                    source: e,
                })
            }
            Err(e) => Err(WalletError::Broadcast(e)),
        }
    }
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("address", &self.address())
            .finish()
    }
}
