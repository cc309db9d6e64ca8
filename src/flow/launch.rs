//! Token launch and manual transfer for completed funds.
//!
//! Launches are requested by the fund creator, rate limited by a per-fund
//! cooldown that survives restarts, and followed by polling until the
//! backend reports the new token address.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::types::{Fund, MessageResponse, UserWalletRequest};
use crate::backend::FundsBackend;
use crate::config::LaunchConfig;
use crate::flow::errors::LaunchError;
use crate::session::SessionStore;
use crate::solana::{ChainClient, Pubkey};
use spl_associated_token_account::get_associated_token_address;

pub struct LaunchCoordinator {
    backend: Arc<dyn FundsBackend>,
    chain: Arc<dyn ChainClient>,
    session: Arc<SessionStore>,
    config: LaunchConfig,
}

impl LaunchCoordinator {
    pub fn new(
        backend: Arc<dyn FundsBackend>,
        chain: Arc<dyn ChainClient>,
        session: Arc<SessionStore>,
        config: LaunchConfig,
    ) -> Self {
        Self {
            backend,
            chain,
            session,
            config,
        }
    }

    /// Ask the backend to launch the fund's token.
    ///
    /// The cooldown starts before the request is sent, so a failed request
    /// still blocks an immediate retry.
    pub async fn launch(
        &self,
        fund: &Fund,
        caller: &Pubkey,
        image_url: Option<&str>,
    ) -> Result<MessageResponse, LaunchError> {
        ensure_creator(fund, caller, "launch the token")?;
        if !matches!(image_url.or(fund.image.as_deref()), Some(url) if !url.is_empty()) {
            return Err(LaunchError::MissingImage);
        }
        let remaining_secs = self.session.cooldown_remaining(&fund.id);
        if remaining_secs > 0 {
            return Err(LaunchError::CoolingDown { remaining_secs });
        }

        self.session.start_cooldown(&fund.id);
        tracing::info!(fund_id = %fund.id, "Requesting token launch");
        let request = UserWalletRequest {
            user_wallet: caller.to_string(),
        };
        let response = self.backend.launch(&fund.id, &request).await.map_err(|e| {
            tracing::warn!(fund_id = %fund.id, error = %e, "Launch request failed");
            LaunchError::from(e)
        })?;
        Ok(response)
    }

    /// Poll the fund until it carries a token address.
    pub async fn wait_for_token(&self, fund_id: &str) -> Result<String, LaunchError> {
        let every = Duration::from_secs(self.config.poll_interval_secs);
        let attempts = self.config.max_poll_attempts;
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        for attempt in 1..=attempts {
            ticker.tick().await;
            match self.backend.get_fund(fund_id).await {
                Ok(fund) => {
                    if let Some(token) = fund.token_address.filter(|t| !t.is_empty()) {
                        tracing::info!(fund_id, token = %token, attempt, "Token launched");
                        return Ok(token);
                    }
                    if let Some(err) = fund.launch_error {
                        tracing::warn!(fund_id, error = %err, "Backend reported launch error");
                    }
                }
                Err(e) => tracing::warn!(fund_id, attempt, error = %e, "Launch poll failed"),
            }
        }
        Err(LaunchError::TokenNotReady { attempts })
    }

    /// Ask the backend to move the launched tokens to the target wallet.
    pub async fn transfer(
        &self,
        fund: &Fund,
        caller: &Pubkey,
    ) -> Result<MessageResponse, LaunchError> {
        ensure_creator(fund, caller, "trigger a manual transfer")?;
        let request = UserWalletRequest {
            user_wallet: caller.to_string(),
        };
        Ok(self.backend.transfer(&fund.id, &request).await?)
    }

    /// Whether the target wallet's token account holds any tokens.
    ///
    /// The account is the target wallet's associated token account for the
    /// fund's mint unless `token_account` names one. A lookup that fails or
    /// finds no account means nothing was transferred yet.
    pub async fn is_transferred(
        &self,
        fund: &Fund,
        token_account: Option<&str>,
    ) -> Result<bool, LaunchError> {
        let Some(mint) = fund.token_address.as_deref().filter(|_| fund.is_completed()) else {
            return Ok(false);
        };
        let account = match token_account {
            Some(account) => account
                .parse::<Pubkey>()
                .map_err(|_| LaunchError::InvalidAddress(account.to_string()))?,
            None => {
                let (Ok(wallet), Ok(mint)) =
                    (fund.target_wallet.parse::<Pubkey>(), mint.parse::<Pubkey>())
                else {
                    tracing::debug!(fund_id = %fund.id, "Cannot derive token account");
                    return Ok(false);
                };
                get_associated_token_address(&wallet, &mint)
            }
        };

        match self.chain.get_token_account_balance(&account).await {
            Ok(balance) => Ok(balance
                .and_then(|b| b.ui_amount)
                .is_some_and(|amount| amount > 0.0)),
            Err(e) => {
                tracing::debug!(fund_id = %fund.id, account = %account, error = %e, "Token account lookup failed");
                Ok(false)
            }
        }
    }
}

fn ensure_creator(fund: &Fund, caller: &Pubkey, what: &'static str) -> Result<(), LaunchError> {
    match fund.owner_wallet() {
        Some(owner) if owner == caller.to_string() => Ok(()),
        _ => Err(LaunchError::NotCreator(what)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::fixtures;
    use crate::config::SessionConfig;
    use crate::flow::testing::{FakeBackend, FakeChain, FUND_WALLET};
    use crate::solana::Lamports;
    use std::sync::atomic::Ordering;

    fn owner() -> Pubkey {
        fixtures::OWNER.parse().unwrap()
    }

    fn coordinator(backend: FakeBackend, chain: FakeChain) -> (LaunchCoordinator, Arc<FakeBackend>) {
        let (launcher, backend, _) = coordinator_on(backend, chain);
        (launcher, backend)
    }

    fn coordinator_on(
        backend: FakeBackend,
        chain: FakeChain,
    ) -> (LaunchCoordinator, Arc<FakeBackend>, Arc<FakeChain>) {
        let backend = Arc::new(backend);
        let chain = Arc::new(chain);
        let session = Arc::new(SessionStore::new(&SessionConfig::default()));
        let config = LaunchConfig {
            poll_interval_secs: 5,
            max_poll_attempts: 3,
        };
        (
            LaunchCoordinator::new(backend.clone(), chain.clone(), session, config),
            backend,
            chain,
        )
    }

    #[tokio::test]
    async fn test_launch_requires_creator_and_image() {
        let fund = fixtures::fund("f1", 10.0, 10.0);
        let (launcher, backend) =
            coordinator(FakeBackend::with_fund(fund.clone()), FakeChain::funded(Lamports(0)));

        let stranger = Pubkey::new_from_array([1; 32]);
        let err = launcher.launch(&fund, &stranger, Some("img")).await.unwrap_err();
        assert_eq!(err.to_string(), "Only the fund creator can launch the token");

        let err = launcher.launch(&fund, &owner(), None).await.unwrap_err();
        assert!(matches!(err, LaunchError::MissingImage));
        assert_eq!(backend.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_launch() {
        let fund = fixtures::fund("f1", 10.0, 10.0);
        let (launcher, backend) =
            coordinator(FakeBackend::with_fund(fund.clone()), FakeChain::funded(Lamports(0)));

        launcher.launch(&fund, &owner(), Some("img")).await.unwrap();
        let err = launcher.launch(&fund, &owner(), Some("img")).await.unwrap_err();
        assert!(matches!(err, LaunchError::CoolingDown { remaining_secs } if remaining_secs > 290));
        assert_eq!(err.to_string(), "Please wait 5 minute(s) before launching again.");
        assert_eq!(backend.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_token_polls() {
        let fund = fixtures::fund("f1", 10.0, 10.0);
        let (launcher, backend) = coordinator(
            FakeBackend::with_fund(fund).token_after(2),
            FakeChain::funded(Lamports(0)),
        );

        let token = launcher.wait_for_token("f1").await.unwrap();
        assert_eq!(token, FUND_WALLET);
        assert_eq!(backend.fund_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_token_gives_up() {
        let fund = fixtures::fund("f1", 10.0, 10.0);
        let (launcher, _) =
            coordinator(FakeBackend::with_fund(fund), FakeChain::funded(Lamports(0)));

        let err = launcher.wait_for_token("f1").await.unwrap_err();
        assert!(matches!(err, LaunchError::TokenNotReady { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_transfer_creator_only() {
        let fund = fixtures::fund("f1", 10.0, 10.0);
        let (launcher, backend) =
            coordinator(FakeBackend::with_fund(fund.clone()), FakeChain::funded(Lamports(0)));

        assert!(launcher.transfer(&fund, &Pubkey::new_from_array([1; 32])).await.is_err());
        let msg = launcher.transfer(&fund, &owner()).await.unwrap();
        assert_eq!(msg.message.as_deref(), Some("Tokens transferred"));
        assert_eq!(backend.transfers.load(Ordering::SeqCst), 1);
    }

    fn launched_fund() -> Fund {
        let mut fund = fixtures::fund("f1", 10.0, 10.0);
        fund.token_address = Some(FUND_WALLET.into());
        fund.target_wallet = fixtures::OWNER.into();
        fund
    }

    #[tokio::test]
    async fn test_is_transferred_reads_associated_token_account() {
        let fund = launched_fund();
        let expected = get_associated_token_address(&owner(), &FUND_WALLET.parse().unwrap());

        let (empty, _, chain) =
            coordinator_on(FakeBackend::with_fund(fund.clone()), FakeChain::funded(Lamports(0)));
        assert!(!empty.is_transferred(&fund, None).await.unwrap());
        assert_eq!(*chain.token_queries.lock().unwrap(), vec![expected]);

        let (holding, _, chain) = coordinator_on(
            FakeBackend::with_fund(fund.clone()),
            FakeChain::funded(Lamports(0)).holding_tokens(1_000.0),
        );
        assert!(holding.is_transferred(&fund, None).await.unwrap());
        assert_eq!(*chain.token_queries.lock().unwrap(), vec![expected]);

        let active = fixtures::fund("f2", 10.0, 1.0);
        assert!(!holding.is_transferred(&active, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_transferred_explicit_account() {
        let fund = launched_fund();
        let (launcher, _, chain) = coordinator_on(
            FakeBackend::with_fund(fund.clone()),
            FakeChain::funded(Lamports(0)).holding_tokens(5.0),
        );

        assert!(launcher.is_transferred(&fund, Some(FUND_WALLET)).await.unwrap());
        assert_eq!(
            *chain.token_queries.lock().unwrap(),
            vec![FUND_WALLET.parse::<Pubkey>().unwrap()]
        );
        let err = launcher.is_transferred(&fund, Some("not-an-address")).await.unwrap_err();
        assert!(matches!(err, LaunchError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_failed_token_lookup_is_not_transferred() {
        let fund = launched_fund();
        let (launcher, _, chain) = coordinator_on(
            FakeBackend::with_fund(fund.clone()),
            FakeChain::funded(Lamports(0)).holding_tokens(5.0).token_lookup_fails(),
        );
        assert!(!launcher.is_transferred(&fund, None).await.unwrap());
        assert_eq!(chain.token_queries.lock().unwrap().len(), 1);

        let mut unknown_target = launched_fund();
        unknown_target.target_wallet = "nobody".into();
        assert!(!launcher.is_transferred(&unknown_target, None).await.unwrap());
        assert_eq!(chain.token_queries.lock().unwrap().len(), 1);
    }
}
