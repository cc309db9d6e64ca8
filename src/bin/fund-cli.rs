use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crowdfund_gateway::backend::types::ProfileUpdate;
use crowdfund_gateway::backend::{BackendClient, FundStatus, FundsBackend};
use crowdfund_gateway::config::{load_or_default, GatewayConfig};
use crowdfund_gateway::flow::{
    CreateFundRequest, DonateRequest, FlowError, FlowObserver, FlowReceipt, FlowState,
    FundedTransactionFlow, LaunchCoordinator, Notice,
};
use crowdfund_gateway::lifecycle::{signals, Shutdown};
use crowdfund_gateway::observability::logging;
use crowdfund_gateway::session::SessionStore;
use crowdfund_gateway::solana::transaction::{fee_payer, Transaction};
use crowdfund_gateway::solana::wallet::Approval;
use crowdfund_gateway::solana::{
    ChainClient, KeypairWallet, Pubkey, RpcUrlResolver, SolanaRpcClient, WalletProvider,
};

#[derive(Parser)]
#[command(name = "fund-cli")]
#[command(about = "Donate to, create and launch Solana crowdfunds", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keypair file; defaults to the CROWDFUND_WALLET_KEYPAIR variable.
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// Sign without asking for confirmation.
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Donate SOL to a fund
    Donate { fund_id: String, amount_sol: f64 },
    /// Pay the creation fee and create a fund
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        token_name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        target_percentage: f64,
        #[arg(long, default_value = "")]
        target_wallet: String,
        #[arg(long)]
        twitter: Option<String>,
        #[arg(long)]
        telegram: Option<String>,
        #[arg(long)]
        website: Option<String>,
    },
    /// Show one fund
    Fund { fund_id: String },
    /// List funds
    Funds {
        #[arg(long)]
        completed: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show donation bounds and creation fee
    Fee,
    /// Launch the token of a completed fund
    Launch {
        fund_id: String,
        #[arg(long)]
        image: Option<String>,
        /// Poll until the token address is known.
        #[arg(long)]
        wait: bool,
    },
    /// Move launched tokens to the fund's target wallet
    Transfer { fund_id: String },
    /// Check whether launched tokens reached the target wallet
    Transferred {
        fund_id: String,
        #[arg(long)]
        token_account: Option<String>,
    },
    /// Show, register or update a user profile
    Profile {
        wallet: Option<String>,
        #[arg(long)]
        register: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Donor leaderboard, overall or for one fund
    Leaderboard { fund_id: Option<String> },
    /// Show or delete a fund's token image
    Image {
        fund_id: String,
        #[arg(long)]
        delete: bool,
    },
    /// Active launch cooldowns
    Cooldowns,
}

/// Prompts on the terminal before each signature.
struct PromptApproval;

impl Approval for PromptApproval {
    fn approve(&self, tx: &Transaction) -> bool {
        let Some(payer) = fee_payer(tx) else {
            return false;
        };
        eprintln!(
            "Sign transaction from {} ({} instruction(s), {} account(s))? [y/N]",
            payer,
            tx.message.instructions.len(),
            tx.message.account_keys.len()
        );
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

/// Prints every state change of a running flow.
struct PrintObserver;

impl FlowObserver for PrintObserver {
    fn on_transition(&self, key: &str, state: FlowState) {
        eprintln!("[{key}] {state}");
    }
}

struct Context {
    config: GatewayConfig,
    backend: Arc<BackendClient>,
    chain: Arc<SolanaRpcClient>,
    session: Arc<SessionStore>,
}

impl Context {
    async fn build(config: GatewayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let resolver = Arc::new(RpcUrlResolver::new(
            &config.backend.gateway_url,
            &config.network,
        )?);
        let endpoint = resolver.resolve().await;
        let chain = Arc::new(SolanaRpcClient::new(
            &endpoint.rpc_url,
            &config.network.failover_urls,
            config.network.rpc_timeout_secs,
        )?);
        let backend = Arc::new(BackendClient::new(
            &config.backend,
            config.retries.clone(),
            resolver,
        )?);
        let session = Arc::new(SessionStore::load(&config.session)?);
        Ok(Self {
            config,
            backend,
            chain,
            session,
        })
    }

    fn wallet(
        &self,
        keypair: Option<&std::path::Path>,
        auto_approve: bool,
    ) -> Result<KeypairWallet, Box<dyn std::error::Error>> {
        let chain: Arc<dyn ChainClient> = self.chain.clone();
        let wallet = match keypair {
            Some(path) => KeypairWallet::from_file(path, chain)?,
            None => KeypairWallet::from_env(chain)?,
        };
        Ok(if auto_approve {
            wallet
        } else {
            wallet.with_approval(Arc::new(PromptApproval))
        })
    }

    fn flow(&self, wallet: KeypairWallet) -> FundedTransactionFlow {
        FundedTransactionFlow::new(
            self.backend.clone(),
            self.chain.clone(),
            Arc::new(wallet),
            self.session.clone(),
            self.config.flow.clone(),
        )
        .with_observer(Arc::new(PrintObserver))
    }

    fn launcher(&self) -> LaunchCoordinator {
        LaunchCoordinator::new(
            self.backend.clone(),
            self.chain.clone(),
            self.session.clone(),
            self.config.launch.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    logging::init(&logging::directives_for(&config.observability.log_level));

    let ctx = Context::build(config).await?;

    let shutdown = Shutdown::new();
    let timer = ctx
        .session
        .start(Duration::from_millis(ctx.config.session.tick_ms), &shutdown);
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::trigger_on_signal(&signal_shutdown).await;
    });

    let result = run(&cli, &ctx).await;

    shutdown.trigger();
    timer.join().await;
    result
}

async fn run(cli: &Cli, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Donate {
            fund_id,
            amount_sol,
        } => {
            let flow = ctx.flow(ctx.wallet(cli.keypair.as_deref(), cli.yes)?);
            let result = flow.donate(DonateRequest::new(fund_id, *amount_sol)).await;
            print_outcome(&result);
        }
        Commands::Create {
            name,
            token_name,
            symbol,
            description,
            target_percentage,
            target_wallet,
            twitter,
            telegram,
            website,
        } => {
            let flow = ctx.flow(ctx.wallet(cli.keypair.as_deref(), cli.yes)?);
            let request = CreateFundRequest {
                name: name.clone(),
                token_name: token_name.clone(),
                token_symbol: symbol.clone(),
                token_description: description.clone(),
                target_percentage: *target_percentage,
                target_wallet: target_wallet.clone(),
                token_twitter: twitter.clone(),
                token_telegram: telegram.clone(),
                token_website: website.clone(),
            };
            let result = flow.create_fund(request).await;
            print_outcome(&result);
        }
        Commands::Fund { fund_id } => {
            let fund = ctx.backend.get_fund(fund_id).await?;
            eprintln!(
                "{} ({}): {:.2}/{:.2} SOL, {:.0}%",
                fund.name,
                fund.status,
                fund.current_donated_sol,
                fund.target_sol_amount,
                fund.progress_percent()
            );
            print_json(&fund)?;
        }
        Commands::Funds {
            completed,
            page,
            limit,
        } => {
            let status = completed.then_some(FundStatus::Completed);
            print_json(&ctx.backend.list_funds(status, *page, *limit).await?)?;
        }
        Commands::Fee => print_json(&ctx.backend.get_fee_schedule().await?)?,
        Commands::Launch {
            fund_id,
            image,
            wait,
        } => {
            let wallet = ctx.wallet(cli.keypair.as_deref(), true)?;
            let launcher = ctx.launcher();
            let fund = ctx.backend.get_fund(fund_id).await?;
            match launcher
                .launch(&fund, &wallet.address(), image.as_deref())
                .await
            {
                Ok(response) => {
                    let message = response
                        .message
                        .unwrap_or_else(|| "Token launch started".to_string());
                    println!("{}", Notice::success(message));
                }
                Err(e) => {
                    println!("{}", Notice::for_launch_error(&e));
                    return Ok(());
                }
            }
            if *wait {
                match launcher.wait_for_token(fund_id).await {
                    Ok(token) => println!("{}", Notice::success(format!("Token: {token}"))),
                    Err(e) => println!("{}", Notice::for_launch_error(&e)),
                }
            }
        }
        Commands::Transfer { fund_id } => {
            let wallet = ctx.wallet(cli.keypair.as_deref(), true)?;
            let fund = ctx.backend.get_fund(fund_id).await?;
            match ctx.launcher().transfer(&fund, &wallet.address()).await {
                Ok(response) => println!(
                    "{}",
                    Notice::success(
                        response
                            .message
                            .unwrap_or_else(|| "Transfer requested".to_string())
                    )
                ),
                Err(e) => println!("{}", Notice::for_launch_error(&e)),
            }
        }
        Commands::Transferred {
            fund_id,
            token_account,
        } => {
            let fund = ctx.backend.get_fund(fund_id).await?;
            let done = ctx
                .launcher()
                .is_transferred(&fund, token_account.as_deref())
                .await?;
            println!("{}", if done { "transferred" } else { "not transferred" });
        }
        Commands::Profile {
            wallet,
            register,
            name,
            email,
        } => {
            let address = match wallet {
                Some(address) => address.parse::<Pubkey>()?.to_string(),
                None => ctx.wallet(cli.keypair.as_deref(), true)?.address().to_string(),
            };
            let profile = if *register {
                ctx.backend.register_user(&address).await?
            } else if name.is_some() || email.is_some() {
                let update = ProfileUpdate {
                    name: name.clone(),
                    email: email.clone(),
                };
                ctx.backend.update_user(&address, &update).await?
            } else {
                ctx.backend.get_user(&address).await?
            };
            print_json(&profile)?;
        }
        Commands::Leaderboard { fund_id } => match fund_id {
            Some(id) => print_json(&ctx.backend.fund_leaderboard(id).await?)?,
            None => print_json(&ctx.backend.total_leaderboard().await?)?,
        },
        Commands::Image { fund_id, delete } => {
            if *delete {
                print_json(&ctx.backend.delete_token_image(fund_id).await?)?;
            } else {
                print_json(&ctx.backend.get_token_image(fund_id).await?)?;
            }
        }
        Commands::Cooldowns => {
            let active = ctx.session.active_cooldowns();
            if active.is_empty() {
                println!("No active cooldowns");
            }
            for (fund_id, remaining) in active {
                println!("{fund_id}: {remaining}s");
            }
        }
    }
    Ok(())
}

fn print_outcome(result: &Result<FlowReceipt, FlowError>) {
    let notice = match result {
        Ok(receipt) => Notice::for_receipt(receipt),
        Err(e) => Notice::from(e),
    };
    if notice.sticky {
        eprintln!("{}", "!".repeat(60));
        println!("{notice}");
        eprintln!("{}", "!".repeat(60));
    } else {
        println!("{notice}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
