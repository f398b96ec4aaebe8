//! Buy-only BTC 15-minute Polymarket bot entry point.

use std::net::SocketAddr;
use std::str::FromStr;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use polymarket_buy_only::api::{create_router, AppState};
use polymarket_buy_only::bot::{Accounts, BotSettings, TradingBot};
use polymarket_buy_only::config::Config;
use polymarket_buy_only::gateway::{ExchangeGateway, LedgerGateway};
use polymarket_buy_only::ledger::contracts::COLLATERAL_SPENDERS;
use polymarket_buy_only::ledger::units::from_base_units;
use polymarket_buy_only::ledger::{ensure_allowances, OnChainLedger, PaperLedger};
use polymarket_buy_only::market::{discover_markets, PolymarketClient};
use polymarket_buy_only::metrics;
use polymarket_buy_only::orderbook::evaluate_quote;
use polymarket_buy_only::signing::{clob_credentials, create_signer, derive_api_credentials};
use polymarket_client_sdk::auth::ExposeSecret;
use polymarket_buy_only::trading::{ClobTrader, LiveExchange, PaperAccount, PaperExchange};
use polymarket_buy_only::utils::{shutdown_channel, shutdown_signal};

/// Buy-only trigger bot for BTC 15-minute Polymarket markets.
#[derive(Parser, Debug)]
#[command(name = "polymarket-buy-only")]
#[command(about = "Buys BTC 15-minute outcomes above a target price and claims the payouts")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    /// Run in dry-run mode (no real orders).
    #[arg(long, global = true)]
    dry_run: Option<bool>,

    /// HTTP server port for health/metrics.
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading loop (default).
    Run,

    /// Check configuration validity.
    CheckConfig,

    /// Show wallets, USDC balance and allowances.
    CheckBalance,

    /// List eligible markets with their current quotes.
    DiscoverMarkets,

    /// Derive CLOB API credentials for the configured key.
    DeriveCredentials,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env may carry RUST_LOG
    dotenvy::dotenv().ok();

    let filter = if args.verbose {
        EnvFilter::new("polymarket_buy_only=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&args).await,
        Some(Command::CheckBalance) => cmd_check_balance(&args).await,
        Some(Command::DiscoverMarkets) => cmd_discover_markets(&args).await,
        Some(Command::DeriveCredentials) => cmd_derive_credentials(&args).await,
        Some(Command::Run) | None => cmd_run(&args).await,
    }
}

/// Load and validate configuration, applying CLI overrides.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(dry_run) = args.dry_run {
        config.dry_run = dry_run;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_signer(config: &Config) -> anyhow::Result<PrivateKeySigner> {
    Ok(create_signer(&config.polymarket_private_key)?.with_chain_id(Some(config.chain_id)))
}

/// Wallet holding collateral and outcome tokens.
///
/// The EOA itself for signature type 0. Otherwise `POLYMARKET_FUNDER` if set,
/// else the proxy wallet seen by the data API.
async fn resolve_proxy(
    config: &Config,
    client: &PolymarketClient,
    eoa: Address,
) -> anyhow::Result<Address> {
    if config.trades_from_eoa() {
        return Ok(eoa);
    }

    if let Some(funder) = config.polymarket_funder.as_deref().filter(|f| !f.is_empty()) {
        return Address::from_str(funder)
            .with_context(|| format!("POLYMARKET_FUNDER is not an address: {funder}"));
    }

    client
        .resolve_proxy_wallet(eoa)
        .await
        .context("Could not resolve the proxy wallet; set POLYMARKET_FUNDER")
}

fn print_rule() {
    println!("======================================================================");
}

/// Check configuration validity.
async fn cmd_check_config(args: &Args) -> anyhow::Result<()> {
    print_rule();
    println!("BTC 15M BUY-ONLY BOT - CONFIGURATION CHECK");
    print_rule();

    print!("Loading configuration... ");
    let config = match load_config(args) {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {:#}", e);
            return Err(e);
        }
    };

    print!("Checking private key... ");
    let signer = load_signer(&config)?;
    println!("OK");
    println!("  Wallet address: {}", signer.address());

    print!("Checking API credentials... ");
    match config.api_credentials()? {
        Some(_) => println!("OK"),
        None if config.dry_run => println!("absent (fine for dry run)"),
        None => println!("MISSING - run `polymarket-buy-only derive-credentials`"),
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!(
        "  Signature Type: {} ({})",
        config.polymarket_signature_type,
        match config.polymarket_signature_type {
            0 => "EOA - Standard wallet",
            1 => "Magic.link - Proxy wallet",
            2 => "Gnosis Safe - Multi-sig",
            _ => "Unknown",
        }
    );
    match &config.polymarket_funder {
        _ if config.trades_from_eoa() => println!("  Funder Address: none (EOA holds funds)"),
        Some(funder) => println!("  Funder Address: {}", funder),
        None => println!("  Funder Address: resolved from data API"),
    }
    println!("  Target Price: ${}", config.target_price);
    println!("  Buy Offset: ${}", config.buy_offset);
    println!("  Shares per Buy: {}", config.fixed_shares);
    println!("  Check Interval: {}ms", config.check_interval_ms);
    println!(
        "  Auto Claim: {} (every {}s)",
        config.auto_claim, config.claim_interval_seconds
    );
    println!("  Keywords: {}", config.asset_keywords);
    println!("  Mode: {}", config.mode());
    print_rule();
    println!("CONFIGURATION CHECK PASSED");
    print_rule();

    Ok(())
}

/// Show wallets, USDC balance and allowances.
async fn cmd_check_balance(args: &Args) -> anyhow::Result<()> {
    print_rule();
    println!("BTC 15M BUY-ONLY BOT - BALANCE CHECK");
    print_rule();

    let config = load_config(args)?;
    let signer = load_signer(&config)?;
    let eoa = signer.address();
    let client = PolymarketClient::new(&config)?;
    let ledger = OnChainLedger::new(&config.polygon_rpc_url, signer, config.tx_timeout())?;

    println!("RPC: {}", config.polygon_rpc_url);
    println!("EOA: {}", eoa);

    print!("\n1. Resolving proxy wallet... ");
    let proxy = resolve_proxy(&config, &client, eoa).await?;
    println!("OK");
    println!("   Proxy: {}", proxy);

    print!("\n2. Getting USDC balances... ");
    let proxy_balance = from_base_units(ledger.collateral_balance(proxy).await?)?;
    let eoa_balance = from_base_units(ledger.collateral_balance(eoa).await?)?;
    println!("OK");
    println!("   Proxy USDC: ${}", proxy_balance);
    println!("   EOA USDC:   ${}", eoa_balance);

    println!("\n3. Allowances from proxy:");
    for spender in COLLATERAL_SPENDERS {
        match ledger.collateral_allowance(proxy, spender).await {
            Ok(allowance) => println!("   {}: {}", spender, allowance),
            Err(e) => println!("   {}: FAILED ({})", spender, e),
        }
    }

    println!();
    print_rule();
    println!("BALANCE CHECK COMPLETED");
    print_rule();

    Ok(())
}

/// List eligible markets with their current quotes.
async fn cmd_discover_markets(args: &Args) -> anyhow::Result<()> {
    print_rule();
    println!("BTC 15M BUY-ONLY BOT - MARKET DISCOVERY");
    print_rule();

    let config = load_config(args)?;
    let settings = BotSettings::from_config(&config);
    let client = PolymarketClient::new(&config)?;
    let books = PaperExchange::new(client.clone(), PaperAccount::default());

    let now = OffsetDateTime::now_utc();
    let markets = discover_markets(&client, now, &settings.filter).await;

    if markets.is_empty() {
        println!("NO ELIGIBLE MARKETS");
        println!("\nMarkets open every 15 minutes. Try again shortly.");
        print_rule();
        return Ok(());
    }

    for market in &markets {
        println!("----------------------------------------------------------------------");
        println!("  Question: {}", market.question);
        println!("  ID: {}", market.id);
        println!("  Condition: {}", market.condition_id);
        println!("  Time Remaining: {}", market.time_remaining_str(now));
        for token in &market.tokens {
            let quote = evaluate_quote(&books, &token.token_id).await;
            println!("  {:>5} {} -> {}", token.label, token.token_id, quote);
        }
    }
    print_rule();
    println!("{} ELIGIBLE MARKET(S)", markets.len());
    print_rule();

    Ok(())
}

/// Derive CLOB API credentials and print them for `.env`.
async fn cmd_derive_credentials(args: &Args) -> anyhow::Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dry_run) = args.dry_run {
        config.dry_run = dry_run;
    }
    let signer = load_signer(&config)?;

    let credentials = derive_api_credentials(&config.polymarket_clob_url, &signer).await?;

    println!("# CLOB credentials for {}", signer.address());
    println!("POLYMARKET_API_KEY={}", credentials.key());
    println!(
        "POLYMARKET_API_SECRET={}",
        credentials.secret().expose_secret()
    );
    println!(
        "POLYMARKET_API_PASSPHRASE={}",
        credentials.passphrase().expose_secret()
    );

    Ok(())
}

/// Run the trading loop.
async fn cmd_run(args: &Args) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config(args).inspect_err(|e| error!("{:#}", e))?;

    let signer = load_signer(&config)?;
    let eoa = signer.address();
    let client = PolymarketClient::new(&config)?;
    let chain = OnChainLedger::new(&config.polygon_rpc_url, signer.clone(), config.tx_timeout())?;

    let proxy = resolve_proxy(&config, &client, eoa).await?;
    let accounts = Accounts { eoa, proxy };

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::install_prometheus()?)
    } else {
        None
    };

    info!(
        mode = config.mode(),
        %eoa,
        %proxy,
        target_price = %config.target_price,
        shares = %config.fixed_shares,
        "Configuration loaded"
    );

    if config.dry_run {
        let account = PaperAccount::new(config.sim_balance)?;
        let exchange = PaperExchange::new(client.clone(), account.clone());
        let ledger = PaperLedger::new(chain, account);
        info!(balance = %config.sim_balance, "[DRY RUN] Paper trading");
        run_bot(&config, client, exchange, ledger, accounts, metrics_handle).await
    } else {
        let credentials = clob_credentials(&config.require_api_credentials()?)?;

        let approvals = ensure_allowances(&chain, proxy, &COLLATERAL_SPENDERS).await?;
        if !approvals.is_empty() {
            info!(count = approvals.len(), "Collateral approvals confirmed");
        }

        let trader = ClobTrader::connect(
            &config.polymarket_clob_url,
            signer,
            proxy,
            config.polymarket_signature_type,
            credentials,
        )
        .await?;
        let exchange = LiveExchange::new(client.clone(), trader);
        warn!("LIVE TRADING - real orders will be placed");
        run_bot(&config, client, exchange, chain, accounts, metrics_handle).await
    }
}

async fn run_bot<E, L>(
    config: &Config,
    client: PolymarketClient,
    exchange: E,
    ledger: L,
    accounts: Accounts,
    metrics_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()>
where
    E: ExchangeGateway,
    L: LedgerGateway,
{
    let mut bot = TradingBot::new(
        client,
        exchange,
        ledger,
        BotSettings::from_config(config),
        accounts,
    );

    let (trigger, shutdown) = shutdown_channel();
    let mut server_shutdown = trigger.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(AppState::new(bot.subscribe(), metrics_handle));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.wait().await })
            .await
        {
            error!(error = %e, "HTTP server failed");
        }
    });

    let summary = bot.run(shutdown).await;

    info!("========================================");
    info!("FINAL SUMMARY");
    info!("Cumulative profit: ${}", summary.cumulative_profit);
    info!("Open positions: {}", summary.open_positions.len());
    info!("Tokens bought: {}", summary.bought_count);
    info!("========================================");

    Ok(())
}
