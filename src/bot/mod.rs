//! The trading control loop.
//!
//! Each tick discovers eligible markets, quotes every token not yet bought,
//! runs the buy trigger and, on its own cadence, reconciles settled
//! positions. The bot owns the [`TradingState`]; the status API only sees the
//! [`BotSnapshot`] published after each tick.

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::gateway::{ExchangeGateway, LedgerGateway, MarketSource};
use crate::market::{discover_markets, MarketFilter};
use crate::metrics;
use crate::orderbook::evaluate_quote;
use crate::settlement::{reconcile, ReconcileReport};
use crate::trading::{BuyOutcome, Position, TradingState, TriggerEngine, TriggerSettings};
use crate::utils::{account_jitter, Shutdown};

/// Loop cadence and feature switches.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Trigger thresholds and sizing.
    pub trigger: TriggerSettings,
    /// Market eligibility.
    pub filter: MarketFilter,
    /// Whether settled positions are reconciled.
    pub auto_claim: bool,
    /// Minimum time between reconcile passes.
    pub claim_interval: Duration,
    /// Delay between ticks, before jitter.
    pub check_interval: Duration,
    /// Jitter unit.
    pub jitter_step: Duration,
    /// Jitter modulus.
    pub jitter_buckets: u64,
    /// Delay after a failed tick.
    pub error_backoff: Duration,
    /// `dry_run` or `live`.
    pub mode: &'static str,
}

impl BotSettings {
    /// Settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            trigger: TriggerSettings::from_config(config),
            filter: MarketFilter {
                window: config.discovery_window(),
                keywords: config.asset_keywords(),
                limit: config.market_limit,
            },
            auto_claim: config.auto_claim,
            claim_interval: config.claim_interval(),
            check_interval: config.check_interval(),
            jitter_step: config.jitter_step(),
            jitter_buckets: config.jitter_buckets,
            error_backoff: config.error_backoff(),
            mode: config.mode(),
        }
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            trigger: TriggerSettings::default(),
            filter: MarketFilter::default(),
            auto_claim: true,
            claim_interval: Duration::from_secs(300),
            check_interval: Duration::from_millis(500),
            jitter_step: Duration::from_millis(100),
            jitter_buckets: 3,
            error_backoff: Duration::from_secs(5),
            mode: "dry_run",
        }
    }
}

/// Wallets the bot acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accounts {
    /// Signing key address.
    pub eoa: Address,
    /// Polymarket proxy wallet holding collateral and outcome tokens.
    pub proxy: Address,
}

/// Read-only view of the bot published after every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BotSnapshot {
    /// `dry_run` or `live`.
    pub mode: String,
    /// Completed ticks, failed ones included.
    pub ticks: u64,
    /// Realized profit since start.
    pub cumulative_profit: Decimal,
    /// Open positions.
    pub open_positions: Vec<Position>,
    /// Tokens bought since start.
    pub bought_count: usize,
    /// End of the last tick.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_tick: Option<OffsetDateTime>,
    /// Error of the last tick, if it failed.
    pub last_error: Option<String>,
}

impl BotSnapshot {
    /// Whether at least one tick completed.
    pub fn is_ready(&self) -> bool {
        self.ticks > 0
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Eligible markets seen.
    pub markets: usize,
    /// Tokens quoted.
    pub quoted: usize,
    /// Buys accepted.
    pub bought: usize,
    /// Reconcile pass, when one ran.
    pub reconcile: Option<ReconcileReport>,
}

/// The trading bot.
pub struct TradingBot<S, E, L> {
    source: S,
    exchange: E,
    ledger: L,
    engine: TriggerEngine,
    settings: BotSettings,
    accounts: Accounts,
    state: TradingState,
    last_claim: Instant,
    ticks: u64,
    snapshot: watch::Sender<BotSnapshot>,
}

impl<S, E, L> TradingBot<S, E, L>
where
    S: MarketSource,
    E: ExchangeGateway,
    L: LedgerGateway,
{
    /// Create a bot. The first reconcile pass runs one claim interval after
    /// creation.
    pub fn new(source: S, exchange: E, ledger: L, settings: BotSettings, accounts: Accounts) -> Self {
        let (snapshot, _) = watch::channel(BotSnapshot {
            mode: settings.mode.to_string(),
            ..Default::default()
        });

        Self {
            source,
            exchange,
            ledger,
            engine: TriggerEngine::new(settings.trigger.clone()),
            settings,
            accounts,
            state: TradingState::new(),
            last_claim: Instant::now(),
            ticks: 0,
            snapshot,
        }
    }

    /// Subscribe to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<BotSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current trading state.
    pub fn state(&self) -> &TradingState {
        &self.state
    }

    /// Loop settings.
    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Whether a reconcile pass is due.
    pub fn claim_due(&self) -> bool {
        self.settings.auto_claim && self.last_claim.elapsed() >= self.settings.claim_interval
    }

    /// Run one tick at the current time.
    pub async fn tick(&mut self) -> Result<TickReport> {
        self.tick_at(OffsetDateTime::now_utc()).await
    }

    /// Run one tick as of `now`.
    ///
    /// An error leaves the state consistent; the reconcile timestamp only
    /// advances when the pass completes.
    #[instrument(skip(self), fields(tick = self.ticks + 1))]
    pub async fn tick_at(&mut self, now: OffsetDateTime) -> Result<TickReport> {
        let mut report = TickReport::default();

        let markets = discover_markets(&self.source, now, &self.settings.filter).await;
        report.markets = markets.len();

        for market in &markets {
            debug!(
                market = %market.question,
                remaining = %market.time_remaining_str(now),
                "Scanning market"
            );

            for token in &market.tokens {
                if self.state.is_bought(&token.token_id) {
                    continue;
                }

                let quote = evaluate_quote(&self.exchange, &token.token_id).await;
                report.quoted += 1;

                let outcome = self
                    .engine
                    .try_buy(
                        &mut self.state,
                        &self.exchange,
                        &self.ledger,
                        self.accounts.proxy,
                        market,
                        token,
                        &quote,
                    )
                    .await?;

                if matches!(outcome, BuyOutcome::Bought { .. }) {
                    report.bought += 1;
                }
            }
        }

        if self.claim_due() {
            let pass = reconcile(
                &mut self.state,
                &self.exchange,
                &self.ledger,
                self.accounts.proxy,
            )
            .await?;
            self.last_claim = Instant::now();
            report.reconcile = Some(pass);
        }

        Ok(report)
    }

    /// Run until shutdown. Returns the final snapshot.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> BotSnapshot {
        let jitter = account_jitter(
            self.accounts.eoa,
            self.settings.jitter_step,
            self.settings.jitter_buckets,
        );

        info!(
            mode = self.settings.mode,
            eoa = %self.accounts.eoa,
            proxy = %self.accounts.proxy,
            target_price = %self.settings.trigger.target_price,
            shares = %self.settings.trigger.fixed_shares,
            jitter_ms = jitter.as_millis() as u64,
            "Trading loop started"
        );

        while !shutdown.is_triggered() {
            let (delay, last_error) = match self.tick().await {
                Ok(report) => {
                    if report.bought > 0 {
                        info!(bought = report.bought, markets = report.markets, "Tick complete");
                    }
                    (self.settings.check_interval + jitter, None)
                }
                Err(e) => {
                    error!(error = %e, backoff_s = self.settings.error_backoff.as_secs(), "Tick failed");
                    metrics::inc_loop_errors();
                    (self.settings.error_backoff, Some(e.to_string()))
                }
            };

            self.ticks += 1;
            self.publish(last_error);

            if shutdown.sleep(delay).await {
                break;
            }
        }

        let snapshot = self.snapshot.borrow().clone();
        info!(
            cumulative_profit = %snapshot.cumulative_profit,
            open_positions = snapshot.open_positions.len(),
            bought = snapshot.bought_count,
            ticks = snapshot.ticks,
            "Trading loop stopped"
        );
        for position in &snapshot.open_positions {
            info!(
                token_id = %position.token_id,
                outcome = %position.label,
                price = %position.price,
                shares = %position.shares,
                "Open position at shutdown"
            );
        }
        snapshot
    }

    fn publish(&self, last_error: Option<String>) {
        let positions = self.state.positions();
        metrics::set_state_gauges(self.state.cumulative_profit(), positions.len());

        self.snapshot.send_replace(BotSnapshot {
            mode: self.settings.mode.to_string(),
            ticks: self.ticks,
            cumulative_profit: self.state.cumulative_profit(),
            open_positions: positions.iter().cloned().collect(),
            bought_count: self.state.bought_count(),
            last_tick: Some(OffsetDateTime::now_utc()),
            last_error,
        });
    }
}
