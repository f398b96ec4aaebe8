//! Integration tests for the buy-only bot.
//!
//! The lifecycle tests drive a whole [`TradingBot`] against the mock gateways.
//! Tests marked `#[ignore]` talk to the real Polymarket APIs.
//! Run them with: cargo test --test integration -- --ignored

use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::datetime;
use time::OffsetDateTime;

use polymarket_buy_only::bot::{Accounts, BotSettings, TradingBot};
use polymarket_buy_only::ledger::{MockLedger, WriteFailure};
use polymarket_buy_only::market::{
    discover_markets, MarketFilter, MockExchange, MockMarketSource, PolymarketClient,
};
use polymarket_buy_only::settlement::Settlement;

const NOW: OffsetDateTime = datetime!(2025-11-03 19:20:00 UTC);
const AFTER_CLOSE: OffsetDateTime = datetime!(2025-11-03 19:45:00 UTC);
const UP: &str = "71321045679252212594626385532706912750332728571942532289631379312455583992563";
const DOWN: &str = "52114319501245915516055106046884209969926127482827954674443846427813813222426";

fn accounts() -> Accounts {
    Accounts {
        eoa: Address::repeat_byte(0x0e),
        proxy: Address::repeat_byte(0x0f),
    }
}

fn condition() -> B256 {
    B256::repeat_byte(0xc0)
}

fn listing() -> MockMarketSource {
    let source = MockMarketSource::new();
    source.add_market(
        "657180",
        "Bitcoin Up or Down - November 3, 2:15PM-2:30PM ET",
        &format!("0x{}", "c0".repeat(32)),
        [UP, DOWN],
        ["Up", "Down"],
        datetime!(2025-11-03 19:30:00 UTC),
    );
    source.add_market(
        "657181",
        "Ethereum Up or Down - November 3, 2:15PM-2:30PM ET",
        &format!("0x{}", "e0".repeat(32)),
        ["1", "2"],
        ["Up", "Down"],
        datetime!(2025-11-03 19:30:00 UTC),
    );
    source
}

fn settings() -> BotSettings {
    BotSettings {
        claim_interval: Duration::ZERO,
        ..Default::default()
    }
}

fn token(id: &str) -> U256 {
    U256::from_str_radix(id, 10).unwrap()
}

#[tokio::test]
async fn buy_then_redeem_winning_position() {
    let exchange = MockExchange::new();
    exchange.set_book(UP, &[dec!(0.85), dec!(0.87)], &[dec!(0.83)]);
    exchange.set_book(DOWN, &[dec!(0.17)], &[dec!(0.15)]);
    let ledger = MockLedger::new();
    ledger.set_collateral(accounts().proxy, U256::from(50_000_000u64));

    let mut bot = TradingBot::new(
        listing(),
        exchange.clone(),
        ledger.clone(),
        settings(),
        accounts(),
    );

    let first = bot.tick_at(NOW).await.unwrap();
    assert_eq!(first.markets, 1);
    assert_eq!(first.bought, 1);
    assert_eq!(first.reconcile.as_ref().map(|r| r.open), Some(1));

    let orders = exchange.posted_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].token_id, UP);
    assert_eq!(orders[0].price, dec!(0.86));
    assert_eq!(orders[0].size, dec!(2));

    // Market resolves UP.
    exchange.set_settled(UP);
    exchange.set_settled(DOWN);
    ledger.resolve(
        condition(),
        U256::from(1_000_000u64),
        [U256::from(1_000_000u64), U256::ZERO],
    );
    ledger.set_token_balance(accounts().proxy, token(UP), U256::from(2_000_000u64));

    let second = bot.tick_at(AFTER_CLOSE).await.unwrap();
    let pass = second.reconcile.unwrap();
    assert_eq!(second.markets, 0);
    assert_eq!(pass.closed(), 1);
    assert!(matches!(
        &pass.settled[0].1,
        Settlement::Paid { profit, .. } if *profit == dec!(0.28)
    ));

    assert_eq!(bot.state().cumulative_profit(), dec!(0.28));
    assert!(bot.state().positions().is_empty());
    assert!(bot.state().is_bought(UP));
    assert_eq!(
        ledger.redemptions(),
        vec![(condition(), [U256::from(2_000_000u64), U256::ZERO])]
    );

    let third = bot.tick_at(AFTER_CLOSE).await.unwrap();
    assert_eq!(third.reconcile.unwrap().checked, 0);
    assert_eq!(ledger.redemptions().len(), 1);
}

#[tokio::test]
async fn losing_position_is_written_off() {
    let exchange = MockExchange::new();
    exchange.set_book(DOWN, &[dec!(0.90)], &[dec!(0.88)]);
    let ledger = MockLedger::new();
    ledger.set_collateral(accounts().proxy, U256::from(50_000_000u64));

    let mut bot = TradingBot::new(
        listing(),
        exchange.clone(),
        ledger.clone(),
        settings(),
        accounts(),
    );
    bot.tick_at(NOW).await.unwrap();
    assert!(bot.state().is_bought(DOWN));

    exchange.set_settled(DOWN);
    ledger.resolve(condition(), U256::from(1u64), [U256::from(1u64), U256::ZERO]);

    bot.tick_at(AFTER_CLOSE).await.unwrap();

    assert_eq!(bot.state().cumulative_profit(), dec!(-1.82));
    assert!(bot.state().positions().is_empty());
    assert!(ledger.redemptions().is_empty());
}

#[tokio::test]
async fn failed_redeem_is_retried_next_tick() {
    let exchange = MockExchange::new();
    exchange.set_book(UP, &[dec!(0.85)], &[dec!(0.83)]);
    let ledger = MockLedger::new();
    ledger.set_collateral(accounts().proxy, U256::from(50_000_000u64));

    let mut bot = TradingBot::new(
        listing(),
        exchange.clone(),
        ledger.clone(),
        settings(),
        accounts(),
    );
    bot.tick_at(NOW).await.unwrap();

    exchange.set_settled(UP);
    ledger.resolve(condition(), U256::from(1u64), [U256::from(1u64), U256::ZERO]);
    ledger.set_token_balance(accounts().proxy, token(UP), U256::from(2_000_000u64));
    ledger.set_redeem_failure(Some(WriteFailure::Revert));

    assert!(bot.tick_at(AFTER_CLOSE).await.is_err());
    assert_eq!(bot.state().positions().len(), 1);

    ledger.set_redeem_failure(None);
    bot.tick_at(AFTER_CLOSE).await.unwrap();

    assert_eq!(bot.state().cumulative_profit(), dec!(0.28));
    assert!(bot.state().positions().is_empty());
}

#[tokio::test]
async fn listing_outage_is_an_empty_tick() {
    let source = listing();
    source.set_failing(true);
    let exchange = MockExchange::new();

    let mut bot = TradingBot::new(
        source,
        exchange.clone(),
        MockLedger::new(),
        settings(),
        accounts(),
    );

    let report = bot.tick_at(NOW).await.unwrap();
    assert_eq!(report.markets, 0);
    assert_eq!(exchange.book_requests(), 0);
    assert_eq!(bot.state().cumulative_profit(), Decimal::ZERO);
}

fn live_client() -> PolymarketClient {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    PolymarketClient::with_http(
        http,
        "https://clob.polymarket.com",
        "https://gamma-api.polymarket.com",
        "https://data-api.polymarket.com",
    )
}

/// Discovery against the real Gamma API.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_live_discovery() {
    let client = live_client();
    let now = OffsetDateTime::now_utc();
    let markets = discover_markets(&client, now, &MarketFilter::default()).await;

    for market in &markets {
        assert!(market.end_time >= now);
        assert!(!market.tokens.is_empty());
        println!("{} ({})", market.question, market.time_remaining_str(now));
    }
}
