//! Polymarket REST client: CLOB order books, Gamma listing and data API lookups.

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::discovery::MarketQuery;
use super::types::GammaMarket;
use crate::config::Config;
use crate::error::MarketError;
use crate::gateway::MarketSource;
use crate::orderbook::types::{OutcomeBook, PriceLevel};

/// Body marker the CLOB sends for tokens whose book was removed.
const NO_ORDERBOOK_MARKER: &str = "No orderbook exists";

/// Polymarket REST API client.
#[derive(Debug, Clone)]
pub struct PolymarketClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for CLOB API.
    clob_url: String,
    /// Base URL for Gamma API.
    gamma_url: String,
    /// Base URL for data API.
    data_api_url: String,
}

/// Order book response from API.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookResponse {
    /// Bid levels.
    pub bids: Option<Vec<OrderLevel>>,
    /// Ask levels.
    pub asks: Option<Vec<OrderLevel>>,
    /// Market ID.
    pub market: Option<String>,
    /// Asset ID.
    pub asset_id: Option<String>,
}

/// Single price level in order book.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderLevel {
    /// Price at this level.
    pub price: String,
    /// Size available at this level.
    pub size: String,
}

/// Activity record from the data API.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityResponse {
    /// Proxy wallet that performed the activity.
    #[serde(rename = "proxyWallet")]
    pub proxy_wallet: Option<String>,
}

impl PolymarketClient {
    /// Create a new Polymarket client from config.
    pub fn new(config: &Config) -> Result<Self, MarketError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(std::time::Duration::from_secs(5))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        Ok(Self::with_http(
            http,
            &config.polymarket_clob_url,
            &config.gamma_api_url,
            &config.data_api_url,
        ))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http(http: reqwest::Client, clob_url: &str, gamma_url: &str, data_api_url: &str) -> Self {
        Self {
            http,
            clob_url: clob_url.trim_end_matches('/').to_string(),
            gamma_url: gamma_url.trim_end_matches('/').to_string(),
            data_api_url: data_api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the CLOB base URL.
    pub fn clob_url(&self) -> &str {
        &self.clob_url
    }

    /// Get order book for a token.
    ///
    /// A resolved market has no book; that is reported as
    /// [`MarketError::OrderBookMissing`].
    #[instrument(skip(self), fields(token_id = %token_id))]
    pub async fn get_order_book(&self, token_id: &str) -> Result<OutcomeBook, MarketError> {
        let url = format!("{}/book", self.clob_url);

        let response = self
            .http
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND || body.contains(NO_ORDERBOOK_MARKER) {
                return Err(MarketError::OrderBookMissing {
                    token_id: token_id.to_string(),
                });
            }
            return Err(MarketError::FetchFailed {
                resource: token_id.to_string(),
                reason: format!("HTTP {} - {}", status, body),
            });
        }

        let book: OrderBookResponse = response.json().await.map_err(|e| {
            MarketError::ParseError(format!("Failed to parse order book: {}", e))
        })?;

        Ok(convert_order_book(token_id, book))
    }

    /// Resolve the proxy wallet that trades for `eoa` from its latest activity.
    #[instrument(skip(self))]
    pub async fn resolve_proxy_wallet(&self, eoa: Address) -> Result<Address, MarketError> {
        let url = format!("{}/activity", self.data_api_url);

        let response = self
            .http
            .get(&url)
            .query(&[("user", eoa.to_string()), ("limit", "1".to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                resource: url,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let activity: Vec<ActivityResponse> = response.json().await.map_err(|e| {
            MarketError::ParseError(format!("Failed to parse activity: {}", e))
        })?;

        let proxy = activity
            .first()
            .and_then(|a| a.proxy_wallet.as_deref())
            .ok_or_else(|| {
                MarketError::ParseError(format!(
                    "no activity for {eoa}; set POLYMARKET_FUNDER to the proxy wallet"
                ))
            })?;

        let proxy: Address = proxy
            .parse()
            .map_err(|e| MarketError::ParseError(format!("bad proxyWallet {proxy:?}: {e}")))?;

        debug!(%proxy, "Resolved proxy wallet");
        Ok(proxy)
    }
}

#[async_trait]
impl MarketSource for PolymarketClient {
    #[instrument(skip(self, query), fields(limit = query.limit))]
    async fn list_markets(&self, query: &MarketQuery) -> Result<Vec<GammaMarket>, MarketError> {
        let url = format!("{}/markets", self.gamma_url);

        let response = self
            .http
            .get(&url)
            .query(&query.to_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                resource: url,
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.json().await.map_err(|e| {
            MarketError::ParseError(format!("Failed to parse Gamma API response: {}", e))
        })
    }
}

/// Convert API response to OutcomeBook, dropping unparseable and empty levels.
fn convert_order_book(token_id: &str, response: OrderBookResponse) -> OutcomeBook {
    let parse_levels = |levels: Option<Vec<OrderLevel>>| -> Vec<PriceLevel> {
        levels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|level| {
                let price: Decimal = level.price.parse().ok()?;
                let size: Decimal = level.size.parse().ok()?;
                if size > Decimal::ZERO {
                    Some(PriceLevel { price, size })
                } else {
                    None
                }
            })
            .collect()
    };

    OutcomeBook {
        token_id: token_id.to_string(),
        bids: parse_levels(response.bids),
        asks: parse_levels(response.asks),
        updated_at: OffsetDateTime::now_utc(),
    }
}
