//! Discovery of eligible BTC 15-minute markets from the Gamma listing.

use once_cell::sync::Lazy;
use regex::Regex;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};
use tracing::{debug, instrument, warn};

use super::types::Market;
use crate::gateway::MarketSource;
use crate::metrics;

/// A 15-minute window in the question, e.g. `2:15PM-2:30PM`.
static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,2}:\d{2}[AP]M\s*-\s*\d{1,2}:\d{2}[AP]M").expect("valid regex")
});

/// Listing query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketQuery {
    /// Only active markets.
    pub active: bool,
    /// Include closed markets.
    pub closed: bool,
    /// Page size.
    pub limit: u32,
    /// Earliest end date.
    pub end_date_min: Option<OffsetDateTime>,
    /// Latest end date.
    pub end_date_max: Option<OffsetDateTime>,
}

impl MarketQuery {
    /// Query string pairs for the Gamma `/markets` endpoint.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("active", self.active.to_string()),
            ("closed", self.closed.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(min) = self.end_date_min.and_then(format_end_date) {
            params.push(("end_date_min", min));
        }
        if let Some(max) = self.end_date_max.and_then(format_end_date) {
            params.push(("end_date_max", max));
        }
        params
    }
}

fn format_end_date(at: OffsetDateTime) -> Option<String> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    at.to_offset(time::UtcOffset::UTC).format(&format).ok()
}

/// Eligibility rules for discovered markets.
#[derive(Debug, Clone)]
pub struct MarketFilter {
    /// Markets must end within this window from now.
    pub window: Duration,
    /// Lowercased keywords, one of which must appear in the question.
    pub keywords: Vec<String>,
    /// Listing page size.
    pub limit: u32,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            window: Duration::hours(1),
            keywords: vec!["bitcoin".to_string(), "btc".to_string()],
            limit: 200,
        }
    }
}

impl MarketFilter {
    /// Build the listing query for the current time.
    pub fn query(&self, now: OffsetDateTime) -> MarketQuery {
        MarketQuery {
            active: true,
            closed: false,
            limit: self.limit,
            end_date_min: Some(now),
            end_date_max: Some(now + self.window),
        }
    }

    /// Whether a parsed market is eligible at `now`.
    pub fn accepts(&self, market: &Market, now: OffsetDateTime) -> bool {
        if market.closed || market.tokens.is_empty() {
            return false;
        }

        if market.end_time < now || market.end_time >= now + self.window {
            return false;
        }

        let question = market.question.to_lowercase();
        if !self.keywords.iter().any(|k| question.contains(k.as_str())) {
            return false;
        }

        TIME_RANGE.is_match(&market.question)
    }
}

/// List markets and keep the eligible ones.
///
/// Gateway failures are logged and yield an empty list.
#[instrument(skip(source, filter))]
pub async fn discover_markets<S>(source: &S, now: OffsetDateTime, filter: &MarketFilter) -> Vec<Market>
where
    S: MarketSource + ?Sized,
{
    let query = filter.query(now);

    let records = match source.list_markets(&query).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Market listing failed");
            return Vec::new();
        }
    };

    let markets: Vec<Market> = records
        .iter()
        .filter_map(|record| match record.to_market() {
            Ok(market) => Some(market),
            Err(e) => {
                debug!(error = %e, "Skipping unparseable market");
                None
            }
        })
        .filter(|market| filter.accepts(market, now))
        .collect();

    debug!(listed = records.len(), eligible = markets.len(), "Discovery complete");
    metrics::inc_markets_discovered(markets.len());

    markets
}
