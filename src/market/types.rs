//! Market-related types for BTC 15-minute prediction markets.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use crate::error::MarketError;

/// Outcome slot of a binary market.
///
/// The slot is the index used by the payout vector and by `redeemPositions`
/// amounts: `Up` is index 0, `Down` is index 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// BTC goes up (YES token).
    #[strum(serialize = "up", serialize = "yes", serialize = "UP", serialize = "YES")]
    #[default]
    Up,
    /// BTC goes down (NO token).
    #[strum(serialize = "down", serialize = "no", serialize = "DOWN", serialize = "NO")]
    Down,
}

impl Outcome {
    /// Payout vector index of this outcome.
    pub fn index(&self) -> usize {
        match self {
            Outcome::Up => 0,
            Outcome::Down => 1,
        }
    }

    /// Outcome for a payout vector index of a binary market.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Outcome::Up),
            1 => Some(Outcome::Down),
            _ => None,
        }
    }

    /// Label heuristic: "up" or "yes" anywhere in the label is slot 0,
    /// anything else is slot 1.
    ///
    /// Only used when the market did not give an explicit slot.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("up") || label.contains("yes") {
            Outcome::Up
        } else {
            Outcome::Down
        }
    }
}

/// One tradable outcome token of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeToken {
    /// Outcome label as listed ("Up", "Down", "Yes", ...).
    pub label: String,
    /// CLOB token id (decimal integer string).
    pub token_id: String,
    /// Explicit slot, known when the market lists exactly two outcomes.
    pub slot: Option<Outcome>,
}

impl OutcomeToken {
    /// Explicit slot if known, label heuristic otherwise.
    pub fn resolved_slot(&self) -> Outcome {
        self.slot.unwrap_or_else(|| Outcome::from_label(&self.label))
    }
}

/// Eligible market, re-fetched on every poll.
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    /// Unique market identifier.
    pub id: String,
    /// Market question text.
    pub question: String,
    /// CTF condition id (0x-prefixed 32-byte hex).
    pub condition_id: String,
    /// Outcome tokens in listing order.
    pub tokens: Vec<OutcomeToken>,
    /// Market accepts trading.
    pub active: bool,
    /// Market is closed.
    pub closed: bool,
    /// Scheduled end time.
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

impl Market {
    /// Get remaining time until market closes.
    pub fn time_remaining(&self, now: OffsetDateTime) -> Option<std::time::Duration> {
        let remaining = (self.end_time - now).whole_seconds();
        if remaining <= 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(remaining as u64))
        }
    }

    /// Format remaining time as "Xm Ys" string.
    pub fn time_remaining_str(&self, now: OffsetDateTime) -> String {
        match self.time_remaining(now) {
            Some(duration) => {
                let secs = duration.as_secs();
                let minutes = secs / 60;
                let seconds = secs % 60;
                format!("{}m {}s", minutes, seconds)
            }
            None => "CLOSED".to_string(),
        }
    }
}

/// Market record from the Gamma listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct GammaMarket {
    /// Market ID, listed as a string or a number.
    pub id: Option<IdRepr>,
    /// Market question.
    pub question: Option<String>,
    /// CTF condition id.
    #[serde(rename = "conditionId")]
    pub condition_id: Option<String>,
    /// CLOB token IDs, JSON-encoded string or array.
    #[serde(rename = "clobTokenIds")]
    pub clob_token_ids: Option<StringList>,
    /// Outcome labels, JSON-encoded string or array.
    pub outcomes: Option<StringList>,
    /// End date (ISO format).
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    /// Whether market is active.
    pub active: Option<bool>,
    /// Whether market is closed.
    pub closed: Option<bool>,
}

/// Identifier that may be listed as a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdRepr {
    /// String id.
    Text(String),
    /// Numeric id.
    Number(u64),
}

impl std::fmt::Display for IdRepr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdRepr::Text(s) => f.write_str(s),
            IdRepr::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A list of strings that the API sometimes sends JSON-encoded inside a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    /// Real JSON array.
    List(Vec<String>),
    /// JSON array encoded as a string, e.g. `"[\"Up\", \"Down\"]"`.
    Encoded(String),
}

impl StringList {
    /// Decode into a vector.
    pub fn decode(&self) -> Result<Vec<String>, MarketError> {
        match self {
            StringList::List(items) => Ok(items.clone()),
            StringList::Encoded(raw) => serde_json::from_str(raw)
                .map_err(|e| MarketError::ParseError(format!("bad encoded list {raw:?}: {e}"))),
        }
    }
}

impl GammaMarket {
    /// Parse the scheduled end time.
    pub fn end_time(&self) -> Result<OffsetDateTime, MarketError> {
        let raw = self
            .end_date
            .as_deref()
            .ok_or_else(|| MarketError::ParseError("missing endDate".to_string()))?;
        OffsetDateTime::parse(raw, &Rfc3339)
            .map_err(|e| MarketError::ParseError(format!("bad endDate {raw:?}: {e}")))
    }

    /// Convert the raw record into a [`Market`], pairing token ids with outcomes.
    pub fn to_market(&self) -> Result<Market, MarketError> {
        let id = self
            .id
            .as_ref()
            .map(ToString::to_string)
            .ok_or_else(|| MarketError::ParseError("missing id".to_string()))?;

        let token_ids = self
            .clob_token_ids
            .as_ref()
            .ok_or_else(|| MarketError::ParseError(format!("market {id}: missing clobTokenIds")))?
            .decode()?;
        let labels = self
            .outcomes
            .as_ref()
            .ok_or_else(|| MarketError::ParseError(format!("market {id}: missing outcomes")))?
            .decode()?;

        if token_ids.len() != labels.len() {
            warn!(
                market_id = %id,
                token_ids = token_ids.len(),
                outcomes = labels.len(),
                "Token ids and outcomes differ in length, pairing the overlap"
            );
        }
        if token_ids.is_empty() || labels.is_empty() {
            return Err(MarketError::ParseError(format!(
                "market {id}: no token ids paired with outcomes"
            )));
        }

        let binary = token_ids.len() == 2 && labels.len() == 2;
        let tokens = token_ids
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (token_id, label))| OutcomeToken {
                label,
                token_id,
                slot: if binary {
                    Outcome::from_index(index)
                } else {
                    None
                },
            })
            .collect();

        Ok(Market {
            id,
            question: self.question.clone().unwrap_or_default(),
            condition_id: self.condition_id.clone().unwrap_or_default(),
            tokens,
            active: self.active.unwrap_or(false),
            closed: self.closed.unwrap_or(false),
            end_time: self.end_time()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn outcome_from_string_works() {
        use std::str::FromStr;
        assert_eq!(Outcome::from_str("up").unwrap(), Outcome::Up);
        assert_eq!(Outcome::from_str("down").unwrap(), Outcome::Down);
        assert_eq!(Outcome::from_str("yes").unwrap(), Outcome::Up);
        assert_eq!(Outcome::from_str("no").unwrap(), Outcome::Down);
    }

    #[test]
    fn label_heuristic_falls_back_to_second_slot() {
        assert_eq!(Outcome::from_label("Up"), Outcome::Up);
        assert_eq!(Outcome::from_label("YES"), Outcome::Up);
        assert_eq!(Outcome::from_label("Down"), Outcome::Down);
        assert_eq!(Outcome::from_label("Maybe"), Outcome::Down);
    }

    #[test]
    fn explicit_slot_wins_over_label() {
        let token = OutcomeToken {
            label: "Up".to_string(),
            token_id: "1".to_string(),
            slot: Some(Outcome::Down),
        };
        assert_eq!(token.resolved_slot(), Outcome::Down);
    }

    #[test]
    fn gamma_market_with_encoded_lists_parses() {
        let raw = r#"{
            "id": "512345",
            "question": "Bitcoin Up or Down - November 3, 2:15PM-2:30PM ET",
            "conditionId": "0xabc",
            "clobTokenIds": "[\"111\", \"222\"]",
            "outcomes": "[\"Up\", \"Down\"]",
            "endDate": "2025-11-03T19:30:00Z",
            "active": true,
            "closed": false
        }"#;

        let market = serde_json::from_str::<GammaMarket>(raw)
            .unwrap()
            .to_market()
            .unwrap();

        assert_eq!(market.id, "512345");
        assert_eq!(market.tokens.len(), 2);
        assert_eq!(market.tokens[0].token_id, "111");
        assert_eq!(market.tokens[0].slot, Some(Outcome::Up));
        assert_eq!(market.tokens[1].label, "Down");
        assert_eq!(market.tokens[1].slot, Some(Outcome::Down));
        assert_eq!(market.end_time, datetime!(2025-11-03 19:30:00 UTC));
    }

    #[test]
    fn gamma_market_with_numeric_id_and_arrays_parses() {
        let raw = r#"{
            "id": 42,
            "clobTokenIds": ["1", "2"],
            "outcomes": ["Yes", "No"],
            "endDate": "2025-11-03T19:30:00Z"
        }"#;

        let market = serde_json::from_str::<GammaMarket>(raw)
            .unwrap()
            .to_market()
            .unwrap();
        assert_eq!(market.id, "42");
        assert!(!market.active);
    }

    #[test]
    fn mismatched_tokens_and_outcomes_pair_the_overlap() {
        let raw = r#"{
            "id": "1",
            "clobTokenIds": "[\"1\"]",
            "outcomes": "[\"Up\", \"Down\"]",
            "endDate": "2025-11-03T19:30:00Z"
        }"#;

        let market = serde_json::from_str::<GammaMarket>(raw)
            .unwrap()
            .to_market()
            .unwrap();
        assert_eq!(market.tokens.len(), 1);
        assert_eq!(market.tokens[0].token_id, "1");
        assert_eq!(market.tokens[0].label, "Up");
        assert_eq!(market.tokens[0].slot, None);
        assert_eq!(market.tokens[0].resolved_slot(), Outcome::Up);
    }

    #[test]
    fn market_without_token_ids_fails() {
        let raw = r#"{
            "id": "1",
            "clobTokenIds": "[]",
            "outcomes": "[\"Up\", \"Down\"]",
            "endDate": "2025-11-03T19:30:00Z"
        }"#;

        let gamma = serde_json::from_str::<GammaMarket>(raw).unwrap();
        assert!(gamma.to_market().is_err());
    }

    #[test]
    fn time_remaining_formats_minutes_and_seconds() {
        let market = Market {
            id: "1".to_string(),
            question: String::new(),
            condition_id: String::new(),
            tokens: vec![],
            active: true,
            closed: false,
            end_time: datetime!(2025-11-03 19:30:00 UTC),
        };

        assert_eq!(
            market.time_remaining_str(datetime!(2025-11-03 19:20:30 UTC)),
            "9m 30s"
        );
        assert_eq!(
            market.time_remaining_str(datetime!(2025-11-03 19:31:00 UTC)),
            "CLOSED"
        );
    }
}
