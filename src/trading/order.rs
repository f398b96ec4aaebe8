//! Order types and creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Order side. The bot only ever buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
}

/// Order time-in-force.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-till-cancelled: rests on the book until filled or cancelled.
    #[default]
    #[strum(serialize = "GTC", serialize = "gtc")]
    GTC,
}

/// Order parameters for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderParams {
    /// Token ID to trade.
    pub token_id: String,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Order size in shares.
    pub size: Decimal,
    /// Time-in-force.
    pub tif: TimeInForce,
}

impl OrderParams {
    /// Create a new limit buy order.
    pub fn buy(token_id: impl Into<String>, price: Decimal, size: Decimal) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Buy,
            price,
            size,
            tif: TimeInForce::GTC,
        }
    }

    /// Collateral the order spends if fully filled.
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_id.is_empty() {
            return Err("token_id is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if self.size <= Decimal::ZERO {
            return Err("size must be positive".to_string());
        }
        Ok(())
    }
}

/// Acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    /// Exchange order ID.
    pub order_id: String,
    /// Status reported at submission.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_params_creation() {
        let buy = OrderParams::buy("token-123", dec!(0.86), dec!(2));
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.price, dec!(0.86));
        assert_eq!(buy.size, dec!(2));
        assert_eq!(buy.tif, TimeInForce::GTC);
        assert_eq!(buy.notional(), dec!(1.72));
    }

    #[test]
    fn order_params_validation() {
        let valid = OrderParams::buy("token", dec!(0.50), dec!(10));
        assert!(valid.validate().is_ok());

        let no_token = OrderParams::buy("", dec!(0.50), dec!(10));
        assert!(no_token.validate().is_err());

        let zero_price = OrderParams::buy("token", dec!(0), dec!(10));
        assert!(zero_price.validate().is_err());

        let negative_size = OrderParams::buy("token", dec!(0.50), dec!(-10));
        assert!(negative_size.validate().is_err());
    }

    #[test]
    fn time_in_force_from_string() {
        use std::str::FromStr;
        assert_eq!(TimeInForce::from_str("GTC").unwrap(), TimeInForce::GTC);
        assert_eq!(TimeInForce::from_str("gtc").unwrap(), TimeInForce::GTC);
    }
}
