//! Conversions between on-chain integers and decimals.
//!
//! USDC and CTF outcome tokens both use 6 decimals on Polygon.

use std::str::FromStr;

use alloy::primitives::{B256, U256};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Decimals of USDC and outcome tokens.
pub const TOKEN_DECIMALS: u32 = 6;

/// Convert base units to a decimal amount.
pub fn from_base_units(units: U256) -> Result<Decimal, LedgerError> {
    let raw: u128 = units
        .try_into()
        .map_err(|_| LedgerError::Overflow(units.to_string()))?;
    let mut value =
        Decimal::from_u128(raw).ok_or_else(|| LedgerError::Overflow(units.to_string()))?;
    value
        .set_scale(TOKEN_DECIMALS)
        .map_err(|e| LedgerError::Overflow(e.to_string()))?;
    Ok(value.normalize())
}

/// Convert a decimal amount to base units, truncating extra decimals.
pub fn to_base_units(amount: Decimal) -> Result<U256, LedgerError> {
    if amount.is_sign_negative() {
        return Err(LedgerError::Overflow(format!("negative amount {amount}")));
    }
    let scaled = (amount * Decimal::from(10u64.pow(TOKEN_DECIMALS))).trunc();
    let raw = scaled
        .to_u128()
        .ok_or_else(|| LedgerError::Overflow(amount.to_string()))?;
    Ok(U256::from(raw))
}

/// Parse a 0x-prefixed 32-byte condition id.
pub fn parse_condition_id(raw: &str) -> Result<B256, LedgerError> {
    B256::from_str(raw.trim()).map_err(|_| LedgerError::InvalidConditionId(raw.to_string()))
}

/// Parse a decimal CLOB token id.
pub fn parse_token_id(raw: &str) -> Result<U256, LedgerError> {
    U256::from_str_radix(raw.trim(), 10).map_err(|_| LedgerError::InvalidTokenId(raw.to_string()))
}
