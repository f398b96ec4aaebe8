//! Signing and authentication utilities for Polymarket.
//!
//! This module provides utilities for:
//! - Converting config signature types to SDK types
//! - Creating signers from private keys
//! - Converting and deriving CLOB API credentials

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use polymarket_client_sdk::auth::{Credentials, Uuid};
use polymarket_client_sdk::clob::types::SignatureType;
use polymarket_client_sdk::clob::{Client, Config as ClobConfig};
use tracing::{info, instrument};

use crate::config::ApiCredentials;
use crate::error::TradingError;

/// Convert a u8 signature type from config to SDK SignatureType.
///
/// Signature types:
/// - 0: EOA (Externally Owned Account) - standard wallet
/// - 1: Magic.link - proxy wallet
/// - 2: Gnosis Safe - multi-sig
pub fn signature_type_from_u8(sig_type: u8) -> SignatureType {
    match sig_type {
        1 => SignatureType::Proxy,
        2 => SignatureType::GnosisSafe,
        _ => SignatureType::Eoa,
    }
}

/// Funder address sent with orders.
///
/// EOA signatures trade from the signing wallet and carry no funder.
pub fn order_funder(sig_type: u8, holder: Address) -> Option<Address> {
    match signature_type_from_u8(sig_type) {
        SignatureType::Eoa => None,
        _ => Some(holder),
    }
}

/// Create a LocalSigner from a hex-encoded private key.
///
/// The private key can be with or without the "0x" prefix.
pub fn create_signer(private_key: &str) -> Result<PrivateKeySigner, TradingError> {
    let key = private_key.strip_prefix("0x").unwrap_or(private_key);
    let bytes = hex::decode(key)
        .map_err(|e| TradingError::SigningError(format!("Invalid private key hex: {}", e)))?;

    if bytes.len() != 32 {
        return Err(TradingError::SigningError(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&bytes);

    PrivateKeySigner::from_bytes(&key_bytes.into())
        .map_err(|e| TradingError::SigningError(format!("Failed to create signer: {}", e)))
}

/// Convert the configured credential triple into SDK credentials.
///
/// The API key must be a UUID.
pub fn clob_credentials(creds: &ApiCredentials) -> Result<Credentials, TradingError> {
    let key = Uuid::parse_str(creds.key.trim()).map_err(|e| {
        TradingError::AuthenticationFailed(format!("POLYMARKET_API_KEY is not a UUID: {e}"))
    })?;

    Ok(Credentials::new(
        key,
        creds.secret.clone(),
        creds.passphrase.clone(),
    ))
}

/// Fetch the CLOB credentials for `signer`, creating them on first use.
///
/// The signer must carry a chain id.
#[instrument(skip(signer), fields(address = %signer.address()))]
pub async fn derive_api_credentials(
    clob_url: &str,
    signer: &PrivateKeySigner,
) -> Result<Credentials, TradingError> {
    let client = Client::new(clob_url, ClobConfig::default()).map_err(|e| {
        TradingError::AuthenticationFailed(format!("Failed to create CLOB client: {e}"))
    })?;

    let credentials = client
        .create_or_derive_api_key(signer, None)
        .await
        .map_err(|e| TradingError::AuthenticationFailed(e.to_string()))?;

    info!(api_key = %credentials.key(), "CLOB credentials ready");
    Ok(credentials)
}
