//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Polymarket Credentials ===
    /// Wallet private key (hex, starts with 0x).
    #[serde(alias = "polymarket_pk")]
    pub polymarket_private_key: String,

    /// CLOB API key.
    #[serde(default)]
    pub polymarket_api_key: Option<String>,

    /// CLOB API secret.
    #[serde(default)]
    pub polymarket_api_secret: Option<String>,

    /// CLOB API passphrase.
    #[serde(default)]
    pub polymarket_api_passphrase: Option<String>,

    // === Wallet Configuration ===
    /// Signature type: 0=EOA, 1=Magic.link proxy, 2=Gnosis Safe.
    #[serde(default = "default_signature_type")]
    pub polymarket_signature_type: u8,

    /// Proxy wallet address. Resolved from the data API when unset.
    #[serde(default)]
    pub polymarket_funder: Option<String>,

    // === Trading Parameters ===
    /// Shares bought per triggered token.
    #[serde(default = "default_fixed_shares")]
    pub fixed_shares: Decimal,

    /// Price at or above which a token triggers a buy.
    #[serde(default = "default_target_price")]
    pub target_price: Decimal,

    /// Added to the best ask to form the limit price.
    #[serde(default = "default_buy_offset")]
    pub buy_offset: Decimal,

    /// Decimal places of the limit price.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,

    // === Loop Cadence ===
    /// Delay between ticks in milliseconds.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Jitter unit in milliseconds.
    #[serde(default = "default_jitter_step_ms")]
    pub jitter_step_ms: u64,

    /// Number of jitter buckets accounts are spread over.
    #[serde(default = "default_jitter_buckets")]
    pub jitter_buckets: u64,

    /// Backoff after a failed tick, in seconds.
    #[serde(default = "default_error_backoff_seconds")]
    pub error_backoff_seconds: u64,

    // === Settlement ===
    /// Reconcile settled positions automatically.
    #[serde(default = "default_true")]
    pub auto_claim: bool,

    /// Seconds between settlement passes.
    #[serde(default = "default_claim_interval_seconds")]
    pub claim_interval_seconds: u64,

    /// Seconds to wait for a transaction receipt.
    #[serde(default = "default_tx_timeout_seconds")]
    pub tx_timeout_seconds: u64,

    // === Market Discovery ===
    /// Only markets ending within this many minutes are eligible.
    #[serde(default = "default_discovery_window_minutes")]
    pub discovery_window_minutes: i64,

    /// Page size of the market listing query.
    #[serde(default = "default_market_limit")]
    pub market_limit: u32,

    /// Comma-separated keywords, one of which must appear in the question.
    #[serde(default = "default_asset_keywords")]
    pub asset_keywords: String,

    // === Operation Modes ===
    /// Simulation mode (no real orders or transactions).
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Starting collateral for simulation.
    #[serde(default = "default_sim_balance")]
    pub sim_balance: Decimal,

    // === Endpoints ===
    /// CLOB API base URL.
    #[serde(default = "default_clob_url")]
    pub polymarket_clob_url: String,

    /// Gamma market listing base URL.
    #[serde(default = "default_gamma_url")]
    pub gamma_api_url: String,

    /// Data API base URL (proxy wallet lookup).
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,

    /// Polygon JSON-RPC URL.
    #[serde(default = "default_rpc_url")]
    pub polygon_rpc_url: String,

    /// EVM chain id.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Timeout for REST calls in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose Prometheus metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_signature_type() -> u8 {
    2
}

fn default_fixed_shares() -> Decimal {
    Decimal::new(2, 0) // 2 shares
}

fn default_target_price() -> Decimal {
    Decimal::new(80, 2) // 0.80
}

fn default_buy_offset() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_price_decimals() -> u32 {
    2
}

fn default_check_interval_ms() -> u64 {
    500
}

fn default_jitter_step_ms() -> u64 {
    100
}

fn default_jitter_buckets() -> u64 {
    3
}

fn default_error_backoff_seconds() -> u64 {
    5
}

fn default_claim_interval_seconds() -> u64 {
    300
}

fn default_tx_timeout_seconds() -> u64 {
    120
}

fn default_discovery_window_minutes() -> i64 {
    60
}

fn default_market_limit() -> u32 {
    200
}

fn default_asset_keywords() -> String {
    "bitcoin,btc".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sim_balance() -> Decimal {
    Decimal::new(100, 0) // $100
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_data_api_url() -> String {
    "https://data-api.polymarket.com".to_string()
}

fn default_rpc_url() -> String {
    "https://polygon-rpc.com".to_string()
}

fn default_chain_id() -> u64 {
    137
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_port() -> u16 {
    8080
}


/// CLOB L2 credential triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    /// API key (uuid).
    pub key: String,
    /// Base64 HMAC secret.
    pub secret: String,
    /// Passphrase.
    pub passphrase: String,
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.polymarket_private_key.trim();
        if key.is_empty() {
            return Err(invalid("POLYMARKET_PRIVATE_KEY is required"));
        }

        if !key.starts_with("0x") {
            return Err(invalid("POLYMARKET_PRIVATE_KEY must start with 0x"));
        }

        if key.len() != 66 || !key[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("POLYMARKET_PRIVATE_KEY must be 32 bytes of hex"));
        }

        // All or none.
        self.api_credentials()?;

        if self.polymarket_signature_type > 2 {
            return Err(invalid("POLYMARKET_SIGNATURE_TYPE must be 0, 1 or 2"));
        }

        if self.trades_from_eoa() && non_empty(&self.polymarket_funder).is_some() {
            return Err(invalid(
                "POLYMARKET_FUNDER must be unset with POLYMARKET_SIGNATURE_TYPE=0",
            ));
        }

        if self.fixed_shares <= Decimal::ZERO {
            return Err(invalid("FIXED_SHARES must be positive"));
        }

        if self.target_price <= Decimal::ZERO || self.target_price > Decimal::ONE {
            return Err(invalid("TARGET_PRICE must be in (0, 1]"));
        }

        if self.buy_offset < Decimal::ZERO {
            return Err(invalid("BUY_OFFSET must not be negative"));
        }

        if self.price_decimals > 6 {
            return Err(invalid("PRICE_DECIMALS must be at most 6"));
        }

        if self.check_interval_ms == 0 {
            return Err(invalid("CHECK_INTERVAL_MS must be positive"));
        }

        if self.jitter_buckets == 0 {
            return Err(invalid("JITTER_BUCKETS must be at least 1"));
        }

        if self.discovery_window_minutes <= 0 {
            return Err(invalid("DISCOVERY_WINDOW_MINUTES must be positive"));
        }

        if self.asset_keywords().is_empty() {
            return Err(invalid("ASSET_KEYWORDS must name at least one keyword"));
        }

        Ok(())
    }

    /// The credential triple, `None` when no part is set.
    ///
    /// A partially set triple is an error.
    pub fn api_credentials(&self) -> Result<Option<ApiCredentials>, ConfigError> {
        let parts = [
            non_empty(&self.polymarket_api_key),
            non_empty(&self.polymarket_api_secret),
            non_empty(&self.polymarket_api_passphrase),
        ];

        match parts {
            [Some(key), Some(secret), Some(passphrase)] => Ok(Some(ApiCredentials {
                key: key.to_string(),
                secret: secret.to_string(),
                passphrase: passphrase.to_string(),
            })),
            [None, None, None] => Ok(None),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    /// Credentials required for a live run.
    pub fn require_api_credentials(&self) -> Result<ApiCredentials, ConfigError> {
        self.api_credentials()?
            .ok_or(ConfigError::MissingCredentials)
    }

    /// Whether the signing wallet itself holds collateral and outcome tokens
    /// (signature type 0). Otherwise a proxy wallet does.
    pub fn trades_from_eoa(&self) -> bool {
        self.polymarket_signature_type == 0
    }

    /// Lowercased asset keywords.
    pub fn asset_keywords(&self) -> Vec<String> {
        self.asset_keywords
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Delay between ticks.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Jitter unit.
    pub fn jitter_step(&self) -> Duration {
        Duration::from_millis(self.jitter_step_ms)
    }

    /// Backoff after a failed tick.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }

    /// Time between settlement passes.
    pub fn claim_interval(&self) -> Duration {
        Duration::from_secs(self.claim_interval_seconds)
    }

    /// Receipt wait for on-chain writes.
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_seconds)
    }

    /// REST timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Discovery window.
    pub fn discovery_window(&self) -> time::Duration {
        time::Duration::minutes(self.discovery_window_minutes)
    }

    /// Mode label used in logs and the status API.
    pub fn mode(&self) -> &'static str {
        if self.dry_run {
            "dry_run"
        } else {
            "live"
        }
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Hardhat account #0 key, never funded on mainnet.
#[cfg(test)]
pub(crate) const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Default configuration for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        polymarket_private_key: TEST_KEY.to_string(),
        polymarket_api_key: None,
        polymarket_api_secret: None,
        polymarket_api_passphrase: None,
        polymarket_signature_type: default_signature_type(),
        polymarket_funder: None,
        fixed_shares: default_fixed_shares(),
        target_price: default_target_price(),
        buy_offset: default_buy_offset(),
        price_decimals: default_price_decimals(),
        check_interval_ms: default_check_interval_ms(),
        jitter_step_ms: default_jitter_step_ms(),
        jitter_buckets: default_jitter_buckets(),
        error_backoff_seconds: default_error_backoff_seconds(),
        auto_claim: true,
        claim_interval_seconds: default_claim_interval_seconds(),
        tx_timeout_seconds: default_tx_timeout_seconds(),
        discovery_window_minutes: default_discovery_window_minutes(),
        market_limit: default_market_limit(),
        asset_keywords: default_asset_keywords(),
        dry_run: true,
        sim_balance: default_sim_balance(),
        polymarket_clob_url: default_clob_url(),
        gamma_api_url: default_gamma_url(),
        data_api_url: default_data_api_url(),
        polygon_rpc_url: default_rpc_url(),
        chain_id: default_chain_id(),
        http_timeout_ms: default_http_timeout_ms(),
        port: default_port(),
        metrics_enabled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_target_price(), dec!(0.80));
        assert_eq!(default_buy_offset(), dec!(0.01));
        assert_eq!(default_fixed_shares(), dec!(2));
        assert_eq!(default_claim_interval_seconds(), 300);
        assert_eq!(default_tx_timeout_seconds(), 120);
        assert!(default_true());
    }

    #[test]
    fn default_config_validates() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_private_key() {
        let config = Config {
            polymarket_private_key: "".to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_invalid_private_key_prefix() {
        let config = Config {
            polymarket_private_key: TEST_KEY.trim_start_matches("0x").to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_partial_credentials() {
        let config = Config {
            polymarket_api_key: Some("key".to_string()),
            polymarket_api_secret: Some("secret".to_string()),
            ..test_config()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn full_credentials_are_returned() {
        let config = Config {
            polymarket_api_key: Some("key".to_string()),
            polymarket_api_secret: Some("secret".to_string()),
            polymarket_api_passphrase: Some("pass".to_string()),
            ..test_config()
        };

        let creds = config.require_api_credentials().unwrap();
        assert_eq!(creds.key, "key");
        assert_eq!(creds.passphrase, "pass");
    }

    #[test]
    fn live_run_requires_credentials() {
        assert!(matches!(
            test_config().require_api_credentials(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn asset_keywords_are_normalized() {
        let config = Config {
            asset_keywords: " Bitcoin, BTC ,,".to_string(),
            ..test_config()
        };

        assert_eq!(config.asset_keywords(), vec!["bitcoin", "btc"]);
    }

    #[test]
    fn validate_rejects_target_above_one() {
        let config = Config {
            target_price: dec!(1.01),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn eoa_signature_type_trades_from_signer() {
        let config = Config {
            polymarket_signature_type: 0,
            ..test_config()
        };

        assert!(config.trades_from_eoa());
        assert!(config.validate().is_ok());
        assert!(!test_config().trades_from_eoa());
    }

    #[test]
    fn validate_rejects_funder_with_eoa_signature_type() {
        let config = Config {
            polymarket_signature_type: 0,
            polymarket_funder: Some("0x2222222222222222222222222222222222222222".to_string()),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }
}
