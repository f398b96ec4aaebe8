//! Unified error types for the buy-only bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the buy-only bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Market-related error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Trading/order error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// On-chain ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. All of them are fatal before the loop starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment could not be deserialized.
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The CLOB credential triple is missing or incomplete.
    #[error(
        "CLOB API credentials missing: set POLYMARKET_API_KEY, POLYMARKET_API_SECRET and \
         POLYMARKET_API_PASSPHRASE (run `derive-credentials` to obtain them)"
    )]
    MissingCredentials,
}

/// Market listing and order book errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Failed to fetch a remote resource.
    #[error("failed to fetch {resource}: {reason}")]
    FetchFailed {
        /// What was being fetched (url or token).
        resource: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse market data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The exchange has no order book for the token. Happens once a market resolves.
    #[error("no order book exists for token {token_id}")]
    OrderBookMissing {
        /// Token whose book is gone.
        token_id: String,
    },
}

/// Trading and order execution errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// Order submission failed.
    #[error("order submission failed: {0}")]
    SubmissionFailed(String),

    /// Order rejected by the exchange.
    #[error("order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason from the exchange.
        reason: String,
    },

    /// Insufficient funds for the order.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Required amount.
        required: Decimal,
        /// Available amount.
        available: Decimal,
    },

    /// Invalid order parameters.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// Token id is not a decimal integer.
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    /// Signing error.
    #[error("signing error: {0}")]
    SigningError(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Blockchain read/write errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// RPC call failed.
    #[error("rpc call {call} failed: {reason}")]
    Rpc {
        /// Contract call name.
        call: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// Condition id is not a 32-byte hex string.
    #[error("invalid condition id: {0}")]
    InvalidConditionId(String),

    /// Token id is not a decimal integer.
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    /// Address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Transaction mined but reverted, or could not be sent.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Receipt did not arrive in time.
    #[error("transaction {tx_hash} not confirmed within {seconds}s")]
    TransactionTimeout {
        /// Hash of the pending transaction.
        tx_hash: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Amount does not fit the decimal representation.
    #[error("amount overflow: {0}")]
    Overflow(String),
}

impl LedgerError {
    /// Build an RPC error from any displayable cause.
    pub fn rpc(call: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Rpc {
            call,
            reason: err.to_string(),
        }
    }

    /// Whether the error is about local input rather than the remote ledger.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidConditionId(_) | Self::InvalidTokenId(_) | Self::InvalidAddress(_)
        )
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
