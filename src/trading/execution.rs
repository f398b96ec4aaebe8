//! Live order execution through the Polymarket CLOB SDK.

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use polymarket_client_sdk::auth::state::Authenticated;
use polymarket_client_sdk::auth::{Credentials, Normal};
use polymarket_client_sdk::clob::types::Side as ClobSide;
use polymarket_client_sdk::clob::{Client, Config as ClobConfig};
use polymarket_client_sdk::types::U256;
use tracing::{debug, info, instrument};

use super::order::{OrderParams, OrderReceipt, Side};
use crate::error::{MarketError, TradingError};
use crate::gateway::ExchangeGateway;
use crate::market::PolymarketClient;
use crate::metrics;
use crate::signing::{order_funder, signature_type_from_u8};

type AuthenticatedClient = Client<Authenticated<Normal>>;

/// Signs and posts limit orders for the proxy wallet.
#[derive(Clone)]
pub struct ClobTrader {
    client: Arc<AuthenticatedClient>,
    signer: Arc<PrivateKeySigner>,
}

impl std::fmt::Debug for ClobTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClobTrader")
            .field("signer", &self.signer.address())
            .finish_non_exhaustive()
    }
}

impl ClobTrader {
    /// Authenticate against the CLOB with the configured L2 credentials.
    ///
    /// Orders are signed by the EOA key with the given signature type. Proxy
    /// and Safe signatures are funded by `holder`; EOA orders carry no funder.
    #[instrument(skip(signer, credentials))]
    pub async fn connect(
        clob_url: &str,
        signer: PrivateKeySigner,
        holder: Address,
        signature_type: u8,
        credentials: Credentials,
    ) -> Result<Self, TradingError> {
        let mut builder = Client::new(clob_url, ClobConfig::default())
            .map_err(|e| {
                TradingError::AuthenticationFailed(format!("Failed to create CLOB client: {e}"))
            })?
            .authentication_builder(&signer)
            .credentials(credentials)
            .signature_type(signature_type_from_u8(signature_type));
        if let Some(funder) = order_funder(signature_type, holder) {
            builder = builder.funder(funder);
        }

        let client = builder
            .authenticate()
            .await
            .map_err(|e| TradingError::AuthenticationFailed(e.to_string()))?;

        info!(eoa = %signer.address(), %holder, "CLOB client authenticated");

        Ok(Self {
            client: Arc::new(client),
            signer: Arc::new(signer),
        })
    }

    /// Build, sign and post one limit order.
    #[instrument(skip(self, order), fields(token_id = %order.token_id))]
    pub async fn submit(&self, order: &OrderParams) -> Result<OrderReceipt, TradingError> {
        order.validate().map_err(TradingError::InvalidParams)?;

        let token_id: U256 = order
            .token_id
            .parse()
            .map_err(|_| TradingError::InvalidTokenId(order.token_id.clone()))?;
        let side = match order.side {
            Side::Buy => ClobSide::Buy,
        };

        let _timer = metrics::timer_order_submit();

        let unsigned = self
            .client
            .limit_order()
            .token_id(token_id)
            .side(side)
            .price(order.price)
            .size(order.size)
            .build()
            .await
            .map_err(|e| TradingError::InvalidParams(e.to_string()))?;

        let signed = self
            .client
            .sign(self.signer.as_ref(), unsigned)
            .await
            .map_err(|e| TradingError::SigningError(e.to_string()))?;

        debug!(price = %order.price, size = %order.size, "Posting order");

        let response = self
            .client
            .post_order(signed)
            .await
            .map_err(|e| TradingError::SubmissionFailed(e.to_string()))?;

        if response.order_id.is_empty() {
            return Err(TradingError::OrderRejected {
                reason: "exchange returned no order id".to_string(),
            });
        }

        info!(
            order_id = %response.order_id,
            price = %order.price,
            size = %order.size,
            "Order submitted"
        );

        Ok(OrderReceipt {
            order_id: response.order_id,
            status: "accepted".to_string(),
        })
    }
}

/// Exchange gateway for live trading: REST books plus SDK submission.
#[derive(Debug, Clone)]
pub struct LiveExchange {
    books: PolymarketClient,
    trader: ClobTrader,
}

impl LiveExchange {
    /// Combine a book reader and a trader.
    pub fn new(books: PolymarketClient, trader: ClobTrader) -> Self {
        Self { books, trader }
    }
}

#[async_trait]
impl ExchangeGateway for LiveExchange {
    async fn order_book(&self, token_id: &str) -> Result<crate::orderbook::OutcomeBook, MarketError> {
        self.books.get_order_book(token_id).await
    }

    async fn post_limit_buy(&self, order: &OrderParams) -> Result<OrderReceipt, TradingError> {
        self.trader.submit(order).await
    }
}
