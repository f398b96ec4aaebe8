//! Polygon contract addresses and ABI bindings.

use alloy::primitives::{address, Address};
use alloy::sol;

/// USDC.e collateral token.
pub const USDC: Address = address!("2791bca1f2de4661ed88a30c99a7a9449aa84174");

/// Gnosis Conditional Tokens Framework (ERC-1155 outcome tokens and payouts).
pub const CONDITIONAL_TOKENS: Address = address!("4d97dcd97ec945f40cf65f87097ace5ea0476045");

/// Polymarket CTF exchange.
pub const CTF_EXCHANGE: Address = address!("4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e");

/// Polymarket NegRisk adapter. Redeems positions and spends collateral.
pub const NEG_RISK_ADAPTER: Address = address!("d91e80cf2e7be2e162c6513ced06f1dd0da35296");

/// Spenders that must hold a collateral allowance before trading.
pub const COLLATERAL_SPENDERS: [Address; 2] = [CTF_EXCHANGE, NEG_RISK_ADAPTER];

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    contract IConditionalTokens {
        function balanceOf(address owner, uint256 id) external view returns (uint256);
        function payoutDenominator(bytes32 conditionId) external view returns (uint256);
        function payoutNumerators(bytes32 conditionId, uint256 index) external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    contract INegRiskAdapter {
        function redeemPositions(bytes32 conditionId, uint256[] amounts) external;
    }
}
