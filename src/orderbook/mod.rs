//! Order book module: book types and price evaluation.
//!
//! This module handles:
//! - Order book types and the tagged [`Quote`] result
//! - Deriving a price from the best ask and bid

pub mod aggregator;
pub mod types;

pub use aggregator::{evaluate_quote, quote_from_book};
pub use types::{OutcomeBook, PriceLevel, PriceSnapshot, Quote};
