//! Shared utilities for the rebalancer workspace.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places DeFiChain amounts carry.
pub const AMOUNT_DECIMALS: u32 = 8;

/// Parses a decimal amount string as returned by Ocean or defid.
///
/// Accepts plain (`"12.5"`) and scientific (`"1e-8"`) notation. Returns
/// `None` for anything else.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// Formats an amount with the chain's fixed precision, e.g. `4.00000000`.
pub fn format_amount(amount: Decimal) -> String {
    let mut amount = amount;
    amount.rescale(AMOUNT_DECIMALS);
    amount.to_string()
}

/// Rounds an amount down to the chain's precision so that it never exceeds
/// the value it was derived from.
pub fn floor_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::ToNegativeInfinity)
}

/// Formats a token transfer in the node's `amount@token` notation.
pub fn format_token_amount(amount: Decimal, token_id: &str) -> String {
    format!("{}@{}", format_amount(amount), token_id)
}
