//! Moving own-address UTXOs into the account balance before a swap.

use rust_decimal::Decimal;

use crate::error::{RebalanceError, Result};
use crate::types::ConsolidationPlan;

/// Plans the consolidation of everything above `reserve` held as UTXOs.
///
/// Returns `None` when the balance does not exceed the reserve.
pub fn plan_consolidation(utxo_balance: Decimal, reserve: Decimal) -> Result<Option<ConsolidationPlan>> {
    if utxo_balance < Decimal::ZERO {
        return Err(RebalanceError::InvalidInput(format!(
            "UTXO balance must not be negative, got {}",
            utxo_balance
        )));
    }
    if utxo_balance <= reserve {
        return Ok(None);
    }
    let amount = utils::floor_amount(utxo_balance - reserve);
    if amount <= Decimal::ZERO {
        return Ok(None);
    }
    Ok(Some(ConsolidationPlan { amount }))
}
