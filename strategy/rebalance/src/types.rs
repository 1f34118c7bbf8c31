//! Shared types for the rebalancing strategy.

use std::collections::BTreeMap;
use std::fmt::Write;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balances of one address, read once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Address the balances belong to
    pub address: String,
    /// Base asset held as UTXOs, outside the account balance
    pub base_amount: Decimal,
    /// Account token balances keyed by token id
    pub tokens: BTreeMap<String, Decimal>,
}

impl BalanceSnapshot {
    /// Amount of a token in the account balance, 0 when the token is absent.
    pub fn token_amount(&self, token_id: &str) -> Decimal {
        self.tokens.get(token_id).copied().unwrap_or_default()
    }
}

/// State of the tracked pool pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolState {
    /// Pair symbol, e.g. "DUSD-DFI"
    pub symbol: String,
    /// Token id of the base asset (tokenB, DFI)
    pub base_token_id: String,
    /// Token id of the pooled asset (tokenA, DUSD)
    pub pooled_token_id: String,
    /// Base asset per unit of pooled asset (reserveB / reserveA)
    pub price_ratio: Decimal,
    /// Pool reserve of the base asset
    pub base_reserve: Decimal,
    /// Pool reserve of the pooled asset
    pub pooled_reserve: Decimal,
}

/// Which bound determined the move amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveLimit {
    /// Exposure already at or above the cap; nothing to move
    ExposureCap,
    /// The amount needed to reach the exposure cap
    Target,
    /// `maxPerExecution`
    PerExecution,
    /// Base asset the own address can spend
    Available,
    /// Pool price-impact cap
    PriceImpact,
}

/// Outcome of the rebalance calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceDecision {
    /// Base asset held across both addresses (UTXO and account) plus the
    /// community fund balance when it is counted
    pub total_base: Decimal,
    /// Community development fund balance included in `total_base`
    pub community_base: Decimal,
    /// Pooled asset held across both addresses
    pub total_pooled: Decimal,
    /// `total_pooled` valued in base asset
    pub pooled_value_in_base: Decimal,
    /// Share of holdings in the pooled asset, in [0, 1]
    pub exposure_ratio: Decimal,
    /// Base amount that would bring the exposure exactly to the cap
    pub target_move: Decimal,
    /// Base amount to swap this run
    pub move_amount: Decimal,
    pub limited_by: MoveLimit,
}

impl RebalanceDecision {
    pub fn should_swap(&self) -> bool {
        self.move_amount > Decimal::ZERO
    }
}

/// Own-address UTXOs to move into the account balance before swapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationPlan {
    pub amount: Decimal,
}

/// A broadcast transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txid: String,
    pub amount: Decimal,
}

/// Summary of one rebalancing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub network: String,
    pub pool: String,
    pub dry_run: bool,
    pub consolidation: Option<TxRecord>,
    pub decision: RebalanceDecision,
    pub swap: Option<TxRecord>,
}

impl RunReport {
    /// Human readable summary used for notifications.
    pub fn to_message(&self) -> String {
        let d = &self.decision;
        let mut msg = String::new();
        let _ = writeln!(msg, "[{}] {} rebalance", self.network, self.pool);
        if self.dry_run {
            let _ = writeln!(msg, "dry run, nothing submitted");
        }
        let _ = writeln!(
            msg,
            "exposure: {}% ({} pooled in base of {} total)",
            (d.exposure_ratio * Decimal::ONE_HUNDRED).round_dp(2),
            utils::format_amount(d.pooled_value_in_base),
            utils::format_amount(d.pooled_value_in_base + d.total_base),
        );
        if let Some(tx) = &self.consolidation {
            let _ = writeln!(
                msg,
                "consolidated {} in {}",
                utils::format_amount(tx.amount),
                tx.txid
            );
        }
        match &self.swap {
            Some(tx) => {
                let _ = write!(msg, "swapped {} in {}", utils::format_amount(tx.amount), tx.txid);
            }
            None => {
                let _ = write!(
                    msg,
                    "no swap: move amount {} ({:?})",
                    utils::format_amount(d.move_amount),
                    d.limited_by
                );
            }
        }
        msg
    }
}
