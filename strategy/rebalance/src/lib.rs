//! Community-fund rebalancing strategy.
//!
//! Reads the DUSD-DFI pool and the balances of the controlled and own
//! addresses, computes the DUSD exposure, consolidates own UTXOs and swaps
//! DFI into DUSD for the controlled address.

pub mod calculator;
pub mod chain;
pub mod config;
pub mod confirmation;
pub mod consolidation;
pub mod error;
pub mod invocation;
mod rebalancer;
mod types;

pub use calculator::{compute_decision, RebalanceLimits};
pub use chain::{
    ChainReader, ConsolidationRequest, DefidWallet, ReadOnlyWallet, SwapRequest, TxStatus, Wallet,
    COMMUNITY_FUND_ACCOUNT,
};
pub use config::{Network, RebalancerConfig, Settings};
pub use confirmation::{wait_for_confirmation, ConfirmationPolicy};
pub use consolidation::plan_consolidation;
pub use error::{RebalanceError, Result};
pub use invocation::{handle, InvocationContext, InvocationEvent};
pub use rebalancer::{Rebalancer, RunOptions};
pub use types::{
    BalanceSnapshot, ConsolidationPlan, MoveLimit, PoolState, RebalanceDecision, RunReport,
    TxRecord,
};
