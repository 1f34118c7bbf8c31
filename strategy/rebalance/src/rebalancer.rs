//! One rebalancing pass: consolidate, recompute, swap.

use rust_decimal::Decimal;

use crate::calculator::compute_decision;
use crate::chain::{ChainReader, ConsolidationRequest, SwapRequest, Wallet, COMMUNITY_FUND_ACCOUNT};
use crate::config::RebalancerConfig;
use crate::confirmation::wait_for_confirmation;
use crate::consolidation::plan_consolidation;
use crate::error::{RebalanceError, Result};
use crate::types::{PoolState, RebalanceDecision, RunReport, TxRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute everything but submit nothing
    pub dry_run: bool,
}

/// Rebalances the controlled address towards the configured DUSD exposure.
pub struct Rebalancer<R, W> {
    reader: R,
    wallet: W,
    config: RebalancerConfig,
}

impl<R: ChainReader, W: Wallet> Rebalancer<R, W> {
    pub fn new(reader: R, wallet: W, config: RebalancerConfig) -> Self {
        Self {
            reader,
            wallet,
            config,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Reads both addresses and computes the decision without side effects.
    pub async fn evaluate(&self, pool: &PoolState) -> Result<RebalanceDecision> {
        let controlled = self.reader.snapshot(&self.config.controlled_address).await?;
        let own = self.reader.snapshot(&self.config.own_address).await?;
        let community_base = if self.config.include_community_balance {
            let balance = self.wallet.community_balance(COMMUNITY_FUND_ACCOUNT).await?;
            tracing::debug!(%balance, "read community fund balance");
            balance
        } else {
            Decimal::ZERO
        };
        compute_decision(&controlled, &own, community_base, pool, &self.config.limits)
    }

    /// Highest DFI-per-DUSD price accepted for the swap, unbounded without a slippage limit.
    fn max_price(&self, pool: &PoolState) -> Result<Option<Decimal>> {
        self.config
            .max_slippage
            .map(|slippage| {
                (Decimal::ONE + slippage)
                    .checked_mul(pool.price_ratio)
                    .ok_or_else(|| {
                        RebalanceError::InvalidInput(format!(
                            "max price for slippage {} is out of range",
                            slippage
                        ))
                    })
            })
            .transpose()
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        let cfg = &self.config;
        let pool = self.reader.pool_state(&cfg.pool_pair).await?;
        tracing::info!(
            pool = %pool.symbol,
            price_ratio = %pool.price_ratio,
            "read pool state"
        );

        // Step 1: consolidate own UTXOs above the reserve
        let own_utxos = self.reader.address_balance(&cfg.own_address).await?;
        let consolidation = match plan_consolidation(own_utxos, cfg.limits.reserve)? {
            Some(plan) if options.dry_run => {
                tracing::info!(amount = %plan.amount, "dry run: would consolidate UTXOs");
                None
            }
            Some(plan) => {
                let request = ConsolidationRequest {
                    address: cfg.own_address.clone(),
                    token_id: pool.base_token_id.clone(),
                    amount: plan.amount,
                };
                let txid = self.wallet.consolidate(&request).await?;
                tracing::info!(amount = %plan.amount, %txid, "consolidating UTXOs");
                wait_for_confirmation(&self.wallet, &txid, &cfg.confirmation).await?;
                Some(TxRecord {
                    txid,
                    amount: plan.amount,
                })
            }
            None => {
                tracing::debug!(%own_utxos, reserve = %cfg.limits.reserve, "nothing to consolidate");
                None
            }
        };

        // Step 2: decide on post-consolidation balances
        let decision = self.evaluate(&pool).await?;
        tracing::info!(
            exposure_ratio = %decision.exposure_ratio,
            max_move_percent = %cfg.limits.max_move_percent,
            move_amount = %decision.move_amount,
            limited_by = ?decision.limited_by,
            "computed rebalance decision"
        );

        // Step 3: swap
        let swap = if decision.should_swap() && !options.dry_run {
            let request = SwapRequest {
                from_address: cfg.own_address.clone(),
                from_token_id: pool.base_token_id.clone(),
                from_amount: decision.move_amount,
                to_address: cfg.controlled_address.clone(),
                to_token_id: pool.pooled_token_id.clone(),
                max_price: self.max_price(&pool)?,
            };
            let swapped = async {
                let txid = self.wallet.swap(&request).await?;
                tracing::info!(amount = %request.from_amount, %txid, "swapping");
                wait_for_confirmation(&self.wallet, &txid, &cfg.confirmation).await?;
                Ok::<_, RebalanceError>(txid)
            }
            .await;

            match (swapped, &consolidation) {
                (Ok(txid), _) => Some(TxRecord {
                    txid,
                    amount: decision.move_amount,
                }),
                (Err(e), Some(done)) => {
                    return Err(RebalanceError::PartialExecution {
                        consolidation_txid: done.txid.clone(),
                        source: Box::new(e),
                    })
                }
                (Err(e), None) => return Err(e),
            }
        } else {
            None
        };

        Ok(RunReport {
            network: cfg.network.to_string(),
            pool: pool.symbol,
            dry_run: options.dry_run,
            consolidation,
            decision,
            swap,
        })
    }
}
