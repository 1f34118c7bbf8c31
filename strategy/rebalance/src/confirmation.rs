//! Waiting for a broadcast transaction to be included in a block.

use std::time::Duration;

use crate::chain::{TxStatus, Wallet};
use crate::error::{RebalanceError, Result};

/// How long and how often to poll for a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Give up once the chain has advanced this many blocks past the start
    pub timeout_blocks: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout_blocks: 30,
        }
    }
}

/// Polls `wallet` until `txid` is in a block.
///
/// Returns the block height observed when the confirmation was seen.
pub async fn wait_for_confirmation<W: Wallet + ?Sized>(
    wallet: &W,
    txid: &str,
    policy: &ConfirmationPolicy,
) -> Result<u64> {
    let start = wallet.block_height().await?;
    let last_block = start.saturating_add(policy.timeout_blocks);
    tracing::info!(txid, start, last_block, "waiting for confirmation");

    loop {
        match wallet.transaction_status(txid).await? {
            TxStatus::Confirmed => {
                let height = wallet.block_height().await?;
                tracing::info!(txid, height, "transaction confirmed");
                return Ok(height);
            }
            TxStatus::Unknown => {
                return Err(RebalanceError::SubmissionFailure(anyhow::anyhow!(
                    "transaction {} is unknown to the node",
                    txid
                )));
            }
            TxStatus::Pending => {}
        }

        let height = wallet.block_height().await?;
        if height > last_block {
            return Err(RebalanceError::ConfirmationTimeout {
                txid: txid.to_string(),
                blocks: policy.timeout_blocks,
            });
        }
        tracing::debug!(txid, height, "transaction still pending");
        tokio::time::sleep(policy.poll_interval).await;
    }
}
