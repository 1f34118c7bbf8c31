//! Error types for the rebalancer.

/// All errors that can end a rebalancing run.
#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("read API error: {0:#}")]
    Read(anyhow::Error),

    #[error("transaction submission failed: {0:#}")]
    SubmissionFailure(anyhow::Error),

    #[error("transaction {txid} not confirmed within {blocks} blocks")]
    ConfirmationTimeout { txid: String, blocks: u64 },

    #[error("swap failed after consolidation {consolidation_txid} was broadcast: {source}")]
    PartialExecution {
        consolidation_txid: String,
        source: Box<RebalanceError>,
    },
}

impl RebalanceError {
    pub(crate) fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        RebalanceError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RebalanceError>;
