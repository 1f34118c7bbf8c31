use serde::{Deserialize, Serialize};

/// `maxPrice` accepted by `poolswap` when no price limit is wanted.
pub const UNBOUNDED_MAX_PRICE: f64 = 999_999_999.0;

/// Parameters of the `poolswap` RPC.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSwapParams {
    pub from: String,
    pub token_from: String,
    /// Formatted with 8 decimals
    pub amount_from: String,
    pub to: String,
    pub token_to: String,
    pub max_price: f64,
}

/// Subset of the `gettransaction` result this workspace needs.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransaction {
    pub txid: String,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub blockhash: Option<String>,
}

impl WalletTransaction {
    /// True once the transaction is included in a block.
    pub fn is_confirmed(&self) -> bool {
        self.blockhash.is_some() && self.confirmations > 0
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}
