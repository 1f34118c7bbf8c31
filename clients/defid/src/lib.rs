mod config;
mod error;
mod rpc;
mod types;

pub use config::DefidRpcClientConfig;
pub use error::RpcError;
pub use rpc::DefidRpcClient;
pub use types::{PoolSwapParams, WalletTransaction, UNBOUNDED_MAX_PRICE};
