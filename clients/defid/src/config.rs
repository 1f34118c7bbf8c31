use serde::{Deserialize, Serialize};

/// Configuration for DefidRpcClient
#[derive(Clone, Serialize, Deserialize)]
pub struct DefidRpcClientConfig {
    /// JSON-RPC endpoint, e.g. "http://127.0.0.1:8555/"
    pub url: String,
    /// RPC user
    pub user: String,
    /// RPC password
    pub password: String,
}

impl std::fmt::Debug for DefidRpcClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefidRpcClientConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
