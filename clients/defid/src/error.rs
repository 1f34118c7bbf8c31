/// Errors returned by the node RPC client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC {method} returned HTTP {status}: {body}")]
    Http {
        method: String,
        status: u16,
        body: String,
    },

    #[error("RPC {method} failed with code {code}: {message}")]
    Node {
        method: String,
        code: i64,
        message: String,
    },

    #[error("failed to decode RPC {method} result: {source}")]
    Decode {
        method: String,
        source: serde_json::Error,
    },

    #[error("RPC {method} returned a malformed amount for {key}: {value}")]
    InvalidAmount {
        method: String,
        key: String,
        value: String,
    },
}

/// Node error code for an unknown or non-wallet transaction id.
pub(crate) const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

impl RpcError {
    /// Returns the node error code, if the node answered with one.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Node { code, .. } => Some(*code),
            _ => None,
        }
    }
}
