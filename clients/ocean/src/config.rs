use serde::{Deserialize, Serialize};

/// Ocean REST API version segment.
pub const OCEAN_API_VERSION: &str = "v0";

/// Configuration for OceanClient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OceanClientConfig {
    /// Base URL, e.g. "https://mainnet.ocean.jellyfishsdk.com"
    pub base_url: String,
    /// Network path segment: "mainnet", "testnet" or "regtest"
    pub network: String,
    /// Page size used for paginated listings
    pub page_size: u32,
}
