mod client;
mod config;
mod types;

pub use client::OceanClient;
pub use config::{OceanClientConfig, OCEAN_API_VERSION};
pub use types::{AddressToken, PoolPairData, PoolPairToken, PriceRatio};
