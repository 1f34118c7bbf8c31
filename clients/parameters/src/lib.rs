//! Parameter and secret stores the rebalancer reads its settings from.

mod env;
mod file;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

pub use env::EnvParameterStore;
pub use file::FileParameterStore;

/// Source of named settings and decrypted secrets.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the values of the requested parameters that exist; missing
    /// names are simply absent from the map.
    async fn get_parameters(&self, names: &[&str]) -> Result<BTreeMap<String, String>>;

    /// Returns the decrypted value of a secret, or `None` when it is not set.
    async fn get_secret(&self, name: &str) -> Result<Option<String>>;
}
