use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::ParameterStore;

/// Reads parameters and secrets from environment variables named
/// `<PREFIX>_<NAME>`, with camelCase names converted to SCREAMING_SNAKE_CASE
/// (`cfAddress` -> `REBALANCE_CF_ADDRESS`).
#[derive(Debug, Clone)]
pub struct EnvParameterStore {
    prefix: String,
}

impl EnvParameterStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable that backs a parameter name.
    pub fn variable_name(&self, name: &str) -> String {
        let mut var = String::with_capacity(self.prefix.len() + name.len() + 4);
        var.push_str(&self.prefix);
        var.push('_');
        let mut prev_lower = false;
        for c in name.chars() {
            if c.is_ascii_uppercase() && prev_lower {
                var.push('_');
            }
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            var.push(c.to_ascii_uppercase());
        }
        var
    }

    fn read(&self, name: &str) -> Option<String> {
        std::env::var(self.variable_name(name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

#[async_trait]
impl ParameterStore for EnvParameterStore {
    async fn get_parameters(&self, names: &[&str]) -> Result<BTreeMap<String, String>> {
        Ok(names
            .iter()
            .filter_map(|name| self.read(name).map(|v| (name.to_string(), v)))
            .collect())
    }

    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.read(name))
    }
}
