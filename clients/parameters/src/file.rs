use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ParameterStore;

/// Parameter store backed by a TOML document:
///
/// ```toml
/// [parameters]
/// cfAddress = "df1q..."
/// maxPerExecution = 1000
///
/// [secrets]
/// privateKey = "L1..."
/// ```
///
/// Scalar values of any type are returned as strings.
#[derive(Debug, Clone, Default)]
pub struct FileParameterStore {
    parameters: BTreeMap<String, String>,
    secrets: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FileContents {
    #[serde(default)]
    parameters: BTreeMap<String, toml::Value>,
    #[serde(default)]
    secrets: BTreeMap<String, toml::Value>,
}

impl FileParameterStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let store = Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            parameters = store.parameters.len(),
            secrets = store.secrets.len(),
            "loaded settings file"
        );
        Ok(store)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: FileContents = toml::from_str(contents)?;
        Ok(Self {
            parameters: flatten(file.parameters),
            secrets: flatten(file.secrets),
        })
    }
}

fn flatten(values: BTreeMap<String, toml::Value>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                // tables, arrays and datetimes are not settings
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    async fn get_parameters(&self, names: &[&str]) -> Result<BTreeMap<String, String>> {
        Ok(names
            .iter()
            .filter_map(|name| {
                self.parameters
                    .get(*name)
                    .map(|v| (name.to_string(), v.clone()))
            })
            .collect())
    }

    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(name).cloned())
    }
}
