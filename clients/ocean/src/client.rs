//! Read-only client for the Ocean REST API.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;

use crate::config::{OceanClientConfig, OCEAN_API_VERSION};
use crate::types::{AddressToken, ApiErrorBody, ApiResponse, PoolPairData};

/// Client for the Ocean blockchain read API.
pub struct OceanClient {
    client: reqwest::Client,
    base_url: String,
    network: String,
    page_size: u32,
}

impl OceanClient {
    pub fn new(client: reqwest::Client, config: OceanClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            network: config.network,
            page_size: config.page_size.max(1),
        }
    }

    /// Returns the network this client reads from.
    pub fn network(&self) -> &str {
        &self.network
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}{}",
            self.base_url, OCEAN_API_VERSION, self.network, path
        )
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>> {
        let url = self.url(path);
        tracing::debug!(%url, "ocean GET");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("ocean request to {} failed", path))?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.error.kind.unwrap_or_default(),
                        e.error.message.unwrap_or_default()
                    )
                })
                .unwrap_or(body);
            return Err(anyhow!("ocean {} returned {}: {}", path, status, detail));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("failed to decode ocean response for {}", path))
    }

    /// Gets a pool pair by id or symbol, e.g. "DUSD-DFI".
    pub async fn get_pool_pair(&self, id: &str) -> Result<PoolPairData> {
        let resp = self
            .get::<PoolPairData>(&format!("/poolpairs/{}", id), &[])
            .await?;
        Ok(resp.data)
    }

    /// Gets the UTXO balance of an address as a decimal string.
    pub async fn get_address_balance(&self, address: &str) -> Result<String> {
        let resp = self
            .get::<String>(&format!("/address/{}/balance", address), &[])
            .await?;
        Ok(resp.data)
    }

    /// Lists every token held in the account of an address, following pagination.
    pub async fn list_address_tokens(&self, address: &str) -> Result<Vec<AddressToken>> {
        let path = format!("/address/{}/tokens", address);
        let mut tokens = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let mut query = vec![("size", self.page_size.to_string())];
            if let Some(cursor) = next.take() {
                query.push(("next", cursor));
            }
            let resp = self.get::<Vec<AddressToken>>(&path, &query).await?;
            let page_len = resp.data.len();
            tokens.extend(resp.data);

            match resp.page.and_then(|p| p.next) {
                Some(cursor) if page_len > 0 => next = Some(cursor),
                _ => break,
            }
        }

        Ok(tokens)
    }
}
