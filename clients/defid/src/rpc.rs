//! JSON-RPC client for a DeFiChain node wallet.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{json, Number, Value};

use crate::config::DefidRpcClientConfig;
use crate::error::{RpcError, RPC_INVALID_ADDRESS_OR_KEY};
use crate::types::{PoolSwapParams, RpcResponse, WalletTransaction};

/// Client for the defid JSON-RPC interface. Signing happens inside the node wallet.
pub struct DefidRpcClient {
    client: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

impl DefidRpcClient {
    pub fn new(client: reqwest::Client, config: DefidRpcClientConfig) -> Self {
        Self {
            client,
            url: config.url,
            user: config.user,
            password: config.password,
        }
    }

    /// Sends one JSON-RPC call and decodes its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "rebalancer",
            "method": method,
            "params": params,
        });
        tracing::debug!(method, "defid RPC");

        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        // The node answers errors with HTTP 500 and a JSON body, so decode first.
        let status = resp.status();
        let text = resp.text().await?;
        let parsed = match serde_json::from_str::<RpcResponse>(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Http {
                    method: method.to_string(),
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(source) => {
                return Err(RpcError::Decode {
                    method: method.to_string(),
                    source,
                })
            }
        };

        if let Some(error) = parsed.error {
            return Err(RpcError::Node {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(parsed.result).map_err(|source| RpcError::Decode {
            method: method.to_string(),
            source,
        })
    }

    pub async fn get_block_count(&self) -> Result<u64, RpcError> {
        self.call("getblockcount", json!([])).await
    }

    /// Looks up a wallet transaction. Returns `None` when the node does not know it.
    pub async fn get_transaction(&self, txid: &str) -> Result<Option<WalletTransaction>, RpcError> {
        match self.call("gettransaction", json!([txid])).await {
            Ok(tx) => Ok(Some(tx)),
            Err(e) if e.code() == Some(RPC_INVALID_ADDRESS_OR_KEY) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Imports a WIF key into the node wallet without rescanning the chain.
    pub async fn import_private_key(&self, wif: &str, label: &str) -> Result<(), RpcError> {
        let _: Value = self
            .call("importprivkey", json!([wif, label, false]))
            .await?;
        Ok(())
    }

    /// Moves UTXO funds of `address` into its account balance as token `token_id`.
    pub async fn utxos_to_account(
        &self,
        address: &str,
        amount: Decimal,
        token_id: &str,
    ) -> Result<String, RpcError> {
        let mut outputs = serde_json::Map::new();
        outputs.insert(
            address.to_string(),
            Value::String(utils::format_token_amount(amount, token_id)),
        );
        self.call("utxostoaccount", json!([outputs])).await
    }

    pub async fn pool_swap(&self, params: &PoolSwapParams) -> Result<String, RpcError> {
        self.call("poolswap", json!([params])).await
    }

    /// Balances of the chain's community accounts, e.g. "CommunityDevelopmentFunds".
    pub async fn list_community_balances(&self) -> Result<BTreeMap<String, Decimal>, RpcError> {
        let raw: BTreeMap<String, Number> = self.call("listcommunitybalances", json!([])).await?;
        raw.into_iter()
            .map(|(key, number)| {
                let value = number.to_string();
                match utils::parse_amount(&value) {
                    Some(amount) => Ok((key, amount)),
                    None => Err(RpcError::InvalidAmount {
                        method: "listcommunitybalances".to_string(),
                        key,
                        value,
                    }),
                }
            })
            .collect()
    }
}
