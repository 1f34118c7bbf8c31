//! Interfaces to the blockchain read API and the signing wallet, plus their
//! implementations on the Ocean and defid clients.

use std::collections::BTreeMap;

use async_trait::async_trait;
use clients_defid::{DefidRpcClient, PoolSwapParams, UNBOUNDED_MAX_PRICE};
use clients_ocean::OceanClient;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use crate::config::keys;
use crate::error::{RebalanceError, Result};
use crate::types::{BalanceSnapshot, PoolState};

/// Read-only view of balances and pool prices.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn pool_state(&self, pair: &str) -> Result<PoolState>;

    /// UTXO balance of an address.
    async fn address_balance(&self, address: &str) -> Result<Decimal>;

    /// Account token balances of an address keyed by token id.
    async fn address_tokens(&self, address: &str) -> Result<BTreeMap<String, Decimal>>;

    async fn snapshot(&self, address: &str) -> Result<BalanceSnapshot> {
        let base_amount = self.address_balance(address).await?;
        let tokens = self.address_tokens(address).await?;
        Ok(BalanceSnapshot {
            address: address.to_string(),
            base_amount,
            tokens,
        })
    }
}

/// Moves UTXOs of `address` into its account balance as `token_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationRequest {
    pub address: String,
    pub token_id: String,
    pub amount: Decimal,
}

/// Swaps `from_amount` of `from_token_id` held by `from_address` into
/// `to_token_id`, credited to `to_address`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub from_address: String,
    pub from_token_id: String,
    pub from_amount: Decimal,
    pub to_address: String,
    pub to_token_id: String,
    /// Highest accepted price; `None` accepts any price
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Unknown,
}

/// Signs and broadcasts transactions, and reports their confirmation.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Returns the transaction id.
    async fn consolidate(&self, request: &ConsolidationRequest) -> Result<String>;

    /// Returns the transaction id.
    async fn swap(&self, request: &SwapRequest) -> Result<String>;

    async fn block_height(&self) -> Result<u64>;

    async fn transaction_status(&self, txid: &str) -> Result<TxStatus>;

    /// Balance of a community account as the node reports it.
    async fn community_balance(&self, account: &str) -> Result<Decimal>;
}

/// Community account whose balance belongs to the fund.
pub const COMMUNITY_FUND_ACCOUNT: &str = "CommunityDevelopmentFunds";

fn parse(what: &str, raw: &str) -> Result<Decimal> {
    utils::parse_amount(raw)
        .ok_or_else(|| RebalanceError::InvalidInput(format!("{} is not a number: {:?}", what, raw)))
}

#[async_trait]
impl ChainReader for OceanClient {
    async fn pool_state(&self, pair: &str) -> Result<PoolState> {
        let data = self.get_pool_pair(pair).await.map_err(RebalanceError::Read)?;
        Ok(PoolState {
            price_ratio: parse(&format!("{} priceRatio.ba", data.symbol), &data.price_ratio.ba)?,
            base_reserve: parse(&format!("{} reserve", data.token_b.symbol), &data.token_b.reserve)?,
            pooled_reserve: parse(&format!("{} reserve", data.token_a.symbol), &data.token_a.reserve)?,
            symbol: data.symbol,
            base_token_id: data.token_b.id,
            pooled_token_id: data.token_a.id,
        })
    }

    async fn address_balance(&self, address: &str) -> Result<Decimal> {
        let raw = self
            .get_address_balance(address)
            .await
            .map_err(RebalanceError::Read)?;
        parse(&format!("balance of {}", address), &raw)
    }

    async fn address_tokens(&self, address: &str) -> Result<BTreeMap<String, Decimal>> {
        let tokens = self
            .list_address_tokens(address)
            .await
            .map_err(RebalanceError::Read)?;
        let mut balances = BTreeMap::new();
        for token in tokens {
            let amount = parse(&format!("{} amount of {}", token.symbol, address), &token.amount)?;
            let entry = balances.entry(token.id).or_insert(Decimal::ZERO);
            *entry = entry
                .checked_add(amount)
                .ok_or_else(|| RebalanceError::InvalidInput(format!("{} balance is out of range", token.symbol)))?;
        }
        Ok(balances)
    }
}

/// Wallet backed by the node's own wallet over JSON-RPC.
pub struct DefidWallet {
    rpc: DefidRpcClient,
}

impl DefidWallet {
    pub fn new(rpc: DefidRpcClient) -> Self {
        Self { rpc }
    }

    /// Makes the signing key available to the node wallet.
    pub async fn import_key(&self, private_key: &SecretString, label: &str) -> Result<()> {
        self.rpc
            .import_private_key(private_key.expose_secret(), label)
            .await
            .map_err(|e| RebalanceError::SubmissionFailure(anyhow::Error::new(e).context("key import failed")))
    }
}

#[async_trait]
impl Wallet for DefidWallet {
    async fn consolidate(&self, request: &ConsolidationRequest) -> Result<String> {
        self.rpc
            .utxos_to_account(&request.address, request.amount, &request.token_id)
            .await
            .map_err(|e| RebalanceError::SubmissionFailure(e.into()))
    }

    async fn swap(&self, request: &SwapRequest) -> Result<String> {
        let params = PoolSwapParams {
            from: request.from_address.clone(),
            token_from: request.from_token_id.clone(),
            amount_from: utils::format_amount(request.from_amount),
            to: request.to_address.clone(),
            token_to: request.to_token_id.clone(),
            max_price: match request.max_price {
                Some(price) => price.to_f64().ok_or_else(|| {
                    RebalanceError::InvalidInput(format!("max price {} is out of range", price))
                })?,
                None => UNBOUNDED_MAX_PRICE,
            },
        };
        self.rpc
            .pool_swap(&params)
            .await
            .map_err(|e| RebalanceError::SubmissionFailure(e.into()))
    }

    async fn block_height(&self) -> Result<u64> {
        self.rpc
            .get_block_count()
            .await
            .map_err(|e| RebalanceError::Read(e.into()))
    }

    async fn transaction_status(&self, txid: &str) -> Result<TxStatus> {
        let tx = self
            .rpc
            .get_transaction(txid)
            .await
            .map_err(|e| RebalanceError::Read(e.into()))?;
        Ok(match tx {
            None => TxStatus::Unknown,
            Some(tx) if tx.is_confirmed() => TxStatus::Confirmed,
            Some(_) => TxStatus::Pending,
        })
    }

    async fn community_balance(&self, account: &str) -> Result<Decimal> {
        let balances = self
            .rpc
            .list_community_balances()
            .await
            .map_err(|e| RebalanceError::Read(e.into()))?;
        balances.get(account).copied().ok_or_else(|| {
            RebalanceError::Read(anyhow::anyhow!("node reports no {} balance", account))
        })
    }
}

/// Wallet for runs without a node. Nothing can be submitted or looked up.
pub struct ReadOnlyWallet;

impl ReadOnlyWallet {
    fn missing<T>() -> Result<T> {
        Err(RebalanceError::ConfigurationMissing(keys::NODE_USER.to_string()))
    }
}

#[async_trait]
impl Wallet for ReadOnlyWallet {
    async fn consolidate(&self, _request: &ConsolidationRequest) -> Result<String> {
        Self::missing()
    }

    async fn swap(&self, _request: &SwapRequest) -> Result<String> {
        Self::missing()
    }

    async fn block_height(&self) -> Result<u64> {
        Self::missing()
    }

    async fn transaction_status(&self, _txid: &str) -> Result<TxStatus> {
        Self::missing()
    }

    async fn community_balance(&self, _account: &str) -> Result<Decimal> {
        Self::missing()
    }
}
