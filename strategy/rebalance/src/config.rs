//! Settings loaded from the parameter store once per invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clients_parameters::ParameterStore;
use clients_telegrambot::TELEGRAM_API_BASE;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::calculator::RebalanceLimits;
use crate::confirmation::ConfirmationPolicy;
use crate::error::{RebalanceError, Result};

/// Parameter names as stored in the parameter store.
pub mod keys {
    pub const CF_ADDRESS: &str = "cfAddress";
    pub const OWN_ADDRESS: &str = "ownAddress";
    pub const PRIVATE_KEY: &str = "privateKey";
    pub const MAX_PER_EXECUTION: &str = "maxPerExecution";
    pub const MAX_MOVE_PERCENT: &str = "maxMovePercent";

    pub const NETWORK: &str = "network";
    pub const POOL_PAIR: &str = "poolPair";
    pub const OCEAN_URL: &str = "oceanUrl";
    pub const RESERVE: &str = "reserve";
    pub const MAX_PRICE_IMPACT: &str = "maxPriceImpact";
    pub const MAX_SLIPPAGE: &str = "maxSlippage";
    pub const INCLUDE_COMMUNITY_BALANCE: &str = "includeCommunityBalance";
    pub const NODE_URL: &str = "nodeUrl";
    pub const NODE_USER: &str = "nodeUser";
    pub const NODE_PASSWORD: &str = "nodePassword";
    pub const CONFIRMATION_TIMEOUT_BLOCKS: &str = "confirmationTimeoutBlocks";
    pub const CONFIRMATION_POLL_SECS: &str = "confirmationPollSecs";
    pub const TELEGRAM_CHAT_ID: &str = "telegramChatId";
    pub const TELEGRAM_BOT_KEY: &str = "telegramBotKey";
    pub const TELEGRAM_API_URL: &str = "telegramApiUrl";

    pub(crate) const PARAMETERS: &[&str] = &[
        CF_ADDRESS,
        OWN_ADDRESS,
        MAX_PER_EXECUTION,
        MAX_MOVE_PERCENT,
        NETWORK,
        POOL_PAIR,
        OCEAN_URL,
        RESERVE,
        MAX_PRICE_IMPACT,
        MAX_SLIPPAGE,
        INCLUDE_COMMUNITY_BALANCE,
        NODE_URL,
        NODE_USER,
        CONFIRMATION_TIMEOUT_BLOCKS,
        CONFIRMATION_POLL_SECS,
        TELEGRAM_CHAT_ID,
        TELEGRAM_API_URL,
    ];
}

pub const DEFAULT_POOL_PAIR: &str = "DUSD-DFI";
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8555/";
pub const DEFAULT_RESERVE: Decimal = Decimal::ONE;

/// Target DeFiChain network, chosen explicitly in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// Public Ocean endpoint for the network. Regtest has none.
    pub fn default_ocean_url(&self) -> Option<String> {
        match self {
            Network::Mainnet | Network::Testnet => {
                Some(format!("https://{}.ocean.jellyfishsdk.com", self.name()))
            }
            Network::Regtest => None,
        }
    }

    /// Human-readable part of native segwit addresses on this network.
    pub fn bech32_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "df1",
            Network::Testnet => "tf1",
            Network::Regtest => "bcrt1",
        }
    }

    /// Network a bech32 address belongs to; `None` for legacy addresses.
    pub fn of_bech32_address(address: &str) -> Option<Network> {
        let lower = address.to_ascii_lowercase();
        [Network::Mainnet, Network::Testnet, Network::Regtest]
            .into_iter()
            .find(|n| lower.starts_with(n.bech32_prefix()))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(RebalanceError::invalid_config(
                keys::NETWORK,
                format!("unknown network {:?}", other),
            )),
        }
    }
}

/// Connection to the node wallet that signs and broadcasts.
#[derive(Debug)]
pub struct NodeSettings {
    pub url: String,
    pub user: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct TelegramSettings {
    pub bot_key: SecretString,
    pub chat_id: String,
    /// Bot API host, the public one unless overridden
    pub api_url: String,
}

/// Everything one invocation needs. Built once, never mutated.
#[derive(Debug)]
pub struct Settings {
    pub network: Network,
    pub controlled_address: String,
    pub own_address: String,
    pub private_key: SecretString,
    pub limits: RebalanceLimits,
    pub pool_pair: String,
    pub ocean_url: String,
    pub max_slippage: Option<Decimal>,
    /// Count the node's community development fund balance as fund base asset
    pub include_community_balance: bool,
    pub confirmation: ConfirmationPolicy,
    pub node: Option<NodeSettings>,
    pub telegram: Option<TelegramSettings>,
}

/// The non-secret part of the settings the orchestrator works with.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancerConfig {
    pub network: Network,
    pub controlled_address: String,
    pub own_address: String,
    pub pool_pair: String,
    pub limits: RebalanceLimits,
    pub max_slippage: Option<Decimal>,
    pub include_community_balance: bool,
    pub confirmation: ConfirmationPolicy,
}

struct Params(BTreeMap<String, String>);

impl Params {
    fn optional(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| RebalanceError::ConfigurationMissing(key.to_string()))
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>>
    where
        T::Err: fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| RebalanceError::invalid_config(key, format!("{:?}: {}", raw, e)))
            })
            .transpose()
    }

    fn number(&self, key: &str) -> Result<Option<Decimal>> {
        self.optional(key)
            .map(|raw| {
                utils::parse_amount(raw).ok_or_else(|| {
                    RebalanceError::invalid_config(key, format!("{:?} is not a decimal number", raw))
                })
            })
            .transpose()
    }

    fn required_number(&self, key: &str) -> Result<Decimal> {
        self.required(key)?;
        self.number(key)?
            .ok_or_else(|| RebalanceError::ConfigurationMissing(key.to_string()))
    }
}

async fn secret(store: &dyn ParameterStore, key: &str) -> Result<Option<SecretString>> {
    let value = store
        .get_secret(key)
        .await
        .map_err(|e| RebalanceError::invalid_config(key, format!("{:#}", e)))?;
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretString::from(v.trim().to_string())))
}

fn validate_url(key: &str, raw: &str) -> Result<String> {
    url::Url::parse(raw).map_err(|e| RebalanceError::invalid_config(key, e.to_string()))?;
    Ok(raw.to_string())
}

fn check_address_network(key: &str, address: &str, network: Network) -> Result<()> {
    match Network::of_bech32_address(address) {
        Some(other) if other != network => Err(RebalanceError::invalid_config(
            key,
            format!("{} address used with network {}", other, network),
        )),
        _ => Ok(()),
    }
}

impl Settings {
    /// Reads and validates all settings from the store.
    pub async fn load(store: &dyn ParameterStore) -> Result<Self> {
        let params = Params(
            store
                .get_parameters(keys::PARAMETERS)
                .await
                .map_err(|e| RebalanceError::invalid_config("parameters", format!("{:#}", e)))?,
        );

        let network = params.parse::<Network>(keys::NETWORK)?.unwrap_or_default();
        let controlled_address = params.required(keys::CF_ADDRESS)?.to_string();
        let own_address = params.required(keys::OWN_ADDRESS)?.to_string();
        check_address_network(keys::CF_ADDRESS, &controlled_address, network)?;
        check_address_network(keys::OWN_ADDRESS, &own_address, network)?;

        let private_key = secret(store, keys::PRIVATE_KEY)
            .await?
            .ok_or_else(|| RebalanceError::ConfigurationMissing(keys::PRIVATE_KEY.to_string()))?;

        let limits = RebalanceLimits {
            max_per_execution: params.required_number(keys::MAX_PER_EXECUTION)?,
            max_move_percent: params.required_number(keys::MAX_MOVE_PERCENT)?,
            reserve: params.number(keys::RESERVE)?.unwrap_or(DEFAULT_RESERVE),
            max_price_impact: params.number(keys::MAX_PRICE_IMPACT)?,
        };
        limits
            .validate()
            .map_err(|e| RebalanceError::invalid_config("limits", e.to_string()))?;

        let max_slippage = params.number(keys::MAX_SLIPPAGE)?;
        if let Some(slippage) = max_slippage {
            if slippage < Decimal::ZERO {
                return Err(RebalanceError::invalid_config(
                    keys::MAX_SLIPPAGE,
                    "must not be negative",
                ));
            }
        }

        let ocean_url = match params.optional(keys::OCEAN_URL) {
            Some(raw) => validate_url(keys::OCEAN_URL, raw)?,
            None => network
                .default_ocean_url()
                .ok_or_else(|| RebalanceError::ConfigurationMissing(keys::OCEAN_URL.to_string()))?,
        };

        let mut confirmation = ConfirmationPolicy::default();
        if let Some(blocks) = params.parse::<u64>(keys::CONFIRMATION_TIMEOUT_BLOCKS)? {
            confirmation.timeout_blocks = blocks;
        }
        if let Some(secs) = params.parse::<u64>(keys::CONFIRMATION_POLL_SECS)? {
            confirmation.poll_interval = Duration::from_secs(secs.max(1));
        }

        let node = match params.optional(keys::NODE_USER) {
            Some(user) => {
                let password = secret(store, keys::NODE_PASSWORD).await?.ok_or_else(|| {
                    RebalanceError::ConfigurationMissing(keys::NODE_PASSWORD.to_string())
                })?;
                let url = validate_url(
                    keys::NODE_URL,
                    params.optional(keys::NODE_URL).unwrap_or(DEFAULT_NODE_URL),
                )?;
                Some(NodeSettings {
                    url,
                    user: user.to_string(),
                    password,
                })
            }
            None => None,
        };

        let include_community_balance = params
            .parse::<bool>(keys::INCLUDE_COMMUNITY_BALANCE)?
            .unwrap_or(false);
        if include_community_balance && node.is_none() {
            return Err(RebalanceError::ConfigurationMissing(keys::NODE_USER.to_string()));
        }

        let telegram = match params.optional(keys::TELEGRAM_CHAT_ID) {
            Some(chat_id) => {
                let api_url = validate_url(
                    keys::TELEGRAM_API_URL,
                    params
                        .optional(keys::TELEGRAM_API_URL)
                        .unwrap_or(TELEGRAM_API_BASE),
                )?;
                secret(store, keys::TELEGRAM_BOT_KEY)
                    .await?
                    .map(|bot_key| TelegramSettings {
                        bot_key,
                        chat_id: chat_id.to_string(),
                        api_url: api_url.trim_end_matches('/').to_string(),
                    })
            }
            None => None,
        };

        Ok(Self {
            network,
            controlled_address,
            own_address,
            private_key,
            limits,
            pool_pair: params
                .optional(keys::POOL_PAIR)
                .unwrap_or(DEFAULT_POOL_PAIR)
                .to_string(),
            ocean_url,
            max_slippage,
            include_community_balance,
            confirmation,
            node,
            telegram,
        })
    }

    pub fn rebalancer_config(&self) -> RebalancerConfig {
        RebalancerConfig {
            network: self.network,
            controlled_address: self.controlled_address.clone(),
            own_address: self.own_address.clone(),
            pool_pair: self.pool_pair.clone(),
            limits: self.limits,
            max_slippage: self.max_slippage,
            include_community_balance: self.include_community_balance,
            confirmation: self.confirmation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients_parameters::FileParameterStore;
    use rust_decimal_macros::dec;
    use secrecy::ExposeSecret;

    const BASE: &str = r#"
        [parameters]
        cfAddress = "df1qcf"
        ownAddress = "df1qown"
        maxPerExecution = 1000
        maxMovePercent = 0.3

        [secrets]
        privateKey = "L1wif"
    "#;

    async fn load(contents: &str) -> Result<Settings> {
        let store = FileParameterStore::from_toml_str(contents).unwrap();
        Settings::load(&store).await
    }

    #[tokio::test]
    async fn loads_required_settings_with_defaults() {
        let settings = load(BASE).await.unwrap();
        assert_eq!(settings.network, Network::Mainnet);
        assert_eq!(settings.controlled_address, "df1qcf");
        assert_eq!(settings.own_address, "df1qown");
        assert_eq!(settings.private_key.expose_secret(), "L1wif");
        assert_eq!(settings.limits.max_per_execution, dec!(1000));
        assert_eq!(settings.limits.max_move_percent, dec!(0.3));
        assert_eq!(settings.limits.reserve, DEFAULT_RESERVE);
        assert_eq!(settings.pool_pair, DEFAULT_POOL_PAIR);
        assert_eq!(settings.ocean_url, "https://mainnet.ocean.jellyfishsdk.com");
        assert!(settings.node.is_none());
        assert!(settings.telegram.is_none());
        assert!(!settings.include_community_balance);
    }

    #[tokio::test]
    async fn missing_required_setting_is_reported_by_name() {
        let contents = BASE.replace("ownAddress = \"df1qown\"", "");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigurationMissing(ref k) if k == "ownAddress"));

        let contents = BASE.replace("privateKey = \"L1wif\"", "");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigurationMissing(ref k) if k == "privateKey"));
    }

    #[tokio::test]
    async fn malformed_number_is_invalid_configuration() {
        let contents = BASE.replace("maxPerExecution = 1000", "maxPerExecution = \"lots\"");
        let err = load(&contents).await.unwrap_err();
        assert!(
            matches!(err, RebalanceError::InvalidConfiguration { ref key, .. } if key == "maxPerExecution")
        );
    }

    #[tokio::test]
    async fn move_percent_outside_unit_range_is_rejected() {
        let contents = BASE.replace("maxMovePercent = 0.3", "maxMovePercent = 30");
        assert!(load(&contents).await.is_err());
    }

    #[tokio::test]
    async fn network_is_explicit_and_checked_against_addresses() {
        let contents = BASE.replace("[parameters]", "[parameters]\nnetwork = \"testnet\"");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::InvalidConfiguration { ref key, .. } if key == "cfAddress"));

        let contents = contents.replace("df1q", "tf1q");
        let settings = load(&contents).await.unwrap();
        assert_eq!(settings.network, Network::Testnet);
        assert_eq!(settings.ocean_url, "https://testnet.ocean.jellyfishsdk.com");
    }

    #[tokio::test]
    async fn regtest_needs_an_ocean_url() {
        let contents = BASE
            .replace("df1q", "bcrt1q")
            .replace("[parameters]", "[parameters]\nnetwork = \"regtest\"");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigurationMissing(ref k) if k == "oceanUrl"));
    }

    #[tokio::test]
    async fn node_and_telegram_are_optional_blocks() {
        let contents = format!(
            "{}\nnodePassword = \"pw\"\ntelegramBotKey = \"bot\"",
            BASE.replace(
                "[parameters]",
                "[parameters]\nnodeUser = \"satoshi\"\ntelegramChatId = \"42\"\nconfirmationTimeoutBlocks = 10"
            )
        );
        let settings = load(&contents).await.unwrap();
        let node = settings.node.unwrap();
        assert_eq!(node.user, "satoshi");
        assert_eq!(node.url, DEFAULT_NODE_URL);
        assert_eq!(node.password.expose_secret(), "pw");
        let telegram = settings.telegram.unwrap();
        assert_eq!(telegram.chat_id, "42");
        assert_eq!(telegram.api_url, TELEGRAM_API_BASE);
        assert_eq!(settings.confirmation.timeout_blocks, 10);
    }

    #[tokio::test]
    async fn node_user_without_password_is_missing() {
        let contents = BASE.replace("[parameters]", "[parameters]\nnodeUser = \"satoshi\"");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigurationMissing(ref k) if k == "nodePassword"));
    }

    #[tokio::test]
    async fn community_balance_needs_a_node() {
        let contents = BASE.replace("[parameters]", "[parameters]\nincludeCommunityBalance = true");
        let err = load(&contents).await.unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigurationMissing(ref k) if k == "nodeUser"));

        let contents = format!(
            "{}\nnodePassword = \"pw\"",
            contents.replace("[parameters]", "[parameters]\nnodeUser = \"satoshi\"")
        );
        let settings = load(&contents).await.unwrap();
        assert!(settings.include_community_balance);
        assert!(settings.rebalancer_config().include_community_balance);
    }

    #[tokio::test]
    async fn amounts_keep_full_precision() {
        let contents = BASE
            .replace("maxPerExecution = 1000", "maxPerExecution = \"683.14727877\"")
            .replace("[parameters]", "[parameters]\nreserve = \"0.00000001\"\nmaxSlippage = 0.05");
        let settings = load(&contents).await.unwrap();
        assert_eq!(settings.limits.max_per_execution, dec!(683.14727877));
        assert_eq!(settings.limits.reserve, dec!(0.00000001));
        assert_eq!(settings.max_slippage, Some(dec!(0.05)));
    }

    #[test]
    fn bech32_prefix_detection() {
        assert_eq!(Network::of_bech32_address("tf1qabc"), Some(Network::Testnet));
        assert_eq!(Network::of_bech32_address("df1qabc"), Some(Network::Mainnet));
        assert_eq!(Network::of_bech32_address("8defichain"), None);
    }
}
