//! Serverless-style entry point: one event in, one empty object out.

use clients_defid::{DefidRpcClient, DefidRpcClientConfig};
use clients_ocean::{OceanClient, OceanClientConfig};
use clients_parameters::ParameterStore;
use clients_telegrambot::TelegramBot;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::Instrument;

use crate::chain::{DefidWallet, ReadOnlyWallet, Wallet};
use crate::config::{keys, Settings};
use crate::error::{RebalanceError, Result};
use crate::rebalancer::{Rebalancer, RunOptions};
use crate::types::RunReport;

const OCEAN_PAGE_SIZE: u32 = 200;
const KEY_LABEL: &str = "rebalancer";

/// Fields of the event payload the handler understands; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default)]
    pub dry_run: bool,
}

impl InvocationEvent {
    pub fn from_value(event: Value) -> Result<Self> {
        if event.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(event)
            .map_err(|e| RebalanceError::InvalidInput(format!("malformed event: {}", e)))
    }
}

/// Host-provided invocation metadata.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: String,
}

/// Builds the Ocean reader for the configured network.
pub fn ocean_client(client: reqwest::Client, settings: &Settings) -> OceanClient {
    OceanClient::new(
        client,
        OceanClientConfig {
            base_url: settings.ocean_url.clone(),
            network: settings.network.name().to_string(),
            page_size: OCEAN_PAGE_SIZE,
        },
    )
}

/// Builds the wallet backed by the configured node. Does not touch the node.
pub fn node_wallet(client: reqwest::Client, settings: &Settings) -> Result<DefidWallet> {
    let node = settings
        .node
        .as_ref()
        .ok_or_else(|| RebalanceError::ConfigurationMissing(keys::NODE_USER.to_string()))?;
    Ok(DefidWallet::new(DefidRpcClient::new(
        client,
        DefidRpcClientConfig {
            url: node.url.clone(),
            user: node.user.clone(),
            password: node.password.expose_secret().to_string(),
        },
    )))
}

async fn notify(client: reqwest::Client, settings: &Settings, report: &RunReport) {
    let Some(telegram) = &settings.telegram else {
        return;
    };
    let bot = TelegramBot::new(
        client,
        telegram.bot_key.expose_secret().to_string(),
        telegram.chat_id.clone(),
    )
    .with_base_url(telegram.api_url.clone());
    if let Err(e) = bot.push_message(&report.to_message()).await {
        tracing::warn!(error = %e, "failed to send run notification");
    }
}

/// Runs one rebalancing pass. Returns an empty JSON object on success.
///
/// A dry run never imports the key into the node wallet and works without
/// node settings unless the community balance is counted.
pub async fn handle(
    event: Value,
    context: &InvocationContext,
    store: &dyn ParameterStore,
) -> Result<Value> {
    let event = InvocationEvent::from_value(event)?;
    let span = tracing::info_span!("invocation", request_id = %context.request_id);
    run(event, store).instrument(span).await?;
    Ok(Value::Object(serde_json::Map::new()))
}

async fn run(event: InvocationEvent, store: &dyn ParameterStore) -> Result<RunReport> {
    let settings = Settings::load(store).await?;
    tracing::info!(
        network = %settings.network,
        pool = %settings.pool_pair,
        dry_run = event.dry_run,
        "loaded settings"
    );

    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| RebalanceError::Read(e.into()))?;
    let reader = ocean_client(client.clone(), &settings);
    let options = RunOptions {
        dry_run: event.dry_run,
    };

    let report = match (&settings.node, event.dry_run) {
        (None, true) => execute(reader, ReadOnlyWallet, &settings, options).await?,
        (_, true) => {
            let wallet = node_wallet(client.clone(), &settings)?;
            execute(reader, wallet, &settings, options).await?
        }
        (_, false) => {
            let wallet = node_wallet(client.clone(), &settings)?;
            wallet.import_key(&settings.private_key, KEY_LABEL).await?;
            execute(reader, wallet, &settings, options).await?
        }
    };

    notify(client, &settings, &report).await;
    Ok(report)
}

async fn execute<W: Wallet>(
    reader: OceanClient,
    wallet: W,
    settings: &Settings,
    options: RunOptions,
) -> Result<RunReport> {
    let rebalancer = Rebalancer::new(reader, wallet, settings.rebalancer_config());
    let report = rebalancer.run(options).await?;
    tracing::info!(
        consolidated = report.consolidation.is_some(),
        swapped = report.swap.is_some(),
        "rebalance finished"
    );
    Ok(report)
}
