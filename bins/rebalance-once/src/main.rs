//! Runs one rebalancing invocation, the way the scheduler host would.
//!
//! Usage: rebalance-once [settings.toml] [event_json]
//!
//! Without a settings file, parameters are read from `REBALANCE_*` environment
//! variables. `event_json` defaults to `{}`; pass `{"dryRun": true}` to submit nothing.

use anyhow::{Context, Result};
use clients_parameters::{EnvParameterStore, FileParameterStore, ParameterStore};
use rebalance::InvocationContext;

const ENV_PREFIX: &str = "REBALANCE";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        eprintln!(
            "Usage: {} [settings.toml] [event_json]",
            args.first().map(|s| s.as_str()).unwrap_or("rebalance-once")
        );
        std::process::exit(1);
    }

    let store: Box<dyn ParameterStore> = match args.get(1).map(|s| s.trim()) {
        Some(path) if !path.is_empty() && path != "-" => Box::new(FileParameterStore::load(path)?),
        _ => Box::new(EnvParameterStore::new(ENV_PREFIX)),
    };
    let event = match args.get(2) {
        Some(raw) => serde_json::from_str(raw).context("event_json is not valid JSON")?,
        None => serde_json::json!({}),
    };
    let context = InvocationContext {
        request_id: format!("local-{}", std::process::id()),
    };

    let result = rebalance::handle(event, &context, store.as_ref()).await?;
    println!("{}", result);
    Ok(())
}
