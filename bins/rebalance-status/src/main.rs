//! Prints pool, balances and the rebalance decision without submitting anything.
//!
//! Usage: rebalance-status <settings.toml>

use anyhow::Result;
use clients_parameters::FileParameterStore;
use rebalance::{
    compute_decision, invocation, ChainReader, Settings, Wallet, COMMUNITY_FUND_ACCOUNT,
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <settings.toml>",
            args.first().map(|s| s.as_str()).unwrap_or("rebalance-status")
        );
        std::process::exit(1);
    }

    let store = FileParameterStore::load(args[1].trim())?;
    let settings = Settings::load(&store).await?;
    let client = reqwest::Client::builder().build()?;
    let reader = invocation::ocean_client(client.clone(), &settings);

    let pool = reader.pool_state(&settings.pool_pair).await?;
    let controlled = reader.snapshot(&settings.controlled_address).await?;
    let own = reader.snapshot(&settings.own_address).await?;
    let community_base = if settings.include_community_balance {
        invocation::node_wallet(client, &settings)?
            .community_balance(COMMUNITY_FUND_ACCOUNT)
            .await?
    } else {
        Decimal::ZERO
    };
    let decision = compute_decision(&controlled, &own, community_base, &pool, &settings.limits)?;

    println!("Network: {} | Pool: {}", settings.network, pool.symbol);
    println!(
        "  price: {} {} per {}",
        pool.price_ratio, pool.base_token_id, pool.pooled_token_id
    );
    for snapshot in [&controlled, &own] {
        println!("---");
        println!("  address: {}", snapshot.address);
        println!("  utxo:    {}", utils::format_amount(snapshot.base_amount));
        println!(
            "  base:    {}",
            utils::format_amount(snapshot.token_amount(&pool.base_token_id))
        );
        println!(
            "  pooled:  {}",
            utils::format_amount(snapshot.token_amount(&pool.pooled_token_id))
        );
    }
    println!("---");
    if settings.include_community_balance {
        println!("  community:   {}", utils::format_amount(decision.community_base));
    }
    println!("  exposure:    {}", decision.exposure_ratio.round_dp(4));
    println!("  cap:         {}", settings.limits.max_move_percent);
    println!("  target move: {}", utils::format_amount(decision.target_move));
    println!(
        "  move amount: {} ({:?})",
        utils::format_amount(decision.move_amount),
        decision.limited_by
    );

    Ok(())
}
