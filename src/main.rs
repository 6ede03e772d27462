use std::collections::HashMap;

use clap::Parser;
use lp_engine::aggregator::PoolFilter;
use lp_engine::api::{self, handlers};
use lp_engine::config::EngineConfig;
use lp_engine::model::Pool;

mod cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    let config = EngineConfig::from_env_and_cli(cli.rpc_url, cli.store_url, cli.dry_run)?;

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        cli::Command::Serve { host, port, data_dir } => rt.block_on(api::serve(config, &host, port, &data_dir)),
        cli::Command::ScanPools { mint, limit } => rt.block_on(scan_pools(config, &mint, limit)),
        cli::Command::Monitor { interval_secs } => rt.block_on(monitor(config, interval_secs)),
        cli::Command::SelfTest => rt.block_on(self_test(config)),
    }
}

async fn scan_pools(config: EngineConfig, mint: &str, limit: usize) -> anyhow::Result<()> {
    let data_dir = default_data_dir();
    let state = api::build_state(&config, &data_dir).await?;

    let mut pools: Vec<Pool> = state.pools.list_top(&PoolFilter::default()).await?;
    pools.retain(|p| p.token_a.mint == mint || p.token_b.mint == mint);
    pools.truncate(limit);

    if pools.is_empty() {
        println!("no pools found for mint {mint}");
        return Ok(());
    }

    println!("{:<10} {:<46} {:>14} {:>14} {:>6} {:>4}", "venue", "address", "tvl_usd", "volume_24h", "fee", "risk");
    for pool in &pools {
        println!(
            "{:<10} {:<46} {:>14.0} {:>14.0} {:>6} {:>4}",
            format!("{:?}", pool.venue),
            pool.address,
            pool.tvl_usd,
            pool.volume_24h_usd,
            pool.fee_bps,
            pool.risk_score,
        );
    }

    Ok(())
}

/// Drives the scheduler loop directly, without the HTTP API, on a fixed
/// tick interval.
async fn monitor(config: EngineConfig, interval_secs: u64) -> anyhow::Result<()> {
    let data_dir = default_data_dir();
    let state = api::build_state(&config, &data_dir).await?;

    tracing::info!(interval_secs, "starting monitor loop");
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;
        match handlers::worker::run_tick(&state).await {
            Ok(summary) => tracing::info!(
                positions_checked = summary.positions_checked,
                rebalances_triggered = summary.rebalances_triggered,
                schedules_ticked = summary.schedules_ticked,
                schedules_failed = summary.schedules_failed,
                "monitor tick complete"
            ),
            Err(err) => tracing::error!(%err, "monitor tick failed"),
        }
    }
}

/// Exercises the pool aggregator, oracle, and node RPC once and reports
/// which are reachable, without signing or submitting anything.
async fn self_test(config: EngineConfig) -> anyhow::Result<()> {
    let data_dir = default_data_dir();
    let state = api::build_state(&config, &data_dir).await?;

    let mut report = HashMap::new();

    report.insert("pool_aggregator", state.pools.list_top(&PoolFilter::default()).await.is_ok());
    let now_unix = chrono::Utc::now().timestamp();
    report.insert(
        "oracle",
        state.oracle.price("So11111111111111111111111111111111111111112", now_unix).await.is_ok(),
    );
    report.insert("node_rpc", state.rpc.get_balance_lamports(&solana_sdk::pubkey::Pubkey::default()).await.is_ok());
    report.insert("store", state.store.get("self-test").await.is_ok());

    let mut all_ok = true;
    for (name, ok) in &report {
        println!("{name:<20} {}", if *ok { "ok" } else { "FAILED" });
        all_ok &= ok;
    }

    if !all_ok {
        anyhow::bail!("one or more collaborators failed self-test");
    }
    Ok(())
}

fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("~/.lp-engine")
}
