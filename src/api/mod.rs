pub mod auth;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;
pub mod types;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post, put};
use solana_sdk::pubkey::Pubkey;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::PoolAggregator;
use crate::budget::BudgetEstimator;
use crate::config::{EngineConfig, StoreBackend};
use crate::indexer::PositionIndexer;
use crate::notify::Notifier;
use crate::oracle::OracleAggregator;
use crate::pipeline::swap_router::{DryRunSwapRouter, JupiterSwapRouter};
use crate::pipeline::{SwapRouter, TreasuryConfig};
use crate::seal::PrivacySealer;
use crate::store::memory::MemoryStore;
use crate::store::redis_store::RedisStore;
use crate::store::StateStore;
use crate::submission::dry_run::{DryRunCustody, DryRunRelay, DryRunRpc};
use crate::submission::live::{HttpCustodyOracle, HttpPrivateRelay, RpcNodeClient};
use crate::submission::{CustodyOracle, NodeRpc, PrivateRelay};
use crate::venues;

use state::AppState;

/// Constructs every collaborator the engine needs from `config`, wiring
/// live-vs-dry-run ports, and returns a ready-to-serve `AppState`. Shared
/// by the HTTP server and the CLI's `scan-pools`/`monitor`/`self-test`
/// subcommands so all four drive the identical set of collaborators.
pub async fn build_state(config: &EngineConfig, data_dir: &Path) -> Result<AppState> {
    let data_dir = if data_dir.starts_with("~") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(home).join(data_dir.strip_prefix("~").unwrap())
    } else {
        data_dir.to_path_buf()
    };

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db_path = data_dir.join("lp-engine.db");
    let (db_conn, auth_secret) = db::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;

    let store: Arc<dyn StateStore> = match &config.store {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Redis { url } => {
            Arc::new(RedisStore::connect(url).await.context("connecting to redis")?)
        }
    };

    let http_client = reqwest::Client::new();

    let pools = PoolAggregator::new(http_client.clone(), config.pool_endpoints.iter().cloned().collect());
    let oracle = OracleAggregator::new(
        http_client.clone(),
        config.oracle_primary_endpoint.clone(),
        config.oracle_secondary_endpoint.clone(),
    );
    let adapters = config
        .venues
        .iter()
        .map(|&tag| venues::adapter_for(tag, config.rpc_url.clone()))
        .collect();
    let indexer = PositionIndexer::new(adapters);
    let sealer = PrivacySealer::new(environment_secret_bytes(config)?, config.cluster_id.clone());
    let budget = BudgetEstimator::new(config.rpc_url.clone());
    let notifier = Notifier::new(http_client.clone());

    let (swap_router, custody, relay, rpc): (
        Arc<dyn SwapRouter>,
        Arc<dyn CustodyOracle>,
        Arc<dyn PrivateRelay>,
        Arc<dyn NodeRpc>,
    ) = if config.dry_run {
        tracing::warn!("starting in dry-run mode: no signatures or submissions will reach the network");
        (
            Arc::new(DryRunSwapRouter),
            Arc::new(DryRunCustody),
            Arc::new(DryRunRelay),
            Arc::new(DryRunRpc),
        )
    } else {
        (
            Arc::new(JupiterSwapRouter::new(http_client.clone(), config.swap_router_endpoint.clone())),
            Arc::new(HttpCustodyOracle::new(http_client.clone(), config.custody_endpoint.clone())),
            Arc::new(HttpPrivateRelay::new(http_client.clone(), config.relay_endpoint.clone())),
            Arc::new(RpcNodeClient::new(config.rpc_url.clone())),
        )
    };

    let treasury = TreasuryConfig {
        treasury_account: Pubkey::from_str(&config.treasury_account)
            .context("ENGINE_TREASURY_ACCOUNT is not a valid pubkey")?,
        tip_account: Pubkey::from_str(&config.tip_account).unwrap_or_default(),
        protocol_fee_bps: config.protocol_fee_bps,
    };

    Ok(AppState::new(
        db_conn,
        auth_secret,
        config.rpc_url.clone(),
        store,
        pools,
        oracle,
        indexer,
        sealer,
        budget,
        notifier,
        swap_router,
        custody,
        relay,
        rpc,
        treasury,
    ))
}

/// Binds the HTTP API over a previously-built `AppState`. This is the
/// harness that drives the engine for demonstration and integration
/// testing, not a production-hardened gateway.
pub async fn serve(config: EngineConfig, host: &str, port: u16, data_dir: &Path) -> Result<()> {
    let state = build_state(&config, data_dir).await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::users::register))
        .route("/api/auth/login", post(handlers::users::login))
        .route("/api/wallets", post(handlers::wallet::create))
        .route("/api/wallets/{wallet}", get(handlers::wallet::load))
        .route("/api/wallets/{wallet}/balance", get(handlers::wallet::balance))
        .route("/api/pools", get(handlers::pools::list))
        .route("/api/pools/best", get(handlers::pools::best_pair))
        .route("/api/pools/{venue}/{address}", get(handlers::pools::details))
        .route("/api/positions/{wallet}", get(handlers::positions::list_by_wallet))
        .route("/api/oracle/price/{mint}", get(handlers::oracle::price))
        .route("/api/oracle/prices", post(handlers::oracle::batch_prices))
        .route("/api/lp/atomic-open", post(handlers::lp::atomic_open))
        .route("/api/lp/execute-open", post(handlers::lp::execute_open))
        .route("/api/lp/atomic-withdraw", post(handlers::lp::atomic_withdraw))
        .route("/api/lp/rebalance", post(handlers::lp::rebalance))
        .route("/api/lp/collect-fees", post(handlers::lp::collect_fees))
        .route("/api/dca/schedules", post(handlers::dca::create))
        .route("/api/dca/schedules/{wallet}", get(handlers::dca::list_by_wallet))
        .route("/api/dca/schedules/{id}/pause", post(handlers::dca::pause))
        .route("/api/dca/schedules/{id}/resume", post(handlers::dca::resume))
        .route("/api/dca/schedules/{id}/cancel", post(handlers::dca::cancel))
        .route("/api/dca/schedules/{id}/history", get(handlers::dca::history))
        .route("/api/notifications/recipients", post(handlers::notifications::register_recipient))
        .route(
            "/api/notifications/recipients/{wallet}",
            put(handlers::notifications::update_preferences),
        )
        .route("/api/worker/status", get(handlers::worker::status))
        .route("/api/worker/trigger", post(handlers::worker::trigger_check))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(cors)
        .with_state(state);

    let addr = format!("{host}:{port}");
    tracing::info!(%addr, dry_run = config.dry_run, "LP engine API listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    axum::serve(listener, app).await.context("running server")?;

    Ok(())
}

/// Reads the environment's X25519 secret from `environment_secret_file`,
/// falling back to an ephemeral random key, which is only appropriate for
/// `dry_run` and local development since sealed strategies would no
/// longer be decryptable across restarts.
fn environment_secret_bytes(config: &EngineConfig) -> Result<[u8; 32]> {
    if let Some(path) = &config.environment_secret_file {
        let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("{path} must contain exactly 32 bytes"))?;
        return Ok(array);
    }

    if !config.dry_run {
        anyhow::bail!("ENGINE_ENVIRONMENT_SECRET_FILE must be set outside dry-run mode");
    }

    tracing::warn!("no environment secret file configured, generating an ephemeral key for this process");
    let mut array = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut array);
    Ok(array)
}
