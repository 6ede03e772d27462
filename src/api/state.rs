use std::sync::Arc;

use super::db::Db;
use super::rate_limit::RateLimiter;
use crate::aggregator::PoolAggregator;
use crate::budget::BudgetEstimator;
use crate::indexer::PositionIndexer;
use crate::notify::Notifier;
use crate::oracle::OracleAggregator;
use crate::pipeline::{CustodyOracle, NodeRpc, PrivateRelay, SwapRouter, TreasuryConfig};
use crate::seal::PrivacySealer;
use crate::store::StateStore;
use crate::submission::CircuitBreaker;
use crate::wallet_lock::WalletLocks;

#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub db: Db,
    pub auth_secret: String,
    pub rpc_url: String,
    pub store: Arc<dyn StateStore>,
    pub pools: PoolAggregator,
    pub oracle: OracleAggregator,
    pub indexer: PositionIndexer,
    pub sealer: PrivacySealer,
    pub budget: BudgetEstimator,
    pub notifier: Notifier,
    pub wallet_locks: WalletLocks,
    pub swap_router: Arc<dyn SwapRouter>,
    pub custody: Arc<dyn CustodyOracle>,
    pub relay: Arc<dyn PrivateRelay>,
    pub rpc: Arc<dyn NodeRpc>,
    pub swap_breaker: CircuitBreaker,
    pub treasury: TreasuryConfig,
    pub rate_limiter: RateLimiter,
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &AppStateInner {
        &self.inner
    }
}

#[allow(clippy::too_many_arguments)]
impl AppState {
    pub fn new(
        db: Db,
        auth_secret: String,
        rpc_url: String,
        store: Arc<dyn StateStore>,
        pools: PoolAggregator,
        oracle: OracleAggregator,
        indexer: PositionIndexer,
        sealer: PrivacySealer,
        budget: BudgetEstimator,
        notifier: Notifier,
        swap_router: Arc<dyn SwapRouter>,
        custody: Arc<dyn CustodyOracle>,
        relay: Arc<dyn PrivateRelay>,
        rpc: Arc<dyn NodeRpc>,
        treasury: TreasuryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                auth_secret,
                rpc_url,
                store,
                pools,
                oracle,
                indexer,
                sealer,
                budget,
                notifier,
                wallet_locks: WalletLocks::new(),
                swap_router,
                custody,
                relay,
                rpc,
                swap_breaker: CircuitBreaker::new(),
                treasury,
                rate_limiter: RateLimiter::new(),
            }),
        }
    }
}
