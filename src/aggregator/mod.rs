//! Concurrently fetches pool lists from every
//! enabled venue's public index, normalizes into the canonical `Pool`,
//! caches per venue for 60 s, filters, deduplicates by unordered
//! token-symbol pair keeping the highest APR, and sorts.

pub mod risk;

pub(crate) mod cache;

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::model::pool::{Granularity, TokenSide};
use crate::model::{Pool, VenueTag};

use cache::TtlCache;

const CACHE_TTL: Duration = Duration::from_secs(60);
const ALL_VENUES: [VenueTag; 3] = [VenueTag::Dlmm, VenueTag::Whirlpool, VenueTag::Clmm];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Apr,
    Tvl,
    Volume,
    RiskAdjustedYield,
}

#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    pub min_tvl_usd: Option<f64>,
    pub max_risk_score: Option<u8>,
    pub venue: Option<VenueTag>,
    pub sort: Option<SortKey>,
}

/// Venue index response shape, grounded on the external-collaborator
/// contract: "list endpoint per venue returning at least {address, token
/// pair, TVL, APR, volume, granularity}".
#[derive(Debug, Deserialize)]
struct RawPoolList {
    pools: Vec<RawPool>,
}

#[derive(Debug, Deserialize)]
struct RawPool {
    address: String,
    token_a: TokenSide,
    token_b: TokenSide,
    price: f64,
    granularity_units: u16,
    tvl_usd: f64,
    volume_24h_usd: f64,
    fee_bps: u16,
    current_index: i32,
}

pub struct PoolAggregator {
    client: reqwest::Client,
    endpoints: HashMap<VenueTag, String>,
    cache: TtlCache<VenueTag, Vec<Pool>>,
}

impl PoolAggregator {
    pub fn new(client: reqwest::Client, endpoints: HashMap<VenueTag, String>) -> Self {
        Self {
            client,
            endpoints,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    async fn fetch_venue(&self, venue: VenueTag) -> Result<Vec<Pool>> {
        if let Some(cached) = self.cache.get(&venue).await {
            return Ok(cached);
        }

        let Some(endpoint) = self.endpoints.get(&venue) else {
            return Ok(Vec::new());
        };

        let raw: RawPoolList = self
            .client
            .get(endpoint)
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .json()
            .await?;

        let pools: Vec<Pool> = raw
            .pools
            .into_iter()
            .map(|p| normalize(venue, p))
            .collect();

        self.cache.put(venue, pools.clone()).await;
        Ok(pools)
    }

    /// Fetch every enabled venue concurrently, normalize, filter, dedup,
    /// and sort.
    pub async fn list_top(&self, filter: &PoolFilter) -> Result<Vec<Pool>> {
        let venues: Vec<VenueTag> = match filter.venue {
            Some(v) => vec![v],
            None => ALL_VENUES.to_vec(),
        };

        let fetches: Vec<_> = venues
            .into_iter()
            .map(|v| Box::pin(self.fetch_venue(v)) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Pool>>> + Send + '_>>)
            .collect();
        let results = crate::concurrency::join_all(fetches).await;

        let mut pools: Vec<Pool> = Vec::new();
        for result in results {
            pools.extend(result?);
        }

        if let Some(min_tvl) = filter.min_tvl_usd {
            pools.retain(|p| p.tvl_usd >= min_tvl);
        }
        if let Some(max_risk) = filter.max_risk_score {
            pools.retain(|p| p.risk_score <= max_risk);
        }

        let pools = dedup_best_apr(pools);
        let mut pools = pools;
        sort_pools(&mut pools, filter.sort.unwrap_or(SortKey::Apr));
        Ok(pools)
    }

    /// `best-pool-for-pair(a,b)`: the single highest-APR match across all
    /// venues for an unordered symbol pair.
    pub async fn best_pool_for_pair(&self, a: &str, b: &str) -> Result<Option<Pool>> {
        let pools = self.list_top(&PoolFilter::default()).await?;
        let target = order_pair(a, b);
        Ok(pools
            .into_iter()
            .filter(|p| p.unordered_symbol_pair() == target)
            .max_by(|x, y| x.apr().total_cmp(&y.apr())))
    }
}

fn order_pair(a: &str, b: &str) -> (String, String) {
    let (mut a, mut b) = (a.to_string(), b.to_string());
    if b < a {
        std::mem::swap(&mut a, &mut b);
    }
    (a, b)
}

fn normalize(venue: VenueTag, raw: RawPool) -> Pool {
    let granularity = match venue {
        VenueTag::Dlmm => Granularity::BinStep(raw.granularity_units),
        VenueTag::Whirlpool | VenueTag::Clmm => Granularity::TickSpacing(raw.granularity_units),
    };

    let risk_score = risk::score(
        &raw.token_a.symbol,
        &raw.token_b.symbol,
        raw.tvl_usd,
        raw.volume_24h_usd,
    );

    Pool {
        address: raw.address,
        venue,
        token_a: raw.token_a,
        token_b: raw.token_b,
        price: raw.price,
        granularity,
        tvl_usd: raw.tvl_usd,
        volume_24h_usd: raw.volume_24h_usd,
        fee_bps: raw.fee_bps,
        risk_score,
        current_index: raw.current_index,
    }
}

fn dedup_best_apr(pools: Vec<Pool>) -> Vec<Pool> {
    let mut best: HashMap<(String, String), Pool> = HashMap::new();
    for pool in pools {
        let key = pool.unordered_symbol_pair();
        match best.get(&key) {
            Some(existing) if existing.apr() >= pool.apr() => {}
            _ => {
                best.insert(key, pool);
            }
        }
    }
    best.into_values().collect()
}

fn sort_pools(pools: &mut [Pool], sort: SortKey) {
    pools.sort_by(|a, b| {
        let (x, y) = match sort {
            SortKey::Apr => (a.apr(), b.apr()),
            SortKey::Tvl => (a.tvl_usd, b.tvl_usd),
            SortKey::Volume => (a.volume_24h_usd, b.volume_24h_usd),
            SortKey::RiskAdjustedYield => (a.risk_adjusted_yield(), b.risk_adjusted_yield()),
        };
        y.total_cmp(&x)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(address: &str, venue: VenueTag, a: &str, b: &str, tvl: f64, vol: f64) -> Pool {
        Pool {
            address: address.to_string(),
            venue,
            token_a: TokenSide { mint: "mintA".into(), symbol: a.into(), decimals: 9 },
            token_b: TokenSide { mint: "mintB".into(), symbol: b.into(), decimals: 6 },
            price: 1.0,
            granularity: Granularity::TickSpacing(8),
            tvl_usd: tvl,
            volume_24h_usd: vol,
            fee_bps: 4,
            risk_score: risk::score(a, b, tvl, vol),
            current_index: 0,
        }
    }

    #[test]
    fn dedup_keeps_highest_apr_per_pair() {
        let low = sample("low", VenueTag::Whirlpool, "SOL", "USDC", 1_000_000.0, 1_000.0);
        let high = sample("high", VenueTag::Clmm, "USDC", "SOL", 1_000_000.0, 50_000.0);
        let deduped = dedup_best_apr(vec![low, high]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].address, "high");
    }

    #[test]
    fn sort_by_tvl_is_descending() {
        let mut pools = vec![
            sample("a", VenueTag::Dlmm, "SOL", "USDC", 1.0, 0.0),
            sample("b", VenueTag::Dlmm, "SOL", "USDC", 5.0, 0.0),
        ];
        sort_pools(&mut pools, SortKey::Tvl);
        assert_eq!(pools[0].address, "b");
    }

    #[test]
    fn order_pair_is_symmetric() {
        assert_eq!(order_pair("USDC", "SOL"), order_pair("SOL", "USDC"));
    }
}
