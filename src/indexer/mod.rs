//! Scans on-chain positions across all venues for a
//! wallet, in parallel, computing in-range status and human-readable fee
//! amounts. A 30 s cache keyed by wallet accelerates repeat queries; any
//! mutating execution in the submission driver that targets the wallet invalidates it.

use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use crate::aggregator::cache::TtlCache;
use crate::error::{EngineError, Result};
use crate::model::{Pool, Position, VenueTag};
use crate::venues::VenueAdapter;

const CACHE_TTL: Duration = Duration::from_secs(30);

pub struct PositionIndexer {
    adapters: Vec<Box<dyn VenueAdapter>>,
    cache: TtlCache<String, Vec<Position>>,
}

impl PositionIndexer {
    pub fn new(adapters: Vec<Box<dyn VenueAdapter>>) -> Self {
        Self {
            adapters,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    /// Invalidate the cached position list for `wallet`; called whenever
    /// the submission driver lands a mutating execution against it.
    pub async fn invalidate(&self, wallet: &str) {
        self.cache.invalidate(&wallet.to_string()).await;
    }

    /// Enumerate every position for `wallet` across all venues in
    /// parallel, looking up each position's pool to compute in-range and
    /// human-readable fee amounts.
    pub async fn positions_for(&self, wallet: &str, pools: &dyn Fn(&str) -> Option<Pool>) -> Result<Vec<Position>> {
        if let Some(cached) = self.cache.get(&wallet.to_string()).await {
            return Ok(cached);
        }

        let owner = Pubkey::from_str(wallet)
            .map_err(|_| EngineError::Validation(format!("{wallet} is not a valid wallet address")))?;

        let fetches: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| {
                Box::pin(adapter.enumerate_positions(&owner))
                    as std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Position>>> + Send + '_>>
            })
            .collect();
        let results = crate::concurrency::join_all(fetches).await;

        let mut positions = Vec::new();
        for result in results {
            let mut venue_positions = result?;
            for position in &mut venue_positions {
                if let Some(pool) = pools(&position.pool) {
                    position.refresh_in_range(pool.current_index);
                }
            }
            positions.append(&mut venue_positions);
        }

        self.cache.put(wallet.to_string(), positions.clone()).await;
        Ok(positions)
    }

    pub fn venue_tags(&self) -> Vec<VenueTag> {
        self.adapters.iter().map(|a| a.tag()).collect()
    }
}

/// Convert raw on-chain amounts into human-readable units by the token's
/// decimals.
pub fn human_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_amount_divides_by_decimals() {
        assert_eq!(human_amount(1_500_000_000, 9), 1.5);
        assert_eq!(human_amount(2_500_000, 6), 2.5);
    }
}
