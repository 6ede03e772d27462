//! Dual-source price fetch with a staleness gate
//! and divergence check, cached 10 s per mint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregator::cache::TtlCache;
use crate::error::Result;

const CACHE_TTL: Duration = Duration::from_secs(10);
const STALE_AFTER_SECS: i64 = 30;
const SOURCE_TIMEOUT: Duration = Duration::from_secs(5);
const DIVERGENCE_GATE: f64 = 0.005;

#[derive(Debug, Clone, Copy)]
struct SourceReading {
    price: f64,
    confidence: f64,
    published_unix: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub price: f64,
    pub confidence: f64,
    pub unreliable: bool,
}

#[derive(Debug, Deserialize)]
struct PrimaryFeedResponse {
    price: f64,
    confidence: f64,
    publish_time_unix: i64,
}

#[derive(Debug, Deserialize)]
struct SecondaryFeedResponse {
    price: f64,
    publish_time_unix: i64,
}

pub struct OracleAggregator {
    client: reqwest::Client,
    primary_endpoint: String,
    secondary_endpoint: String,
    cache: TtlCache<String, AggregatedPrice>,
}

impl OracleAggregator {
    pub fn new(client: reqwest::Client, primary_endpoint: String, secondary_endpoint: String) -> Self {
        Self {
            client,
            primary_endpoint,
            secondary_endpoint,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    async fn fetch_primary(&self, mint: &str) -> Option<SourceReading> {
        let url = format!("{}/{}", self.primary_endpoint, mint);
        let resp: PrimaryFeedResponse = self
            .client
            .get(&url)
            .timeout(SOURCE_TIMEOUT)
            .send()
            .await
            .ok()?
            .json()
            .await
            .ok()?;
        Some(SourceReading {
            price: resp.price,
            confidence: resp.confidence,
            published_unix: resp.publish_time_unix,
        })
    }

    async fn fetch_secondary(&self, mint: &str) -> Option<SourceReading> {
        let url = format!("{}/{}", self.secondary_endpoint, mint);
        let resp: SecondaryFeedResponse = self
            .client
            .get(&url)
            .timeout(SOURCE_TIMEOUT)
            .send()
            .await
            .ok()?
            .json()
            .await
            .ok()?;
        Some(SourceReading {
            price: resp.price,
            // Secondary source is spot-only, no confidence interval.
            confidence: 0.0,
            published_unix: resp.publish_time_unix,
        })
    }

    /// `price-by-mint`: median of live readings, gated by staleness and
    /// pairwise divergence. Returns `unreliable = true` rather than
    /// an error; callers decide whether that blocks their operation.
    pub async fn price(&self, mint: &str, now_unix: i64) -> Result<AggregatedPrice> {
        if let Some(cached) = self.cache.get(&mint.to_string()).await {
            return Ok(cached);
        }

        let (primary, secondary) = tokio::join!(self.fetch_primary(mint), self.fetch_secondary(mint));

        let result = aggregate(primary, secondary, now_unix);
        self.cache.put(mint.to_string(), result).await;
        Ok(result)
    }

    pub async fn batch_prices(&self, mints: &[String], now_unix: i64) -> Result<Vec<(String, AggregatedPrice)>> {
        let mut out = Vec::with_capacity(mints.len());
        for mint in mints {
            out.push((mint.clone(), self.price(mint, now_unix).await?));
        }
        Ok(out)
    }
}

fn aggregate(
    primary: Option<SourceReading>,
    secondary: Option<SourceReading>,
    now_unix: i64,
) -> AggregatedPrice {
    let is_live = |r: &SourceReading| now_unix - r.published_unix < STALE_AFTER_SECS;

    let live: Vec<SourceReading> = [primary, secondary]
        .into_iter()
        .flatten()
        .filter(is_live)
        .collect();

    if live.is_empty() {
        return AggregatedPrice {
            price: 0.0,
            confidence: 0.0,
            unreliable: true,
        };
    }

    let mut prices: Vec<f64> = live.iter().map(|r| r.price).collect();
    prices.sort_by(f64::total_cmp);
    let median = median_of(&prices);

    let max_divergence = pairwise_max_divergence(&prices);
    let confidence = live.iter().map(|r| r.confidence).fold(0.0, f64::max);

    AggregatedPrice {
        price: median,
        confidence,
        unreliable: max_divergence >= DIVERGENCE_GATE,
    }
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn pairwise_max_divergence(prices: &[f64]) -> f64 {
    let mut max_div = 0.0_f64;
    for i in 0..prices.len() {
        for j in (i + 1)..prices.len() {
            let base = prices[i].max(prices[j]).abs();
            if base <= 0.0 {
                continue;
            }
            let div = (prices[i] - prices[j]).abs() / base;
            max_div = max_div.max(div);
        }
    }
    max_div
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(price: f64, confidence: f64, published_unix: i64) -> SourceReading {
        SourceReading { price, confidence, published_unix }
    }

    #[test]
    fn all_stale_is_unreliable() {
        let result = aggregate(Some(reading(1.0, 0.1, 0)), Some(reading(1.0, 0.0, 0)), 1000);
        assert!(result.unreliable);
    }

    #[test]
    fn divergence_over_half_percent_is_unreliable() {
        let result = aggregate(
            Some(reading(100.0, 0.1, 1000)),
            Some(reading(100.6, 0.0, 1000)),
            1000,
        );
        assert!(result.unreliable);
    }

    #[test]
    fn divergence_exactly_at_gate_is_unreliable_inclusive() {
        // |995 - 1000| / 1000 = 0.005 exactly, landing precisely on the gate.
        let result = aggregate(
            Some(reading(995.0, 0.1, 1000)),
            Some(reading(1000.0, 0.0, 1000)),
            1000,
        );
        assert!(result.unreliable);
    }

    #[test]
    fn median_of_two_live_sources_is_the_average() {
        let result = aggregate(
            Some(reading(99.0, 0.1, 1000)),
            Some(reading(101.0, 0.0, 1000)),
            1000,
        );
        assert!(!result.unreliable);
        assert_eq!(result.price, 100.0);
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn single_live_source_is_reliable() {
        let result = aggregate(Some(reading(50.0, 0.2, 1000)), None, 1000);
        assert!(!result.unreliable);
        assert_eq!(result.price, 50.0);
    }
}
