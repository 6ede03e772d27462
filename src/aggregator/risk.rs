//! Risk scoring for aggregated pools: derived without external
//! data from static classification tables plus the pool's own TVL/volume.

const STABLES: &[&str] = &["USDC", "USDT", "USDH", "UXD", "PAI"];

/// Volatility tier 1-4 by symbol; unlisted symbols default to the highest
/// tier (treated as an exotic/long-tail asset).
fn volatility_tier(symbol: &str) -> u8 {
    match symbol {
        "SOL" | "USDC" | "USDT" => 1,
        "BTC" | "ETH" | "mSOL" | "jitoSOL" | "bSOL" => 2,
        "RAY" | "ORCA" | "JUP" | "BONK" | "WIF" => 3,
        _ => 4,
    }
}

fn is_stable(symbol: &str) -> bool {
    STABLES.contains(&symbol)
}

fn tvl_penalty(tvl_usd: f64) -> u8 {
    if tvl_usd < 50_000.0 {
        3
    } else if tvl_usd < 200_000.0 {
        2
    } else if tvl_usd < 1_000_000.0 {
        1
    } else {
        0
    }
}

/// Score ∈ [1,10]. `a` and `b` are the pool's two token symbols.
pub fn score(a: &str, b: &str, tvl_usd: f64, volume_24h_usd: f64) -> u8 {
    if is_stable(a) && is_stable(b) {
        return 1;
    }

    let tier = volatility_tier(a).max(volatility_tier(b));
    let mut score = tier as i32;
    score += tvl_penalty(tvl_usd) as i32;

    let turnover = if tvl_usd > 0.0 {
        volume_24h_usd / tvl_usd
    } else {
        0.0
    };
    if turnover < 0.01 {
        score += 1;
    }

    if is_stable(a) || is_stable(b) {
        score -= 1;
    }

    score.clamp(1, 10) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_stable_pair_is_minimum_risk() {
        assert_eq!(score("USDC", "USDT", 5_000_000.0, 1_000_000.0), 1);
    }

    #[test]
    fn low_tvl_exotic_pair_is_penalized() {
        let s = score("XYZ", "ABC", 10_000.0, 10.0);
        assert_eq!(s, 8);
    }

    #[test]
    fn one_sided_stable_gets_a_discount() {
        let with_stable = score("SOL", "USDC", 2_000_000.0, 2_000_000.0);
        let without_stable = score("SOL", "RAY", 2_000_000.0, 2_000_000.0);
        assert!(with_stable < without_stable);
    }

    #[test]
    fn score_never_leaves_the_unit_range() {
        assert!(score("SOL", "USDC", 10_000_000_000.0, 10_000_000_000.0) >= 1);
        assert!(score("ZZZ", "YYY", 0.0, 0.0) <= 10);
    }
}
