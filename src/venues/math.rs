//! Shared tick/bin grid math. Tick-based venues (Whirlpool, CLMM)
//! share the Uniswap-v3-style sqrt-price grid at base 1.0001; DLMM uses a
//! geometric bin ladder keyed by `bin_step` (basis points).

/// DLMM's legal bin id bounds (mirrors the on-chain program's limits).
pub const MIN_BIN_ID: i32 = -443_636;
pub const MAX_BIN_ID: i32 = 443_636;

/// Tick-based venues' legal tick bounds (±log_1.0001(2^64), rounded).
pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

/// Integer floor division, correct for negative operands (Rust's `/`
/// truncates toward zero, which is wrong for grid snapping below zero).
pub fn floor_div(a: i32, b: i32) -> i32 {
    let d = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) { d - 1 } else { d }
}

pub fn tick_to_sqrt_price(tick: i32) -> f64 {
    1.0001_f64.powf(tick as f64 / 2.0)
}

pub fn tick_to_price(tick: i32) -> f64 {
    1.0001_f64.powi(tick)
}

/// DLMM: `price(bin) = (1 + bin_step/10_000)^bin`.
pub fn bin_to_price(bin: i32, bin_step: u16) -> f64 {
    (1.0 + bin_step as f64 / 10_000.0).powi(bin)
}

/// "range snap" for tick venues: floor-align both edges to the
/// spacing grid. Tie-break is always floor, per the composer contract —
/// note this can make the lower edge fall slightly below the nominal
/// `current - k*spacing` window on non-exact divisions; that is the
/// specified behavior, not a bug.
pub fn snap_tick_range(current_tick: i32, k: i32, spacing: i32) -> (i32, i32) {
    let raw_lower = current_tick - k * spacing;
    let raw_upper = current_tick + k * spacing;
    let lower = floor_div(raw_lower, spacing) * spacing;
    let upper = floor_div(raw_upper, spacing) * spacing;
    (
        lower.clamp(MIN_TICK, MAX_TICK),
        upper.clamp(MIN_TICK, MAX_TICK),
    )
}

/// "range snap" for DLMM: offset the active bin by `k * bin_step`
/// bins in each direction, clamped to the program's legal bin id bounds.
/// Bin ids are single integers already, so no further grid alignment is
/// required once the pool's bin_step scales the offset.
pub fn snap_bin_range(active_bin: i32, k: i32, bin_step: u16) -> (i32, i32) {
    let offset = k * bin_step as i32;
    let lower = (active_bin - offset).clamp(MIN_BIN_ID, MAX_BIN_ID);
    let upper = (active_bin + offset).clamp(MIN_BIN_ID, MAX_BIN_ID);
    (lower, upper)
}

/// Uniswap-v3-style amounts-from-liquidity over the sqrt-price grid.
/// Returns `(amount_a, amount_b)` for a given liquidity scalar.
pub fn amounts_from_liquidity_tick(
    liquidity: f64,
    sqrt_price_current: f64,
    sqrt_price_lower: f64,
    sqrt_price_upper: f64,
) -> (f64, f64) {
    let (sp_lo, sp_hi) = if sqrt_price_lower <= sqrt_price_upper {
        (sqrt_price_lower, sqrt_price_upper)
    } else {
        (sqrt_price_upper, sqrt_price_lower)
    };

    if sqrt_price_current <= sp_lo {
        let amount_a = liquidity * (sp_hi - sp_lo) / (sp_hi * sp_lo);
        (amount_a, 0.0)
    } else if sqrt_price_current >= sp_hi {
        let amount_b = liquidity * (sp_hi - sp_lo);
        (0.0, amount_b)
    } else {
        let amount_a = liquidity * (sp_hi - sqrt_price_current) / (sqrt_price_current * sp_hi);
        let amount_b = liquidity * (sqrt_price_current - sp_lo);
        (amount_a, amount_b)
    }
}

/// Geometric-mean analogue of the above for DLMM's bin ladder: treat each
/// bin boundary's sqrt-price as `sqrt(price(bin))` and reuse the same
/// closed form, since DLMM's per-bin constant-sum curve approximates the
/// same two-sided composition at the range boundary.
pub fn amounts_from_liquidity_bin(
    liquidity: f64,
    active_bin: i32,
    lower_bin: i32,
    upper_bin: i32,
    bin_step: u16,
) -> (f64, f64) {
    let sqrt_current = bin_to_price(active_bin, bin_step).sqrt();
    let sqrt_lower = bin_to_price(lower_bin, bin_step).sqrt();
    let sqrt_upper = bin_to_price(upper_bin, bin_step).sqrt();
    amounts_from_liquidity_tick(liquidity, sqrt_current, sqrt_lower, sqrt_upper)
}

/// Apply a slippage bound to sqrt-price (not to amounts directly) to
/// match how the on-chain check is evaluated.
pub fn sqrt_price_with_slippage(sqrt_price: f64, slippage_bps: u32, widen_up: bool) -> f64 {
    let factor = slippage_bps as f64 / 10_000.0;
    if widen_up {
        sqrt_price * (1.0 + factor).sqrt()
    } else {
        sqrt_price * (1.0 - factor).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_div_matches_floor_semantics() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(-8, 2), -4);
        assert_eq!(floor_div(8, 2), 4);
    }

    #[test]
    fn snap_tick_range_happy_path() {
        // Scenario 1 analogue on a tick venue: spacing 10, current 5000, k=5.
        let (lower, upper) = snap_tick_range(5000, 5, 10);
        assert_eq!((lower, upper), (4950, 5050));
    }

    #[test]
    fn snap_tick_range_unit_spacing_is_exact() {
        let (lower, upper) = snap_tick_range(100, 5, 1);
        assert_eq!((lower, upper), (95, 105));
        let (lower, upper) = snap_tick_range(100, 20, 1);
        assert_eq!((lower, upper), (80, 120));
    }

    #[test]
    fn snap_bin_range_scenario_1() {
        let (lower, upper) = snap_bin_range(5000, 5, 10);
        assert_eq!((lower, upper), (4950, 5050));
    }

    #[test]
    fn amounts_below_range_are_all_token_a() {
        let (a, b) = amounts_from_liquidity_tick(1000.0, 1.0, 2.0, 3.0);
        assert!(a > 0.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn amounts_above_range_are_all_token_b() {
        let (a, b) = amounts_from_liquidity_tick(1000.0, 4.0, 2.0, 3.0);
        assert_eq!(a, 0.0);
        assert!(b > 0.0);
    }
}
