//! Exercises the public venue-adapter surface the way the open-position
//! handler chains it: compute a range, quote liquidity against a set of
//! offered amounts, then build the open instructions from that quote.
//! None of these calls touch the network.

use lp_engine::model::pool::{Granularity, Pool, TokenSide};
use lp_engine::model::{DistributionShape, RangeShape, VenueTag};
use lp_engine::venues::{self, InputAmounts};
use solana_sdk::pubkey::Pubkey;

fn dlmm_pool() -> Pool {
    Pool {
        address: Pubkey::new_unique().to_string(),
        venue: VenueTag::Dlmm,
        token_a: TokenSide {
            mint: Pubkey::new_unique().to_string(),
            symbol: "SOL".into(),
            decimals: 9,
        },
        token_b: TokenSide {
            mint: Pubkey::new_unique().to_string(),
            symbol: "USDC".into(),
            decimals: 6,
        },
        price: 150.0,
        granularity: Granularity::BinStep(10),
        tvl_usd: 4_000_000.0,
        volume_24h_usd: 900_000.0,
        fee_bps: 10,
        risk_score: 3,
        current_index: 2_000,
    }
}

fn whirlpool_pool() -> Pool {
    Pool {
        address: Pubkey::new_unique().to_string(),
        venue: VenueTag::Whirlpool,
        token_a: TokenSide {
            mint: Pubkey::new_unique().to_string(),
            symbol: "SOL".into(),
            decimals: 9,
        },
        token_b: TokenSide {
            mint: Pubkey::new_unique().to_string(),
            symbol: "USDC".into(),
            decimals: 6,
        },
        price: 150.0,
        granularity: Granularity::TickSpacing(64),
        tvl_usd: 6_000_000.0,
        volume_24h_usd: 1_200_000.0,
        fee_bps: 30,
        risk_score: 2,
        current_index: 6_400,
    }
}

#[test]
fn dlmm_open_flow_produces_a_self_consistent_instruction_set() {
    let adapter = venues::adapter_for(VenueTag::Dlmm, "http://127.0.0.1:8899".into());
    let pool = dlmm_pool();
    let owner = Pubkey::new_unique();

    let range = adapter
        .compute_range(&pool, RangeShape::Concentrated, None, None)
        .expect("concentrated range should compute for a DLMM pool");

    let quote = adapter
        .quote_liquidity(
            &pool,
            range,
            InputAmounts {
                amount_a: 10_000_000_000,
                amount_b: 10_000_000,
            },
            300,
        )
        .expect("quote should succeed for a well-formed range");
    assert!(quote.liquidity > 0);

    let built = adapter
        .build_open(
            &pool,
            range,
            InputAmounts {
                amount_a: quote.expected_a,
                amount_b: quote.expected_b,
            },
            &owner,
            Some(DistributionShape::Spot),
        )
        .expect("build_open should succeed given a valid quote");

    assert_eq!(built.instructions.len(), 2);
    assert_eq!(built.auxiliary_signers.len(), 1);
}

#[test]
fn whirlpool_custom_range_rejects_bounds_off_the_tick_grid_before_quoting() {
    let adapter = venues::adapter_for(VenueTag::Whirlpool, "http://127.0.0.1:8899".into());
    let pool = whirlpool_pool();

    let err = adapter
        .compute_range(&pool, RangeShape::Custom, Some(6401), Some(6720))
        .unwrap_err();

    assert!(format!("{err}").contains("not aligned"));
}

#[test]
fn wide_range_quotes_less_liquidity_than_concentrated_for_the_same_inputs() {
    let adapter = venues::adapter_for(VenueTag::Dlmm, "http://127.0.0.1:8899".into());
    let pool = dlmm_pool();
    let inputs = InputAmounts {
        amount_a: 10_000_000_000,
        amount_b: 10_000_000,
    };

    let concentrated_range = adapter
        .compute_range(&pool, RangeShape::Concentrated, None, None)
        .unwrap();
    let wide_range = adapter
        .compute_range(&pool, RangeShape::Wide, None, None)
        .unwrap();

    let concentrated_quote = adapter
        .quote_liquidity(&pool, concentrated_range, inputs, 300)
        .unwrap();
    let wide_quote = adapter
        .quote_liquidity(&pool, wide_range, inputs, 300)
        .unwrap();

    assert!(wide_quote.liquidity < concentrated_quote.liquidity);
}
