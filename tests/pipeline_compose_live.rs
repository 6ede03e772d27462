//! End-to-end composition through `PipelineComposer`, assembled from real
//! oracle and RPC clients. `finalize()` always resolves a fresh blockhash
//! over RPC, and the oracle aggregator always fetches over HTTP, so this
//! needs a reachable Solana RPC endpoint and reachable price feeds.

use lp_engine::budget::BudgetEstimator;
use lp_engine::model::pool::{Granularity, Pool, TokenSide};
use lp_engine::model::{RangeShape, Strategy, TipUrgency, VenueTag};
use lp_engine::oracle::OracleAggregator;
use lp_engine::pipeline::swap_router::DryRunSwapRouter;
use lp_engine::pipeline::{PipelineComposer, TreasuryConfig};
use lp_engine::seal::PrivacySealer;
use lp_engine::venues;
use solana_sdk::pubkey::Pubkey;

const LOCAL_RPC: &str = "http://127.0.0.1:8899";

fn dlmm_pool() -> Pool {
    Pool {
        address: Pubkey::new_unique().to_string(),
        venue: VenueTag::Dlmm,
        token_a: TokenSide {
            mint: "So11111111111111111111111111111111111111112".into(),
            symbol: "SOL".into(),
            decimals: 9,
        },
        token_b: TokenSide {
            mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into(),
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

#[tokio::test]
#[ignore] // Requires a local Solana validator + reachable oracle feeds
async fn compose_atomic_lp_against_a_local_validator() {
    let sealer = PrivacySealer::new([7u8; 32], "localnet".into());
    let oracle = OracleAggregator::new(
        reqwest::Client::new(),
        "https://hermes.pyth.network/v2/price_feeds".into(),
        "https://api.switchboard.xyz/feeds".into(),
    );
    let budget = BudgetEstimator::new(LOCAL_RPC.into());
    let swap_router = DryRunSwapRouter;
    let treasury = TreasuryConfig {
        treasury_account: Pubkey::new_unique(),
        tip_account: Pubkey::new_unique(),
        protocol_fee_bps: 100,
    };

    let composer = PipelineComposer::new(&sealer, &oracle, &budget, &swap_router, treasury);
    let adapter = venues::adapter_for(VenueTag::Dlmm, LOCAL_RPC.into());
    let pool = dlmm_pool();
    let owner = Pubkey::new_unique();

    let strategy = Strategy {
        venue: VenueTag::Dlmm,
        pool: pool.address.clone(),
        collateral_mint: pool.token_b.mint.clone(),
        collateral_amount: 10_000_000,
        range_shape: RangeShape::Concentrated,
        distribution_shape: None,
        slippage_bps: 300,
        tip_urgency: TipUrgency::Fast,
        custom_lower: None,
        custom_upper: None,
    };

    let now_unix = 1_900_000_000;
    let intent = composer
        .compose_atomic_lp(&strategy, &pool, adapter.as_ref(), &owner, strategy.slippage_bps, now_unix)
        .await
        .expect("composition should succeed against a live validator");

    assert_eq!(intent.transactions.len(), 1);
}
