//! One implementation per venue, selected by the closed
//! `VenueTag` sum type rather than runtime polymorphism.

pub mod clmm;
pub mod dlmm;
pub mod math;
pub mod whirlpool;

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use crate::error::Result;
use crate::model::{DistributionShape, Pool, Position, RangeShape, VenueTag};

/// quote-liquidity output.
#[derive(Debug, Clone, Copy)]
pub struct LiquidityQuote {
    pub liquidity: u128,
    pub expected_a: u64,
    pub expected_b: u64,
    pub worst_case_a: u64,
    pub worst_case_b: u64,
}

/// build-open output: an ordered instruction list plus any auxiliary
/// signer the instructions require (e.g. a fresh position account).
pub struct BuiltInstructions {
    pub instructions: Vec<Instruction>,
    pub auxiliary_signers: Vec<Keypair>,
}

impl std::fmt::Debug for BuiltInstructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltInstructions")
            .field("instructions", &self.instructions.len())
            .field("auxiliary_signers", &self.auxiliary_signers.len())
            .finish()
    }
}

/// Token amounts offered as input to a liquidity quote, one or both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputAmounts {
    pub amount_a: u64,
    pub amount_b: u64,
}

/// Every venue adapter implements this operation set. The composer
/// selects an implementation by `VenueTag`, never by runtime type.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn tag(&self) -> VenueTag;

    async fn describe_pool(&self, pool_address: &str) -> Result<Pool>;

    fn compute_range(
        &self,
        pool: &Pool,
        shape: RangeShape,
        custom_lower: Option<i32>,
        custom_upper: Option<i32>,
    ) -> Result<(i32, i32)>;

    fn quote_liquidity(
        &self,
        pool: &Pool,
        range: (i32, i32),
        inputs: InputAmounts,
        slippage_bps: u32,
    ) -> Result<LiquidityQuote>;

    fn build_open(
        &self,
        pool: &Pool,
        range: (i32, i32),
        inputs: InputAmounts,
        owner: &Pubkey,
        distribution: Option<DistributionShape>,
    ) -> Result<BuiltInstructions>;

    fn build_decrease(
        &self,
        position: &Position,
        bps_to_remove: u16,
        close_if_full: bool,
    ) -> Result<Vec<Instruction>>;

    fn build_collect_fees(&self, position: &Position) -> Result<Vec<Instruction>>;

    async fn enumerate_positions(&self, wallet: &Pubkey) -> Result<Vec<Position>>;
}

/// Validate a CUSTOM range before handing it to a venue-specific
/// implementation: reject crossing, zero-width, or grid-unaligned ranges.
pub fn validate_custom_range(lower: i32, upper: i32, granularity_units: i32) -> Result<()> {
    if lower >= upper {
        return Err(crate::error::EngineError::Validation(
            "custom range is zero-width or crossed".into(),
        ));
    }
    if granularity_units <= 0 {
        return Err(crate::error::EngineError::Validation(
            "granularity must be positive".into(),
        ));
    }
    if lower % granularity_units != 0 || upper % granularity_units != 0 {
        return Err(crate::error::EngineError::Validation(format!(
            "custom range [{lower}, {upper}) is not aligned to granularity {granularity_units}"
        )));
    }
    Ok(())
}

pub fn adapter_for(tag: VenueTag, rpc_url: String) -> Box<dyn VenueAdapter> {
    match tag {
        VenueTag::Dlmm => Box::new(dlmm::DlmmAdapter::new(rpc_url)),
        VenueTag::Whirlpool => Box::new(whirlpool::WhirlpoolAdapter::new(rpc_url)),
        VenueTag::Clmm => Box::new(clmm::ClmmAdapter::new(rpc_url)),
    }
}
