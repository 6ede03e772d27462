use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::pool::VenueTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RangeShape {
    Concentrated,
    Wide,
    Custom,
}

/// DLMM-only: how liquidity is spread across bins in the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    Spot,
    Curve,
    BidAsk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TipUrgency {
    Fast,
    Turbo,
    Skip,
}

impl TipUrgency {
    /// Fixed tip schedule keyed by urgency, in lamports.
    pub fn tip_lamports(&self) -> u64 {
        match self {
            TipUrgency::Fast => 10_000,
            TipUrgency::Turbo => 100_000,
            TipUrgency::Skip => 0,
        }
    }

    /// Percentile of recent prioritization fees used for this urgency.
    pub fn fee_percentile(&self) -> u8 {
        match self {
            TipUrgency::Skip => 25,
            TipUrgency::Fast => 50,
            TipUrgency::Turbo => 90,
        }
    }
}

/// A pre-execution intent. Sealed by the privacy sealer before it touches the
/// pipeline proper; the ciphertext is attached to the receipt for audit
/// and never influences instruction bytes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Strategy {
    pub venue: VenueTag,
    pub pool: String,
    pub collateral_mint: String,
    pub collateral_amount: u64,
    pub range_shape: RangeShape,
    pub distribution_shape: Option<DistributionShape>,
    pub slippage_bps: u32,
    pub tip_urgency: TipUrgency,
    /// Only meaningful when `range_shape == Custom`.
    pub custom_lower: Option<i32>,
    pub custom_upper: Option<i32>,
}
