use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Closed sum type over the supported concentrated-liquidity venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VenueTag {
    Dlmm,
    Whirlpool,
    Clmm,
}

impl VenueTag {
    pub fn label(&self) -> &'static str {
        match self {
            VenueTag::Dlmm => "DLMM",
            VenueTag::Whirlpool => "WHIRLPOOL",
            VenueTag::Clmm => "CLMM",
        }
    }
}

/// Which kind of granularity descriptor a pool carries. Exactly one of the
/// two fields on `Granularity` is meaningful, selected by this tag — kept
/// as an explicit enum rather than two `Option` fields so illegal states
/// (both set, neither set) are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Granularity {
    /// DLMM: integer basis points defining geometric bin spacing.
    BinStep(u16),
    /// WHIRLPOOL/CLMM: integer tick delta over the sqrt-price grid at base 1.0001.
    TickSpacing(u16),
}

pub type GranularityKind = Granularity;

impl Granularity {
    pub fn matches_venue(&self, venue: VenueTag) -> bool {
        matches!(
            (self, venue),
            (Granularity::BinStep(_), VenueTag::Dlmm)
                | (Granularity::TickSpacing(_), VenueTag::Whirlpool)
                | (Granularity::TickSpacing(_), VenueTag::Clmm)
        )
    }

    pub fn units(&self) -> u16 {
        match self {
            Granularity::BinStep(s) => *s,
            Granularity::TickSpacing(s) => *s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenSide {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Canonical pool representation across venues.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Pool {
    pub address: String,
    pub venue: VenueTag,
    pub token_a: TokenSide,
    pub token_b: TokenSide,
    pub price: f64,
    pub granularity: Granularity,
    pub tvl_usd: f64,
    pub volume_24h_usd: f64,
    pub fee_bps: u16,
    /// Derived ∈ [1,10]; see `aggregator::risk`.
    pub risk_score: u8,
    /// Current active bin id (DLMM) or tick index (WHIRLPOOL/CLMM).
    pub current_index: i32,
}

impl Pool {
    /// Invariant (a): exactly one granularity descriptor is set and it
    /// matches the venue. Enforced structurally by `Granularity` but this
    /// asserts venue/granularity agreement at construction boundaries.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.granularity.matches_venue(self.venue) {
            return Err(crate::error::EngineError::Internal(format!(
                "pool {} has granularity {:?} inconsistent with venue {:?}",
                self.address, self.granularity, self.venue
            )));
        }
        Ok(())
    }

    pub fn unordered_symbol_pair(&self) -> (String, String) {
        let mut a = self.token_a.symbol.clone();
        let mut b = self.token_b.symbol.clone();
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }
        (a, b)
    }

    pub fn apr(&self) -> f64 {
        if self.tvl_usd <= 0.0 {
            return 0.0;
        }
        let daily_fees = self.volume_24h_usd * (self.fee_bps as f64 / 10_000.0);
        (daily_fees * 365.0 / self.tvl_usd) * 100.0
    }

    pub fn risk_adjusted_yield(&self) -> f64 {
        self.apr() / self.risk_score.max(1) as f64
    }
}
