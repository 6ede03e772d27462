use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::pool::VenueTag;

/// A user's concentrated-liquidity claim. Lifecycle: created by
/// open, mutated only by decrease/increase/collect, destroyed by close
/// (which also closes the underlying position account/NFT).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    /// DLMM: position account address. WHIRLPOOL/CLMM: position-NFT mint.
    pub id: String,
    pub owner: String,
    pub venue: VenueTag,
    pub pool: String,
    pub lower_index: i32,
    pub upper_index: i32,
    pub lower_price: f64,
    pub upper_price: f64,
    pub liquidity: u128,
    pub deposited_a: u64,
    pub deposited_b: u64,
    pub fees_a: u64,
    pub fees_b: u64,
    pub in_range: bool,
}

impl Position {
    /// Invariant 1: `lower < upper` and both aligned to the pool's
    /// granularity.
    pub fn validate_range(&self, granularity_units: i32) -> crate::error::Result<()> {
        if self.lower_index >= self.upper_index {
            return Err(crate::error::EngineError::Validation(format!(
                "position range [{}, {}) is not strictly increasing",
                self.lower_index, self.upper_index
            )));
        }
        if granularity_units <= 0 {
            return Err(crate::error::EngineError::Validation(
                "granularity must be positive".into(),
            ));
        }
        if self.lower_index % granularity_units != 0 || self.upper_index % granularity_units != 0 {
            return Err(crate::error::EngineError::Validation(format!(
                "position range [{}, {}) is not aligned to granularity {}",
                self.lower_index, self.upper_index, granularity_units
            )));
        }
        Ok(())
    }

    /// Recompute `in_range` from the pool's current index.
    pub fn refresh_in_range(&mut self, current_index: i32) {
        self.in_range = current_index >= self.lower_index && current_index < self.upper_index;
    }

    /// Distance (in grid units) from `current_index` to the nearest range
    /// edge. Zero while in range, positive while out — used by the
    /// monitor's drift threshold.
    pub fn drift(&self, current_index: i32) -> i32 {
        if current_index < self.lower_index {
            self.lower_index - current_index
        } else if current_index >= self.upper_index {
            current_index - self.upper_index + 1
        } else {
            0
        }
    }
}
