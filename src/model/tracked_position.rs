use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::pool::VenueTag;

/// Monitoring shadow of a position, kept in the store and refreshed
/// by the scheduler's tick.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrackedPosition {
    pub position_id: String,
    pub wallet: String,
    pub pool: String,
    pub venue: VenueTag,
    pub lower_index: i32,
    pub upper_index: i32,
    pub last_checked_unix: i64,
    pub last_in_range: bool,
    pub out_of_range_since_unix: Option<i64>,
}

/// The result of comparing a tracked position against the pool's live
/// index during a monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StillIn,
    StillOut,
    InToOut,
    OutToIn,
}

impl TrackedPosition {
    pub fn in_range(&self, current_index: i32) -> bool {
        current_index >= self.lower_index && current_index < self.upper_index
    }

    pub fn drift(&self, current_index: i32) -> i32 {
        if current_index < self.lower_index {
            self.lower_index - current_index
        } else if current_index >= self.upper_index {
            current_index - self.upper_index + 1
        } else {
            0
        }
    }

    /// Update last-checked/last-in-range/out-of-range-since and classify
    /// the transition. Invariant 3: `last_in_range` equals
    /// `current_index ∈ [lower, upper)` at `last_checked`.
    pub fn observe(&mut self, now_unix: i64, current_index: i32) -> Transition {
        let now_in_range = self.in_range(current_index);
        let transition = match (self.last_in_range, now_in_range) {
            (true, true) => Transition::StillIn,
            (false, false) => Transition::StillOut,
            (true, false) => Transition::InToOut,
            (false, true) => Transition::OutToIn,
        };

        match transition {
            Transition::InToOut => self.out_of_range_since_unix = Some(now_unix),
            Transition::OutToIn => self.out_of_range_since_unix = None,
            _ => {}
        }

        self.last_checked_unix = now_unix;
        self.last_in_range = now_in_range;
        transition
    }
}
