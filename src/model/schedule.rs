use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::strategy::RangeShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Complete,
    Cancelled,
    Failed,
}

/// Recurring deposit plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Schedule {
    pub id: String,
    pub wallet: String,
    pub pool: String,
    pub amount_per_tick: u64,
    pub total_budget: u64,
    pub spent: u64,
    pub tick_interval_secs: u64,
    pub next_tick_unix: i64,
    pub executions: u32,
    pub max_executions: u32,
    pub range_shape: RangeShape,
    pub status: ScheduleStatus,
    pub last_error: Option<String>,
}

impl Schedule {
    pub fn is_due(&self, now_unix: i64) -> bool {
        self.status == ScheduleStatus::Active && self.next_tick_unix <= now_unix
    }

    /// On success, advance spent/executions/next-tick and transition
    /// to COMPLETE when budget or execution count is exhausted. Invariant:
    /// `spent <= budget` and `executions <= max` after every tick.
    pub fn record_success(&mut self, now_unix: i64) {
        self.spent = (self.spent + self.amount_per_tick).min(self.total_budget);
        self.executions += 1;
        self.next_tick_unix = now_unix + self.tick_interval_secs as i64;
        self.last_error = None;

        if self.spent >= self.total_budget || self.executions >= self.max_executions {
            self.status = ScheduleStatus::Complete;
        }
    }

    /// On failure, record the error and retry next cycle; only
    /// transition to FAILED on a persistent non-retryable sentinel.
    pub fn record_failure(&mut self, now_unix: i64, error: &str, fatal: bool) {
        self.last_error = Some(error.to_string());
        self.next_tick_unix = now_unix + self.tick_interval_secs as i64;
        if fatal {
            self.status = ScheduleStatus::Failed;
        }
    }
}
