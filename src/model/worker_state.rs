use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Process-wide singleton in the store; only the scheduler may mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerState {
    pub running: bool,
    pub started_at_unix: i64,
    pub last_check_unix: i64,
    pub checks_completed: u64,
    pub errors: u64,
}

impl WorkerState {
    pub fn start(now_unix: i64) -> Self {
        WorkerState {
            running: true,
            started_at_unix: now_unix,
            last_check_unix: now_unix,
            checks_completed: 0,
            errors: 0,
        }
    }

    pub fn record_tick(&mut self, now_unix: i64, had_error: bool) {
        self.last_check_unix = now_unix;
        self.checks_completed += 1;
        if had_error {
            self.errors += 1;
        }
    }
}
