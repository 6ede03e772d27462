//! Namespaced key builders for the `lp:*` keyspace.

pub fn user(wallet_id: &str) -> String {
    format!("lp:user:{wallet_id}")
}

pub fn chat_wallet(chat_id: &str) -> String {
    format!("lp:chat:{chat_id}:wallet")
}

pub fn recipient(wallet_id: &str) -> String {
    format!("lp:recipient:{wallet_id}")
}

pub fn tracked_wallets() -> String {
    "lp:tracked:wallets".to_string()
}

pub fn tracked_set(wallet_id: &str) -> String {
    format!("lp:tracked:{wallet_id}")
}

pub fn tracked_record(wallet_id: &str, position_id: &str) -> String {
    format!("lp:tracked:{wallet_id}:{position_id}")
}

/// Registry set of every schedule id ever created, regardless of status.
pub fn dca_schedules() -> String {
    "lp:dca:schedules".to_string()
}

pub fn dca_schedule(schedule_id: &str) -> String {
    format!("lp:dca:schedule:{schedule_id}")
}

/// Per-wallet index so "list schedules for wallet" doesn't scan the
/// whole registry.
pub fn dca_wallet_schedules(wallet_id: &str) -> String {
    format!("lp:dca:wallet:{wallet_id}")
}

pub fn dca_active() -> String {
    "lp:dca:active".to_string()
}

pub fn dca_history(schedule_id: &str) -> String {
    format!("lp:dca:history:{schedule_id}")
}

pub fn worker_state() -> String {
    "lp:worker:state".to_string()
}

pub fn worker_logs() -> String {
    "lp:worker:logs".to_string()
}
