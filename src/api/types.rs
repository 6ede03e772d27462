//! Request/response DTOs for the endpoint groups. Handlers translate
//! between these and the domain model in `crate::model`; the wire shapes
//! intentionally stay flatter than the model (e.g. price bounds omitted
//! from range inputs — the venue adapter derives them).

use serde::{Deserialize, Serialize};

use crate::model::{DistributionShape, Position, RangeShape, TipUrgency, VenueTag};
use crate::oracle::AggregatedPrice;
use crate::submission::SubmissionResult;

// ---- Wallet ----------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateWalletRequest {
    pub label: Option<String>,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub wallet: String,
    pub address: String,
    pub label: Option<String>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub wallet: String,
    pub lamports: u64,
}

// ---- Pools -------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct ListPoolsQuery {
    pub min_tvl_usd: Option<f64>,
    pub max_risk_score: Option<u8>,
    pub venue: Option<VenueTag>,
    pub sort: Option<String>,
}

#[derive(Deserialize)]
pub struct BestPairQuery {
    pub a: String,
    pub b: String,
}

// ---- LP ------------------------------------------------------------

#[derive(Deserialize)]
pub struct AtomicOpenRequest {
    pub wallet: String,
    pub venue: VenueTag,
    pub pool: String,
    pub collateral_mint: String,
    pub collateral_amount: u64,
    pub range_shape: RangeShape,
    pub distribution_shape: Option<DistributionShape>,
    pub slippage_bps: u32,
    pub tip_urgency: TipUrgency,
    pub custom_lower: Option<i32>,
    pub custom_upper: Option<i32>,
    #[serde(default)]
    pub sequential: bool,
}

#[derive(Deserialize)]
pub struct ExecuteOpenRequest {
    pub wallet: String,
    pub venue: VenueTag,
    pub pool: String,
    pub collateral_mint: String,
    pub amount_a: u64,
    pub amount_b: u64,
    pub range_shape: RangeShape,
    pub distribution_shape: Option<DistributionShape>,
    pub slippage_bps: u32,
    pub tip_urgency: TipUrgency,
    pub custom_lower: Option<i32>,
    pub custom_upper: Option<i32>,
    #[serde(default)]
    pub sequential: bool,
}

#[derive(Deserialize)]
pub struct AtomicWithdrawRequest {
    pub wallet: String,
    pub position: String,
    pub venue: VenueTag,
    pub pool: String,
    pub convert_to_mint: Option<String>,
    pub tip_urgency: TipUrgency,
    #[serde(default)]
    pub sequential: bool,
}

#[derive(Deserialize)]
pub struct RebalanceRequest {
    pub wallet: String,
    pub position: String,
    pub venue: VenueTag,
    pub pool: String,
    pub tip_urgency: TipUrgency,
    #[serde(default)]
    pub sequential: bool,
}

#[derive(Deserialize)]
pub struct CollectFeesRequest {
    pub wallet: String,
    pub position: String,
    pub venue: VenueTag,
    pub tip_urgency: TipUrgency,
}

#[derive(Serialize)]
pub struct IntentResponse {
    pub submission: SubmissionResult,
    pub sealed_strategy_ciphertext_b64: String,
    pub escalated_to_bps: u32,
    /// `false` only for withdraw-and-convert when the swap back to the
    /// target mint failed; the raw pool tokens are left in the wallet and
    /// `reason` explains why, with `submission` still reflecting the
    /// decrease/close that did land.
    pub converted: bool,
    pub reason: Option<String>,
}

// ---- Positions -------------------------------------------------------

#[derive(Serialize)]
pub struct PositionsResponse {
    pub wallet: String,
    pub positions: Vec<Position>,
}

// ---- Oracle ------------------------------------------------------------

#[derive(Serialize)]
pub struct PriceResponse {
    pub mint: String,
    pub price: AggregatedPrice,
}

#[derive(Deserialize)]
pub struct BatchPricesRequest {
    pub mints: Vec<String>,
}

#[derive(Serialize)]
pub struct BatchPricesResponse {
    pub prices: Vec<PriceResponse>,
}

// ---- DCA -------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub wallet: String,
    pub pool: String,
    pub amount_per_tick: u64,
    pub total_budget: u64,
    pub tick_interval_secs: u64,
    pub max_executions: u32,
    pub range_shape: RangeShape,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub id: String,
}

// ---- Notifications -----------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRecipientRequest {
    pub wallet: String,
    pub chat_channel_id: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePreferencesRequest {
    pub alert_on_out_of_range: bool,
    pub alert_on_back_in_range: bool,
    pub daily_summary: bool,
    pub auto_rebalance: bool,
    pub rebalance_drift_threshold: u32,
}

// ---- Worker ----------------------------------------------------------

#[derive(Serialize)]
pub struct WorkerStatusResponse {
    pub running: bool,
    pub started_at_unix: i64,
    pub last_check_unix: i64,
    pub checks_completed: u64,
    pub errors: u64,
    pub recent_logs: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
