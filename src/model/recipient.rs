use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Notification recipients are a tagged record per transport, not
/// duck-typed config — the fan-out dispatches on presence of fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebhookTransport {
    pub url: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatTransport {
    pub channel_id: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub struct RecipientPreferences {
    pub alert_on_out_of_range: bool,
    pub alert_on_back_in_range: bool,
    pub daily_summary: bool,
    pub auto_rebalance: bool,
    /// Grid units (bins or ticks) of drift beyond which auto-rebalance fires.
    pub rebalance_drift_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recipient {
    pub wallet: String,
    pub chat: Option<ChatTransport>,
    pub webhook: Option<WebhookTransport>,
    pub preferences: RecipientPreferences,
}

impl Recipient {
    /// Invariant: at least one enabled transport.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chat.is_none() && self.webhook.is_none() {
            return Err(crate::error::EngineError::Validation(
                "recipient must have at least one enabled transport".into(),
            ));
        }
        Ok(())
    }
}
