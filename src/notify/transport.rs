//! Per-transport message composition and delivery for notification
//! fan-out.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::Result;
use crate::model::recipient::{ChatTransport, WebhookTransport};

use super::NotificationEvent;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub event_kind: &'a str,
    pub wallet: &'a str,
    pub position_id: &'a str,
    pub pool: &'a str,
    pub drift: Option<i32>,
    pub suggested_action: Option<SuggestedAction>,
    pub timestamp_unix: i64,
}

#[derive(Debug, Serialize)]
pub struct SuggestedAction {
    pub endpoint: String,
    pub parameters: serde_json::Value,
}

pub fn compose_chat_message(event: &NotificationEvent) -> String {
    match event.drift {
        Some(drift) => format!(
            "[{}] wallet {} position {} in pool {} — drift {} grid units",
            event.kind, event.wallet, event.position_id, event.pool, drift
        ),
        None => format!(
            "[{}] wallet {} position {} in pool {}",
            event.kind, event.wallet, event.position_id, event.pool
        ),
    }
}

pub fn compose_webhook_payload(event: &NotificationEvent) -> WebhookPayload<'_> {
    WebhookPayload {
        event_kind: &event.kind,
        wallet: &event.wallet,
        position_id: &event.position_id,
        pool: &event.pool,
        drift: event.drift,
        suggested_action: event.suggested_action.clone(),
        timestamp_unix: event.timestamp_unix,
    }
}

/// Sign a canonical JSON serialization of the payload with the
/// recipient's webhook secret via HMAC-SHA256.
pub fn sign_payload(secret: &str, canonical_json: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::EngineError::Internal(format!("hmac key: {e}")))?;
    mac.update(canonical_json.as_bytes());
    Ok(hex_encode(&mac.finalize().into_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

pub async fn deliver_chat(client: &reqwest::Client, transport: &ChatTransport, message: &str) -> bool {
    deliver_with_retry(|| async {
        client
            .post("https://chat.internal.invalid/send")
            .json(&serde_json::json!({ "channel_id": transport.channel_id, "text": message }))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    })
    .await
}

pub async fn deliver_webhook(client: &reqwest::Client, transport: &WebhookTransport, payload: &WebhookPayload<'_>) -> bool {
    let canonical_json = match serde_json::to_string(payload) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let Ok(signature) = sign_payload(&transport.secret, &canonical_json) else {
        return false;
    };

    deliver_with_retry(|| async {
        client
            .post(&transport.url)
            .header("X-Signature", &signature)
            .header("Content-Type", "application/json")
            .body(canonical_json.clone())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    })
    .await
}

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 1;

async fn deliver_with_retry<F, Fut>(mut attempt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for i in 0..MAX_ATTEMPTS {
        if attempt().await {
            return true;
        }
        if i + 1 < MAX_ATTEMPTS {
            let backoff = BACKOFF_BASE_SECS * 2u64.pow(i);
            tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_for_same_input() {
        let a = sign_payload("secret", "{}").unwrap();
        let b = sign_payload("secret", "{}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_secret() {
        let a = sign_payload("secret-a", "{}").unwrap();
        let b = sign_payload("secret-b", "{}").unwrap();
        assert_ne!(a, b);
    }
}
