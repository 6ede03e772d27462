//! Resolves a Recipient and delivers an event
//! across every enabled transport, retrying each independently.

pub mod transport;

use crate::error::Result;
use crate::model::Recipient;
use crate::store::{StateStore, get_json, keys};

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: String,
    pub wallet: String,
    pub position_id: String,
    pub pool: String,
    pub drift: Option<i32>,
    pub suggested_action: Option<transport::SuggestedAction>,
    pub timestamp_unix: i64,
}

pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve the Recipient for `event.wallet` and deliver across every
    /// enabled transport. Returns whether at least one transport
    /// succeeded.
    pub async fn notify(&self, store: &dyn StateStore, event: &NotificationEvent) -> Result<bool> {
        let Some(recipient): Option<Recipient> =
            get_json(store, &keys::recipient(&event.wallet)).await?
        else {
            return Ok(false);
        };

        let mut delivered = false;

        if let Some(chat) = &recipient.chat {
            let message = transport::compose_chat_message(event);
            if transport::deliver_chat(&self.client, chat, &message).await {
                delivered = true;
            }
        }

        if let Some(webhook) = &recipient.webhook {
            let payload = transport::compose_webhook_payload(event);
            if transport::deliver_webhook(&self.client, webhook, &payload).await {
                delivered = true;
            }
        }

        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recipient::{ChatTransport, RecipientPreferences};
    use crate::store::{memory::MemoryStore, set_json};

    #[tokio::test]
    async fn notify_with_no_recipient_is_not_delivered() {
        let store = MemoryStore::new();
        let notifier = Notifier::new(reqwest::Client::new());
        let event = NotificationEvent {
            kind: "OUT_OF_RANGE".into(),
            wallet: "wallet-1".into(),
            position_id: "pos-1".into(),
            pool: "pool-1".into(),
            drift: Some(3),
            suggested_action: None,
            timestamp_unix: 0,
        };
        assert!(!notifier.notify(&store, &event).await.unwrap());
    }

    #[tokio::test]
    async fn notify_with_no_enabled_transports_is_not_delivered() {
        let store = MemoryStore::new();
        let recipient = Recipient {
            wallet: "wallet-1".into(),
            chat: None,
            webhook: None,
            preferences: RecipientPreferences::default(),
        };
        set_json(&store, &keys::recipient("wallet-1"), &recipient)
            .await
            .unwrap();

        let notifier = Notifier::new(reqwest::Client::new());
        let event = NotificationEvent {
            kind: "BACK_IN_RANGE".into(),
            wallet: "wallet-1".into(),
            position_id: "pos-1".into(),
            pool: "pool-1".into(),
            drift: None,
            suggested_action: None,
            timestamp_unix: 0,
        };
        assert!(!notifier.notify(&store, &event).await.unwrap());
    }

    #[test]
    fn chat_recipient_type_accepts_channel_id() {
        let _ = ChatTransport { channel_id: "C123".into() };
    }
}
