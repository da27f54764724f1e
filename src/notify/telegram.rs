//! Telegram Bot API channel.

use super::{NotificationChannel, NotificationResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct TelegramChannel {
    client: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self::with_base_url("https://api.telegram.org".to_string(), bot_token, chat_id)
    }

    pub fn with_base_url(base_url: String, bot_token: String, chat_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url,
            bot_token,
            chat_id,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.bot_token
        )
    }
}

fn format_message(title: &str, body: &str) -> String {
    if body.is_empty() {
        title.to_string()
    } else {
        format!("{}\n\n{}", title, body)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, title: &str, body: &str) -> NotificationResult {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": format_message(title, body),
            "disable_web_page_preview": true,
        });

        let response = match self.client.post(self.endpoint()).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                // The request URL carries the bot token.
                let e = e.without_url();
                warn!(error = %e, "Telegram notification failed");
                return NotificationResult::not_sent(e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            NotificationResult::sent()
        } else {
            warn!(status = status.as_u16(), "Telegram rejected notification");
            NotificationResult::not_sent(format!("telegram returned {}", status.as_u16()))
        }
    }
}
