//! Best-effort outbound notifications.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

pub mod telegram;

pub use telegram::TelegramChannel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl NotificationResult {
    pub fn sent() -> Self {
        Self {
            sent: true,
            reason: None,
        }
    }

    pub fn not_sent(reason: impl Into<String>) -> Self {
        Self {
            sent: false,
            reason: Some(reason.into()),
        }
    }
}

/// Outbound notification channel. Never fails: problems are reported in the
/// result and callers carry on.
#[async_trait]
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    async fn send(&self, title: &str, body: &str) -> NotificationResult;
}

/// Used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledChannel;

#[async_trait]
impl NotificationChannel for DisabledChannel {
    async fn send(&self, _title: &str, _body: &str) -> NotificationResult {
        NotificationResult::not_sent("disabled")
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, title: &str, body: &str) -> NotificationResult {
        match self.messages.lock() {
            Ok(mut messages) => {
                messages.push((title.to_string(), body.to_string()));
                NotificationResult::sent()
            }
            Err(_) => NotificationResult::not_sent("recorder poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_channel_reports_reason() {
        let result = DisabledChannel.send("t", "b").await;
        assert!(!result.sent);
        assert_eq!(result.reason.as_deref(), Some("disabled"));
    }

    #[tokio::test]
    async fn test_recording_channel_keeps_messages() {
        let channel = RecordingChannel::new();
        assert!(channel.send("title", "body").await.sent);
        assert_eq!(
            channel.messages(),
            vec![("title".to_string(), "body".to_string())]
        );
    }
}
