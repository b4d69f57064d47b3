//! Audit sinks
//!
//! `WebhookSink` posts `{"content": "..."}` to a chat-style webhook.
//! `LogSink` is used when no endpoint is configured.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Notifier delivery errors. Logged, never surfaced to users.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notifier unavailable: {0}")]
    Unavailable(String),

    #[error("webhook rejected message: HTTP {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NotifierError::Rejected(status.as_u16()),
            None => NotifierError::Unavailable(err.to_string()),
        }
    }
}

/// Destination for audit text.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<(), NotifierError>;
}

/// HTTP webhook sink.
pub struct WebhookSink {
    client: Client,
    url: Url,
}

impl WebhookSink {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Unavailable(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl AuditSink for WebhookSink {
    async fn deliver(&self, message: &str) -> Result<(), NotifierError> {
        self.client
            .post(self.url.clone())
            .json(&serde_json::json!({ "content": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Writes audit text to the local log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AuditSink for LogSink {
    async fn deliver(&self, message: &str) -> Result<(), NotifierError> {
        info!(target: "gatehouse::audit", "{}", message);
        Ok(())
    }
}

/// Keeps delivered messages in memory for assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    messages: Vec<String>,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail (messages are not recorded while failing).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing = failing;
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn deliver(&self, message: &str) -> Result<(), NotifierError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NotifierError::Unavailable("recording sink poisoned".to_string()))?;
        if state.failing {
            return Err(NotifierError::Unavailable("recording sink offline".to_string()));
        }
        state.messages.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_records() {
        let sink = RecordingSink::new();
        sink.deliver("abc connected.").await.unwrap();
        assert_eq!(sink.messages(), vec!["abc connected.".to_string()]);
    }

    #[tokio::test]
    async fn test_recording_sink_failing() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        assert!(sink.deliver("lost").await.is_err());
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_sink_unreachable_endpoint() {
        // Port 9 (discard) on localhost is not expected to speak HTTP.
        let url = Url::parse("http://127.0.0.1:9/webhook").unwrap();
        let sink = WebhookSink::new(url, Duration::from_millis(500)).unwrap();
        let err = sink.deliver("abc connected.").await.unwrap_err();
        assert!(matches!(err, NotifierError::Unavailable(_)));
    }
}
