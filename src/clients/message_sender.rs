use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, recipient: &str, content: &str) -> Result<(), String>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send_message(&self, recipient: &str, content: &str) -> Result<(), String> {
        info!(%recipient, %content, "notification");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    message: &'a str,
}

/// Posts `{"to": ..., "message": ...}` to an external delivery service
/// (email/SMS gateway).
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    /// `timeout` bounds each delivery request end to end.
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send_message(&self, recipient: &str, content: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                to: recipient,
                message: content,
            })
            .send()
            .await
            .map_err(|e| format!("Error sending notification: {:?}", e))?;
        if !response.status().is_success() {
            return Err(format!(
                "Notification webhook returned {}",
                response.status()
            ));
        }
        Ok(())
    }
}
