//! Slack channel: posts notifications to an incoming webhook.

use crate::core::{Event, Notifier};
use crate::render::{RenderFormat, Renderer};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Posts plain-text notifications to a Slack incoming webhook. A batch is
/// delivered as one message with one line per event.
pub struct SlackNotifier {
    webhook_url: String,
    channel: Option<String>,
    renderer: Arc<Renderer>,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String, channel: Option<String>, renderer: Arc<Renderer>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("default reqwest client");
        Self {
            webhook_url,
            channel,
            renderer,
            client,
        }
    }

    fn payload(&self, text: String) -> Value {
        let mut payload = json!({ "text": text });
        if let Some(channel) = &self.channel {
            payload["channel"] = json!(channel);
        }
        payload
    }

    async fn post(&self, text: String) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(text))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("delivered notification to Slack");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Slack webhook rejected notification");
            anyhow::bail!("Slack webhook returned status {status}: {body}")
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        self.post(self.renderer.render(event, RenderFormat::Plain)).await
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let lines: Vec<String> = events
            .iter()
            .map(|event| self.renderer.render(event, RenderFormat::Plain))
            .collect();
        self.post(lines.join("\n")).await
    }
}
