//! Telegram channel: sends notifications through the bot API.

use crate::core::{Event, Notifier};
use crate::render::{RenderFormat, Renderer};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Sends Markdown-formatted notifications via the Telegram `sendMessage`
/// bot-API call. Batches are joined into one message with `---` separators.
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    api_base: String,
    renderer: Arc<Renderer>,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, renderer: Arc<Renderer>) -> Self {
        Self::with_api_base(token, chat_id, DEFAULT_API_BASE.to_string(), renderer)
    }

    /// Overrides the API host; used by tests to point at a local server.
    pub fn with_api_base(
        token: String,
        chat_id: String,
        api_base: String,
        renderer: Arc<Renderer>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("default reqwest client");
        Self {
            token,
            chat_id,
            api_base,
            renderer,
            client,
        }
    }

    async fn send_message(&self, text: String) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text.as_str()),
            ("parse_mode", "Markdown"),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        if status.is_success() {
            info!("delivered notification to Telegram");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Telegram API rejected notification");
            anyhow::bail!("Telegram API returned status {status}: {body}")
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        self.send_message(self.renderer.render(event, RenderFormat::Markdown))
            .await
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut messages = Vec::with_capacity(events.len() + 1);
        if events.len() > 1 {
            messages.push("Multiple events:".to_string());
        }
        for event in events {
            messages.push(self.renderer.render(event, RenderFormat::Markdown));
        }
        self.send_message(messages.join("\n---\n")).await
    }
}
