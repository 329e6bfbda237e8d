//! Console channel: prints notifications to stdout.

use crate::core::{Event, Notifier};
use crate::render::{RenderFormat, Renderer};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

const DEFAULT_PREFIX: &str = "DOCKER-EVENT";

// Bold variants, applied only to the prefix and timestamp; the body uses the
// renderer's ANSI palette.
const PREFIX_COLOR: &str = "\x1b[1;34m";
const TIME_COLOR: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// Prints one line per event: `[PREFIX] [timestamp] <rendered>`.
pub struct ConsoleNotifier {
    prefix: String,
    colored: bool,
    format: RenderFormat,
    renderer: Arc<Renderer>,
}

impl ConsoleNotifier {
    pub fn new(prefix: &str, colored: bool, renderer: Arc<Renderer>) -> Self {
        let prefix = if prefix.is_empty() {
            DEFAULT_PREFIX.to_string()
        } else {
            prefix.to_string()
        };
        let format = if colored {
            RenderFormat::Ansi
        } else {
            RenderFormat::Plain
        };
        Self {
            prefix,
            colored,
            format,
            renderer,
        }
    }

    fn format_line(&self, event: &Event, timestamp: &str) -> String {
        let body = self.renderer.render(event, self.format);
        if self.colored {
            format!(
                "{PREFIX_COLOR}[{}]{RESET} {TIME_COLOR}[{}]{RESET} {}",
                self.prefix, timestamp, body
            )
        } else {
            format!("[{}] [{}] {}", self.prefix, timestamp, body)
        }
    }

    fn print(&self, event: &Event) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        println!("{}", self.format_line(event, &timestamp));
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        self.print(event);
        Ok(())
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        for event in events {
            self.print(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        let mut event = Event::new("container", "start");
        event.name = "web".to_string();
        event.image = "nginx:latest".to_string();
        event
    }

    #[test]
    fn plain_line_carries_prefix_timestamp_and_body() {
        let console = ConsoleNotifier::new("", false, Arc::new(Renderer::new()));
        assert_eq!(
            console.format_line(&event(), "2026-08-07T10:00:00Z"),
            "[DOCKER-EVENT] [2026-08-07T10:00:00Z] container start web (nginx:latest)"
        );
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        let console = ConsoleNotifier::new("PROD", false, Arc::new(Renderer::new()));
        let line = console.format_line(&event(), "2026-08-07T10:00:00Z");
        assert!(line.starts_with("[PROD] "), "got: {line}");
    }

    #[test]
    fn colored_line_decorates_prefix_and_renders_ansi_body() {
        let console = ConsoleNotifier::new("", true, Arc::new(Renderer::new()));
        let line = console.format_line(&event(), "2026-08-07T10:00:00Z");
        assert!(line.starts_with("\x1b[1;34m[DOCKER-EVENT]\x1b[0m "), "got: {line}");
        // The body comes from the ANSI render format.
        assert!(line.contains("\x1b[36mweb\x1b[0m"), "got: {line}");
    }
}
