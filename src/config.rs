//! Configuration management for dockwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `dockwatch.toml` file and merge it
//! with environment variables and command-line flags.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Verbose diagnostics. Only affects logging output, never routing.
    pub debug: bool,
    /// Docker daemon connection settings.
    pub docker: DockerConfig,
    /// Debounce/coalescing settings.
    pub debounce: DebounceConfig,
    /// Notification policy overrides: kind -> allowed actions. Empty keeps
    /// the built-in policy table.
    pub events: HashMap<String, Vec<String>>,
    /// Console channel settings. The console channel is always enabled.
    pub console: ConsoleConfig,
    /// Slack webhook channel, enabled when present.
    pub slack: Option<SlackConfig>,
    /// Telegram bot channel, enabled when present.
    pub telegram: Option<TelegramConfig>,
    /// Email channel, enabled when present.
    pub email: Option<EmailConfig>,
}

/// Docker daemon connection settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DockerConfig {
    /// Daemon address, e.g. `unix:///var/run/docker.sock` or
    /// `tcp://127.0.0.1:2375`. Unset uses the platform default.
    pub host: Option<String>,
}

/// Debounce/coalescing settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DebounceConfig {
    /// Minimum seconds between flushes. Zero selects the built-in default.
    pub min_interval_seconds: u64,
    /// Disables coalescing entirely; every event dispatches immediately.
    pub disabled: bool,
    /// Routes the console channel around the debouncer so local output sees
    /// every event immediately while remote channels share one window.
    pub bypass_console: bool,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            min_interval_seconds: 5,
            disabled: false,
            bypass_console: true,
        }
    }
}

impl DebounceConfig {
    /// The configured window as a `Duration`.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_seconds)
    }
}

/// Console channel settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConsoleConfig {
    /// Line prefix. Empty selects the built-in default.
    pub prefix: String,
    /// ANSI colors on stdout.
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            color: true,
        }
    }
}

/// Slack webhook channel settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SlackConfig {
    /// The Slack incoming webhook URL.
    pub webhook_url: String,
    /// Optional channel override for the webhook.
    pub channel: Option<String>,
}

/// Telegram bot channel settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: String,
    /// Target chat id.
    pub chat_id: String,
}

/// Email channel settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailConfig {
    /// SMTP server host.
    pub smtp_host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender address.
    pub from_address: String,
    /// Recipient addresses.
    pub to_addresses: Vec<String>,
    /// SMTP authentication username. Credentials switch delivery to
    /// STARTTLS; without them the connection stays plain.
    pub smtp_username: Option<String>,
    /// SMTP authentication password.
    pub smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// TOML file, environment, and CLI flags (strongest last).
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("dockwatch.toml"));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // Allow overriding with environment variables, e.g.
            // DOCKWATCH_SLACK__WEBHOOK_URL=... ("__" separates nesting).
            .merge(Env::prefixed("DOCKWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// True when any channel beyond the console is configured.
    pub fn has_remote_channels(&self) -> bool {
        self.slack.is_some() || self.telegram.is_some() || self.email.is_some()
    }

    /// The tracing filter implied by `log_level` and the `debug` flag.
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug: false,
            docker: DockerConfig::default(),
            debounce: DebounceConfig::default(),
            events: HashMap::new(),
            console: ConsoleConfig::default(),
            slack: None,
            telegram: None,
            email: None,
        }
    }
}
