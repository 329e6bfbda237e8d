//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. The parsed arguments implement `figment::Provider`, so
//! they merge as the strongest layer on top of the `dockwatch.toml` file and
//! environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Docker event monitoring and notification dispatcher.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Docker daemon address, e.g. unix:///var/run/docker.sock.
    #[arg(long, value_name = "URL")]
    pub docker_host: Option<String>,

    /// Minimum seconds between notification flushes.
    #[arg(long, value_name = "SECONDS")]
    pub debounce_seconds: Option<u64>,

    /// Dispatch every event immediately, without coalescing.
    #[arg(long)]
    pub no_debounce: bool,

    /// Verbose diagnostic logging.
    #[arg(long)]
    pub debug: bool,

    /// Slack incoming webhook URL.
    #[arg(long, value_name = "URL")]
    pub slack_webhook_url: Option<String>,

    /// Telegram bot token.
    #[arg(long, value_name = "TOKEN")]
    pub telegram_token: Option<String>,

    /// Telegram chat id.
    #[arg(long, value_name = "ID")]
    pub telegram_chat_id: Option<String>,
}

/// Inserts `section.key = value` into the top-level dict, creating the
/// section dict on first use.
fn insert_nested(outer: &mut Dict, section: &str, key: &str, value: Value) {
    let entry = outer
        .entry(section.to_string())
        .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
    if let Value::Dict(_, section_dict) = entry {
        section_dict.insert(key.to_string(), value);
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(host) = &self.docker_host {
            insert_nested(&mut dict, "docker", "host", Value::from(host.clone()));
        }
        if let Some(seconds) = self.debounce_seconds {
            insert_nested(
                &mut dict,
                "debounce",
                "min_interval_seconds",
                Value::from(seconds),
            );
        }
        if self.no_debounce {
            insert_nested(&mut dict, "debounce", "disabled", Value::from(true));
        }
        // Boolean flags only override when actually given; a bare `false`
        // would otherwise clobber a `debug = true` from the config file.
        if self.debug {
            dict.insert("debug".to_string(), Value::from(true));
        }
        if let Some(url) = &self.slack_webhook_url {
            insert_nested(&mut dict, "slack", "webhook_url", Value::from(url.clone()));
        }
        if let Some(token) = &self.telegram_token {
            insert_nested(&mut dict, "telegram", "token", Value::from(token.clone()));
        }
        if let Some(chat_id) = &self.telegram_chat_id {
            insert_nested(&mut dict, "telegram", "chat_id", Value::from(chat_id.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
