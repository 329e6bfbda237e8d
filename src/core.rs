//! Core domain types and service traits for dockwatch
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label carrying the human-readable container name.
pub const NAME_LABEL: &str = "name";
/// Compose project label attached by docker compose.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
/// Compose service label attached by docker compose.
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
/// Label carrying the exit code of a stopped container.
pub const EXIT_CODE_LABEL: &str = "exitCode";
/// Label carrying the container execution duration in seconds.
pub const EXEC_DURATION_LABEL: &str = "execDuration";

/// A single lifecycle event observed on the Docker daemon.
///
/// Events are immutable once constructed. The derived fields (`name`,
/// `project`, `service`, `exit_code`, `exec_duration`) are extracted from
/// `labels` at construction time so the rest of the pipeline never has to
/// know the label keys. Optional fields use the empty string, matching the
/// daemon's own attribute encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Event {
    /// Event kind, e.g. "container" or "connection".
    pub kind: String,
    /// Event action, e.g. "start", "die", "health_status: healthy".
    pub action: String,
    /// Identifier of the subject (container id).
    pub container: String,
    /// Image reference the subject was created from.
    pub image: String,
    /// Unix timestamp reported by the daemon.
    pub time: i64,
    /// Legacy status string (mirrors the action for container events).
    pub status: String,
    /// Raw attribute map from the daemon actor.
    pub labels: HashMap<String, String>,

    /// Human-readable container name.
    pub name: String,
    /// Compose project, when the container belongs to one.
    pub project: String,
    /// Compose service, when the container belongs to one.
    pub service: String,
    /// Exit code as reported by the daemon (string-typed on the wire).
    pub exit_code: String,
    /// Execution duration in seconds, as reported by the daemon.
    pub exec_duration: String,

    /// Override message. When set, rendering returns it as-is instead of
    /// composing text from the fields above.
    pub message: Option<String>,
}

impl Event {
    /// Creates a bare event from a (kind, action) pair. Used by tests and by
    /// synthetic events; real events come from `source::convert_message`.
    pub fn new(kind: &str, action: &str) -> Self {
        Self {
            kind: kind.to_string(),
            action: action.to_string(),
            ..Default::default()
        }
    }

    /// Creates a synthetic `connection` event carrying an override message.
    ///
    /// These are emitted by the event source when the daemon stream fails,
    /// so channels report source trouble like any other notification.
    pub fn connection_message(text: impl Into<String>) -> Self {
        Self {
            kind: "connection".to_string(),
            action: "message".to_string(),
            message: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Delivers notifications to a single channel.
///
/// Implementations must be independent of each other: a failure in one
/// notifier never blocks another. Both dispatchers and the debouncing stage
/// implement this trait themselves, so delivery topologies compose
/// recursively.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A unique, descriptive name for the channel (e.g. "console", "slack").
    /// Used for logging and failure aggregation.
    fn name(&self) -> &str;

    /// Delivers a single event.
    async fn notify(&self, event: &Event) -> Result<()>;

    /// Delivers a batch of events as one logical notification.
    ///
    /// Implementations choose their own batch presentation; order of the
    /// slice is the arrival order and must be preserved.
    async fn notify_batch(&self, events: &[Event]) -> Result<()>;
}
