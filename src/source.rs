//! Docker event source.
//!
//! A thin wrapper over the bollard client: one `events()` subscription,
//! forwarded into the pipeline channel. Reconnect policy deliberately does
//! not live here; stream trouble is logged and surfaced to the channels as
//! a synthetic `connection` event, and the dispatch core keeps running.

use crate::core::{
    Event, COMPOSE_PROJECT_LABEL, COMPOSE_SERVICE_LABEL, EXEC_DURATION_LABEL, EXIT_CODE_LABEL,
    NAME_LABEL,
};
use bollard::models::EventMessage;
use bollard::query_parameters::EventsOptions;
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

const CONNECT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to connect to the docker daemon: {0}")]
    Connect(#[source] bollard::errors::Error),
}

/// Subscribes to the daemon's event stream and feeds the pipeline.
pub struct DockerEventSource {
    docker: Docker,
}

impl DockerEventSource {
    /// Connects to the daemon. `None` uses the platform default socket;
    /// `unix://` and `tcp://`/`http://` addresses are honored.
    pub fn connect(host: Option<&str>) -> Result<Self, SourceError> {
        let docker = match host {
            None => Docker::connect_with_local_defaults(),
            Some(host) if host.starts_with("unix://") => {
                Docker::connect_with_unix(host, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            Some(host) => {
                Docker::connect_with_http(host, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(SourceError::Connect)?;
        Ok(Self { docker })
    }

    /// Logs the daemon version once at startup.
    pub async fn log_daemon_version(&self) {
        match self.docker.version().await {
            Ok(version) => info!(
                version = version.version.as_deref().unwrap_or("unknown"),
                api_version = version.api_version.as_deref().unwrap_or("unknown"),
                "connected to docker daemon"
            ),
            Err(e) => warn!(error = %e, "could not query docker daemon version"),
        }
    }

    /// Runs the subscription loop until shutdown, forwarding every daemon
    /// event into `tx`. Stream errors become synthetic connection events and
    /// the loop keeps consuming; a closed stream ends the loop.
    pub async fn run(self, tx: mpsc::Sender<Event>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut stream = Box::pin(self.docker.events(Option::<EventsOptions>::None));
        info!("subscribed to docker event stream");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("event source received shutdown signal");
                    break;
                }
                item = stream.next() => match item {
                    Some(Ok(message)) => {
                        if tx.send(convert_message(message)).await.is_err() {
                            // Consumer is gone; nothing left to feed.
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "docker event stream error");
                        let event = Event::connection_message(format!(
                            "Docker event stream error: {e}"
                        ));
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!("docker event stream closed");
                        let _ = tx
                            .send(Event::connection_message("Docker event stream closed"))
                            .await;
                        break;
                    }
                }
            }
        }
        info!("event source finished");
    }
}

/// Converts a daemon message into the pipeline event type, extracting the
/// derived label fields once.
pub fn convert_message(message: EventMessage) -> Event {
    let kind = message.typ.map(|t| t.to_string()).unwrap_or_default();
    let action = message.action.unwrap_or_default();
    let (container, labels) = match message.actor {
        Some(actor) => (
            actor.id.unwrap_or_default(),
            actor.attributes.unwrap_or_default(),
        ),
        None => (String::new(), HashMap::new()),
    };

    let label = |key: &str| labels.get(key).cloned().unwrap_or_default();
    let image = label("image");
    let name = label(NAME_LABEL);
    let project = label(COMPOSE_PROJECT_LABEL);
    let service = label(COMPOSE_SERVICE_LABEL);
    let exit_code = label(EXIT_CODE_LABEL);
    let exec_duration = label(EXEC_DURATION_LABEL);

    Event {
        kind,
        // The daemon's legacy status field mirrors the action for container
        // events; the typed API no longer carries it separately.
        status: action.clone(),
        action,
        container,
        image,
        time: message.time.unwrap_or_default(),
        labels,
        name,
        project,
        service,
        exit_code,
        exec_duration,
        message: None,
    }
}
