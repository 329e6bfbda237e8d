//! The main application logic, decoupled from the entry point.
//!
//! `AppBuilder` assembles the pipeline — event source, classifier, delivery
//! stack — and spawns the long-lived tasks. The builder accepts overrides for
//! the event channel and the channel adapters so integration tests can drive
//! the pipeline without a Docker daemon or real channels.

use crate::channels::{ConsoleNotifier, EmailNotifier, SlackNotifier, TelegramNotifier};
use crate::config::Config;
use crate::core::{Event, Notifier};
use crate::debounce::DebouncedNotifier;
use crate::dispatch::MultiNotifier;
use crate::policy::PolicyTable;
use crate::render::Renderer;
use crate::source::DockerEventSource;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// A handle to the running application, containing all its task handles.
pub struct App {
    handles: Vec<(&'static str, JoinHandle<()>)>,
    debouncer: Option<DebouncedNotifier>,
    shutdown_rx: watch::Receiver<bool>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Waits for the shutdown signal, then joins every task and drains the
    /// debounce stage.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();
        shutdown_rx.changed().await.ok();
        info!("shutdown signal received, waiting for tasks to finish");

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "task panicked during shutdown");
            }
        }
        if let Some(debouncer) = &self.debouncer {
            debouncer.close().await;
        }
        info!("all tasks shut down");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the application's components from running them,
/// and provides a convenient way to override components for testing.
pub struct AppBuilder {
    config: Config,
    events_rx_for_test: Option<mpsc::Receiver<Event>>,
    channels_override: Option<(Arc<dyn Notifier>, Vec<Arc<dyn Notifier>>)>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events_rx_for_test: None,
            channels_override: None,
        }
    }

    /// Overrides the event receiver channel for testing.
    pub fn events_rx_for_test(mut self, rx: mpsc::Receiver<Event>) -> Self {
        self.events_rx_for_test = Some(rx);
        self
    }

    /// Overrides the console and remote channel adapters for testing.
    pub fn channels_override(
        mut self,
        console: Arc<dyn Notifier>,
        remotes: Vec<Arc<dyn Notifier>>,
    ) -> Self {
        self.channels_override = Some((console, remotes));
        self
    }

    /// Builds and initializes all application components, returning a
    /// runnable `App`.
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let renderer = Arc::new(Renderer::new());

        let policy = PolicyTable::from_overrides(&config.events);
        info!(rules = policy.len(), "notification policy loaded");

        let (console, remotes) = match self.channels_override {
            Some(channels) => channels,
            None => build_channels(&config, &renderer)?,
        };
        let (notifier, debouncer) = assemble_delivery(&config, console, remotes);

        let mut handles = Vec::new();
        let events_rx = match self.events_rx_for_test {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
                let source = DockerEventSource::connect(config.docker.host.as_deref())?;
                source.log_daemon_version().await;
                let source_shutdown = shutdown_rx.clone();
                handles.push((
                    "EventSource",
                    tokio::spawn(source.run(tx, source_shutdown)),
                ));
                rx
            }
        };

        handles.push((
            "Consumer",
            tokio::spawn(consume_events(
                events_rx,
                policy,
                notifier,
                shutdown_rx.clone(),
            )),
        ));

        info!("dockwatch initialized successfully, watching for events");
        Ok(App {
            handles,
            debouncer,
            shutdown_rx,
        })
    }
}

/// Instantiates the configured channel adapters.
fn build_channels(
    config: &Config,
    renderer: &Arc<Renderer>,
) -> Result<(Arc<dyn Notifier>, Vec<Arc<dyn Notifier>>)> {
    let console: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(
        &config.console.prefix,
        config.console.color,
        renderer.clone(),
    ));

    let mut remotes: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(slack) = &config.slack {
        info!("Slack channel enabled");
        remotes.push(Arc::new(SlackNotifier::new(
            slack.webhook_url.clone(),
            slack.channel.clone(),
            renderer.clone(),
        )));
    }
    if let Some(telegram) = &config.telegram {
        info!("Telegram channel enabled");
        remotes.push(Arc::new(TelegramNotifier::new(
            telegram.token.clone(),
            telegram.chat_id.clone(),
            renderer.clone(),
        )));
    }
    if let Some(email) = &config.email {
        info!("email channel enabled");
        remotes.push(Arc::new(EmailNotifier::new(email, renderer.clone())?));
    }
    Ok((console, remotes))
}

/// Composes the delivery stack from the console adapter and the remote
/// adapters, honoring the debounce policy:
///
/// - debounce disabled: one flat fan-out, everything immediate;
/// - console bypass (default): console immediate, remote channels share one
///   debounced sub-dispatcher;
/// - otherwise: a single debouncer in front of one flat fan-out.
///
/// The returned `DebouncedNotifier` handle, when present, must be closed on
/// shutdown to drain its buffer.
fn assemble_delivery(
    config: &Config,
    console: Arc<dyn Notifier>,
    remotes: Vec<Arc<dyn Notifier>>,
) -> (Arc<dyn Notifier>, Option<DebouncedNotifier>) {
    let debounce = &config.debounce;
    if debounce.disabled {
        let mut all = vec![console];
        all.extend(remotes);
        return (Arc::new(MultiNotifier::new(all)), None);
    }

    if debounce.bypass_console {
        if remotes.is_empty() {
            // Only the console is configured; there is nothing to coalesce.
            return (console, None);
        }
        let remote_fanout = Arc::new(MultiNotifier::named("remote", remotes));
        let debounced = DebouncedNotifier::new(remote_fanout, debounce.min_interval());
        let top = MultiNotifier::new(vec![console, Arc::new(debounced.clone())]);
        (Arc::new(top), Some(debounced))
    } else {
        let mut all = vec![console];
        all.extend(remotes);
        let fanout = Arc::new(MultiNotifier::new(all));
        let debounced = DebouncedNotifier::new(fanout, debounce.min_interval());
        (Arc::new(debounced.clone()), Some(debounced))
    }
}

/// The single consumer: classifies each event and hands the keepers to the
/// delivery stack, in arrival order. Dispatch failures are logged and never
/// stop the loop.
async fn consume_events(
    mut events_rx: mpsc::Receiver<Event>,
    policy: PolicyTable,
    notifier: Arc<dyn Notifier>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                info!("consumer received shutdown signal");
                break;
            }
            maybe_event = events_rx.recv() => {
                let Some(event) = maybe_event else {
                    info!("event channel closed, consumer shutting down");
                    break;
                };
                if !policy.should_notify(&event) {
                    continue;
                }
                debug!(
                    kind = %event.kind,
                    action = %event.action,
                    name = %event.name,
                    "dispatching notification"
                );
                if let Err(e) = notifier.notify(&event).await {
                    error!(error = %e, "notification dispatch failed");
                }
            }
        }
    }
    info!("consumer finished");
}
