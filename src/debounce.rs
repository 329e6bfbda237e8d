//! Debounced notification coalescing.
//!
//! `DebouncedNotifier` sits between the consumer loop and a downstream
//! dispatcher and guarantees at most one flush per rate window. Events
//! arriving inside a window accumulate in arrival order and leave as a
//! single batch when the window's one-shot timer fires; an event arriving
//! after a full window of quiet flushes immediately.
//!
//! The state machine is Idle/Buffering with a single pending timer. All
//! state transitions happen under one mutex; the lock is released before
//! any batch is handed downstream, so a slow channel never blocks the
//! consumer.

use crate::core::{Event, Notifier};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Rate window applied when the configured interval is zero/unset.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Smallest accepted rate window.
const MIN_ALLOWED_INTERVAL: Duration = Duration::from_secs(1);

struct DebounceState {
    /// Buffered events in arrival order.
    pending: Vec<Event>,
    /// Instant the current rate window opened. Immediate flushes open a new
    /// window; a timer flush leaves the origin in place so that the next
    /// event after the flush may go out immediately.
    window_start: Instant,
    /// The single pending one-shot flush timer, when in the Buffering state.
    timer: Option<JoinHandle<()>>,
    closed: bool,
}

struct Shared {
    downstream: Arc<dyn Notifier>,
    min_interval: Duration,
    state: Mutex<DebounceState>,
}

/// A `Notifier` decorator that coalesces bursts into rate-limited batches.
#[derive(Clone)]
pub struct DebouncedNotifier {
    shared: Arc<Shared>,
}

impl DebouncedNotifier {
    /// Wraps `downstream` with a rate window of `min_interval`.
    ///
    /// A zero interval selects the 5 s default; anything below one second is
    /// clamped up to one second. The window starts closed: a burst arriving
    /// right after startup coalesces into the first flush.
    pub fn new(downstream: Arc<dyn Notifier>, min_interval: Duration) -> Self {
        let min_interval = if min_interval.is_zero() {
            DEFAULT_MIN_INTERVAL
        } else {
            min_interval.max(MIN_ALLOWED_INTERVAL)
        };
        Self {
            shared: Arc::new(Shared {
                downstream,
                min_interval,
                state: Mutex::new(DebounceState {
                    pending: Vec::new(),
                    window_start: Instant::now(),
                    timer: None,
                    closed: false,
                }),
            }),
        }
    }

    /// The effective rate window after normalization.
    pub fn min_interval(&self) -> Duration {
        self.shared.min_interval
    }

    /// Shuts the stage down: cancels the pending timer and flushes any
    /// buffered events once. Sends arriving after close are dropped with a
    /// warning. Draining (rather than discarding) is deliberate: events
    /// observed before shutdown should not vanish silently.
    pub async fn close(&self) {
        let (timer, batch) = {
            let mut state = self.shared.state.lock().unwrap();
            state.closed = true;
            (state.timer.take(), std::mem::take(&mut state.pending))
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        if !batch.is_empty() {
            debug!(count = batch.len(), "flushing pending notifications on close");
            if let Err(e) = self.shared.downstream.notify_batch(&batch).await {
                error!(error = %e, "failed to flush pending notifications on close");
            }
        }
    }

    /// Buffers `events`, returning a batch to deliver right now when the
    /// rate window allows it. Arms the flush timer otherwise. Never awaits;
    /// the lock is confined to this function.
    fn buffer_or_take(&self, events: Vec<Event>) -> Option<Vec<Event>> {
        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            warn!(count = events.len(), "notifier closed, dropping events");
            return None;
        }
        state.pending.extend(events);

        let elapsed = state.window_start.elapsed();
        if elapsed >= self.shared.min_interval {
            state.window_start = Instant::now();
            return Some(std::mem::take(&mut state.pending));
        }

        if state.timer.is_none() {
            let deadline = state.window_start + self.shared.min_interval;
            let shared = Arc::clone(&self.shared);
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                shared.fire().await;
            }));
        }
        None
    }
}

impl Shared {
    /// Timer callback: drains the buffer and delivers it as one batch.
    /// Serializes against the consumer through the state lock.
    async fn fire(self: Arc<Self>) {
        let batch = {
            let mut state = self.state.lock().unwrap();
            state.timer = None;
            if state.closed || state.pending.is_empty() {
                return;
            }
            std::mem::take(&mut state.pending)
        };
        debug!(count = batch.len(), "debounce window elapsed, flushing batch");
        if let Err(e) = self.downstream.notify_batch(&batch).await {
            error!(error = %e, "failed to deliver debounced batch");
        }
    }
}

#[async_trait]
impl Notifier for DebouncedNotifier {
    fn name(&self) -> &str {
        "debounce"
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        match self.buffer_or_take(vec![event.clone()]) {
            Some(batch) => self.shared.downstream.notify_batch(&batch).await,
            None => Ok(()),
        }
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        match self.buffer_or_take(events.to_vec()) {
            Some(batch) => self.shared.downstream.notify_batch(&batch).await,
            None => Ok(()),
        }
    }
}
