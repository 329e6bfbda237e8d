//! Fan-out dispatch to multiple notification channels.
//!
//! `MultiNotifier` delivers one event (or one flushed batch) to every
//! configured channel. Channels fail independently: every channel is always
//! invoked, failures are collected, and the caller receives a single
//! composite error naming the channels that failed. Deliveries that already
//! succeeded are not retried or rolled back.
//!
//! `MultiNotifier` is itself a `Notifier`, so dispatchers nest: the
//! application uses this to keep the console immediate while remote
//! channels share one debounced sub-dispatcher.

use crate::core::{Event, Notifier};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// One channel's failure inside a fan-out dispatch.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: anyhow::Error,
}

/// Composite error enumerating every channel that failed during a dispatch.
#[derive(Debug)]
pub struct DispatchError {
    pub failures: Vec<ChannelFailure>,
}

impl DispatchError {
    /// Names of the failed channels, in dispatch order.
    pub fn channels(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.channel.as_str()).collect()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivery failed for {} channel(s): ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.channel, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

/// What a single dispatch carries: one event or a flushed batch.
#[derive(Clone, Copy)]
enum Payload<'a> {
    One(&'a Event),
    Batch(&'a [Event]),
}

/// Fans notifications out to an ordered set of channels.
pub struct MultiNotifier {
    name: &'static str,
    channels: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self::named("fanout", channels)
    }

    /// A named dispatcher; useful when dispatchers nest and failures must be
    /// attributable to the right layer.
    pub fn named(name: &'static str, channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { name, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Invokes every channel concurrently and waits for all of them
    /// (join semantics: no partial early return). Channels share no mutable
    /// state and each renders its own copy, so concurrent fan-out is safe.
    async fn deliver(&self, payload: Payload<'_>) -> Result<()> {
        let results = join_all(self.channels.iter().map(|channel| async move {
            let outcome = match payload {
                Payload::One(event) => channel.notify(event).await,
                Payload::Batch(events) => channel.notify_batch(events).await,
            };
            (channel.name().to_string(), outcome)
        }))
        .await;

        let mut failures = Vec::new();
        for (channel, outcome) in results {
            match outcome {
                Ok(()) => debug!(channel = %channel, "notification delivered"),
                Err(error) => {
                    error!(channel = %channel, error = %error, "channel delivery failed");
                    failures.push(ChannelFailure { channel, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures }.into())
        }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    fn name(&self) -> &str {
        self.name
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        self.deliver(Payload::One(event)).await
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        self.deliver(Payload::Batch(events)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        name: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingChannel {
        fn new(name: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn outcome(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("simulated outage")
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for CountingChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn notify(&self, _event: &Event) -> Result<()> {
            self.outcome()
        }

        async fn notify_batch(&self, _events: &[Event]) -> Result<()> {
            self.outcome()
        }
    }

    #[tokio::test]
    async fn all_channels_succeeding_is_ok() {
        let a = CountingChannel::new("a", false);
        let b = CountingChannel::new("b", false);
        let dispatcher = MultiNotifier::new(vec![a.clone(), b.clone()]);

        dispatcher
            .notify(&Event::new("container", "start"))
            .await
            .unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_block_the_others() {
        let one = CountingChannel::new("one", false);
        let two = CountingChannel::new("two", true);
        let three = CountingChannel::new("three", false);
        let dispatcher =
            MultiNotifier::new(vec![one.clone(), two.clone(), three.clone()]);

        let err = dispatcher
            .notify(&Event::new("container", "die"))
            .await
            .unwrap_err();

        // Every channel was invoked despite the failure in the middle.
        assert_eq!(one.calls(), 1);
        assert_eq!(two.calls(), 1);
        assert_eq!(three.calls(), 1);

        let dispatch_err = err.downcast_ref::<DispatchError>().unwrap();
        assert_eq!(dispatch_err.channels(), vec!["two"]);
        assert!(err.to_string().contains("two: simulated outage"));
        assert!(!err.to_string().contains("one:"));
    }

    #[tokio::test]
    async fn batches_reach_every_channel() {
        let a = CountingChannel::new("a", false);
        let b = CountingChannel::new("b", false);
        let dispatcher = MultiNotifier::new(vec![a.clone(), b.clone()]);

        let events = vec![
            Event::new("container", "start"),
            Event::new("container", "die"),
        ];
        dispatcher.notify_batch(&events).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn dispatchers_compose_recursively() {
        let local = CountingChannel::new("console", false);
        let remote_ok = CountingChannel::new("slack", false);
        let remote_bad = CountingChannel::new("telegram", true);
        let remote = Arc::new(MultiNotifier::named(
            "remote",
            vec![remote_ok.clone(), remote_bad.clone()],
        ));
        let top = MultiNotifier::new(vec![local.clone(), remote]);

        let err = top
            .notify(&Event::new("container", "start"))
            .await
            .unwrap_err();

        assert_eq!(local.calls(), 1);
        assert_eq!(remote_ok.calls(), 1);
        assert_eq!(remote_bad.calls(), 1);

        let dispatch_err = err.downcast_ref::<DispatchError>().unwrap();
        assert_eq!(dispatch_err.channels(), vec!["remote"]);
        assert!(err.to_string().contains("telegram: simulated outage"));
    }

    #[tokio::test]
    async fn empty_dispatcher_is_a_no_op() {
        let dispatcher = MultiNotifier::new(Vec::new());
        dispatcher
            .notify(&Event::new("container", "start"))
            .await
            .unwrap();
        assert_eq!(dispatcher.channel_count(), 0);
    }
}
