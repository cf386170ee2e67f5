//! Periodic re-publishing.
//!
//! While an event is open, its latest snapshot is re-published on a fixed
//! interval so the share link and the store mirror never lag far behind the
//! edits. At most one publish runs at a time: a publish requested while
//! another is in flight is skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::{CoreError, StoreError};
use crate::link::ShareLink;
use crate::model::EventState;
use crate::pipeline::publish;
use crate::store::EventStore;

/// Default re-publish interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Result of [`Publisher::publish_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(ShareLink),
    /// Another publish was in flight; nothing was done.
    Skipped,
}

/// Publishes snapshots to a store, one at a time.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn EventStore>,
    origin: String,
    in_flight: Arc<AtomicBool>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("origin", &self.origin)
            .field("in_flight", &self.is_publishing())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when the publish work ends, including on panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Publisher {
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, origin: impl Into<String>) -> Self {
        Self {
            store,
            origin: origin.into(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_publishing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Publish `state` on the blocking pool unless a publish is in flight.
    ///
    /// # Errors
    ///
    /// Returns the [`CoreError`] of the underlying [`publish`].
    pub async fn publish_once(&self, state: EventState) -> Result<PublishOutcome, CoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(code = %state.event_code, "publish already in flight, skipping");
            return Ok(PublishOutcome::Skipped);
        }
        // The guard moves into the blocking closure so the flag stays set
        // until the store write finishes, even if this future is dropped.
        let guard = InFlight(Arc::clone(&self.in_flight));
        let store = Arc::clone(&self.store);
        let origin = self.origin.clone();

        let link = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            publish(&state, store.as_ref(), &origin)
        })
        .await
        .map_err(|err| StoreError::Backend(format!("publish task failed: {err}")))??;

        Ok(PublishOutcome::Published(link))
    }
}

/// Background task re-publishing the latest snapshot on every tick.
#[derive(Debug)]
pub struct AutoPublisher {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    links: watch::Receiver<Option<ShareLink>>,
}

impl AutoPublisher {
    /// Start re-publishing whatever `snapshots` currently holds every
    /// `interval`. The first publish happens one interval after spawning.
    /// Ticks missed while a publish is slow are skipped.
    #[must_use]
    pub fn spawn(
        publisher: Publisher,
        mut snapshots: watch::Receiver<EventState>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (links_tx, links) = watch::channel(None);

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "auto-publish started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("auto-publish stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let state = snapshots.borrow_and_update().clone();
                        match publisher.publish_once(state).await {
                            Ok(PublishOutcome::Published(link)) => {
                                links_tx.send_replace(Some(link));
                            }
                            Ok(PublishOutcome::Skipped) => {}
                            Err(err) => error!(error = %err, code = %err.code(), "auto-publish failed"),
                        }
                    }
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            handle,
            links,
        }
    }

    /// The most recent link the task produced.
    #[must_use]
    pub fn links(&self) -> watch::Receiver<Option<ShareLink>> {
        self.links.clone()
    }

    /// Stop the task and wait for it to finish. A publish in progress
    /// completes first.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            error!(error = %err, "auto-publish task ended abnormally");
        }
    }
}
