//! `potluck watch` — keep an event's link fresh until interrupted.
//!
//! Publishes once right away, then hands the snapshot to an
//! [`AutoPublisher`]. The stored copy is re-read on the same interval so
//! edits made by other `potluck` invocations flow into the next publish.
//! A line is printed whenever the link changes.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use potluck_core::model::EventState;
use potluck_core::publish::{AutoPublisher, PublishOutcome, Publisher};
use potluck_core::store::EventStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{Published, Session, render_published};
use crate::output::fail;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Event code or share link.
    pub target: String,

    /// Seconds between publishes. Defaults to `publish_interval_secs`.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration: Option<u64>,
}

pub fn run_watch(args: &WatchArgs, session: &Session) -> anyhow::Result<()> {
    let state = session.load(&args.target)?;
    let interval = args
        .interval
        .map_or_else(|| session.config.config.publish_interval(), Duration::from_secs);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_event(
        state,
        interval,
        args.duration.map(Duration::from_secs),
        session,
    ))
}

async fn watch_event(
    state: EventState,
    interval: Duration,
    limit: Option<Duration>,
    session: &Session,
) -> anyhow::Result<()> {
    let code = state.event_code.clone();
    let store: Arc<dyn EventStore> = session.store.clone();
    let publisher = Publisher::new(Arc::clone(&store), session.config.origin.clone());

    let mut last_link = None;
    match publisher.publish_once(state.clone()).await {
        Ok(PublishOutcome::Published(link)) => {
            announce(session, &state, &link.to_string())?;
            last_link = Some(link.to_string());
        }
        Ok(PublishOutcome::Skipped) => {}
        Err(err) => return fail(session.output, err),
    }

    let (snapshots, snapshot_rx) = watch::channel(state);
    let auto = AutoPublisher::spawn(publisher, snapshot_rx, interval);
    let mut links = auto.links();

    let mut reload = tokio::time::interval(interval);
    reload.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(code = %code, interval_secs = interval.as_secs(), "watching event");
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    warn!(error = %err, "could not listen for Ctrl-C");
                }
                break;
            }
            () = &mut deadline => break,
            changed = links.changed() => {
                if changed.is_err() {
                    break;
                }
                let link = links.borrow_and_update().as_ref().map(ToString::to_string);
                if let Some(link) = link
                    && last_link.as_deref() != Some(link.as_str())
                {
                    announce(session, &snapshots.borrow(), &link)?;
                    last_link = Some(link);
                }
            }
            _ = reload.tick() => {
                let store = Arc::clone(&store);
                let code = code.clone();
                match tokio::task::spawn_blocking(move || store.get(&code)).await {
                    Ok(Ok(Some(stored))) => {
                        let changed = snapshots.send_if_modified(|current| {
                            if *current == stored {
                                false
                            } else {
                                *current = stored;
                                true
                            }
                        });
                        if changed {
                            debug!("stored copy changed, publishing it next");
                        }
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(err)) => warn!(error = %err, "could not re-read stored copy"),
                    Err(err) => warn!(error = %err, "store reload task failed"),
                }
            }
        }
    }

    auto.stop().await;
    info!(code = %code, "stopped watching");
    Ok(())
}

fn announce(session: &Session, state: &EventState, link: &str) -> anyhow::Result<()> {
    render_published(
        session.output,
        &Published {
            action: "published".to_string(),
            event_code: state.event_code.clone(),
            name: state.name.clone(),
            link: link.to_string(),
        },
    )
}
