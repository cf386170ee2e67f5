//! `potluck open` — adopt the snapshot a share link carries.
//!
//! The link wins over whatever the local store holds for the same event.
//! Anything the stored copy had that the link lacks is reported, then the
//! adopted snapshot replaces the stored one.

use chrono::Utc;
use clap::Args;
use potluck_core::link::ShareLink;
use potluck_core::merge::{SnapshotDiff, adopt};
use potluck_core::pipeline::load_event;
use potluck_core::store::EventStore;
use serde::Serialize;
use std::io::Write;

use super::{EventView, Session};
use crate::output::{fail, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Share link as received.
    pub url: String,
}

#[derive(Debug, Serialize)]
struct Opened {
    event: EventView,
    discarded: Discarded,
}

/// Names of what the stored copy had and the link does not.
#[derive(Debug, Default, Serialize)]
struct Discarded {
    items: Vec<String>,
    assignments: Vec<String>,
    activities: Vec<String>,
    activity_votes: Vec<String>,
    date_votes: Vec<String>,
}

impl Discarded {
    fn from_diff(diff: &SnapshotDiff) -> Self {
        Self {
            items: diff.items.iter().map(|i| i.name.clone()).collect(),
            assignments: diff
                .assignments
                .iter()
                .map(|a| format!("{} ({})", a.person_name, a.item_id))
                .collect(),
            activities: diff.activities.iter().map(|a| a.name.clone()).collect(),
            activity_votes: diff
                .activity_votes
                .iter()
                .map(|v| format!("{} → {}", v.voter, v.activity_name))
                .collect(),
            date_votes: diff
                .date_votes
                .iter()
                .map(|v| format!("{} ({})", v.voter_name, v.date_id))
                .collect(),
        }
    }

    fn lines(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            ("item", &self.items),
            ("assignment", &self.assignments),
            ("activity", &self.activities),
            ("activity vote", &self.activity_votes),
            ("date vote", &self.date_votes),
        ]
        .into_iter()
        .flat_map(|(kind, names)| names.iter().map(move |name| (kind, name)))
    }
}

pub fn run_open(args: &OpenArgs, session: &Session) -> anyhow::Result<()> {
    let output = session.output;
    let link = ShareLink::parse(&args.url).or_else(|err| fail(output, err))?;
    let now = Utc::now();

    let stored = session
        .store
        .get(&link.event_code)
        .or_else(|err| fail(output, err))?;
    let incoming = load_event(&link.event_code, link.token.as_deref(), session.store.as_ref(), now)
        .or_else(|err| fail(output, err))?;

    let adoption = adopt(stored.as_ref(), incoming);
    session
        .store
        .put(&link.event_code, &adoption.state)
        .or_else(|err| fail(output, err))?;

    let opened = Opened {
        event: EventView::new(&adoption.state, now),
        discarded: Discarded::from_diff(&adoption.discarded),
    };
    render_mode(
        output,
        &opened,
        |o, w| {
            writeln!(w, "{}  {}", o.event.event_code, o.event.name)?;
            for (kind, name) in o.discarded.lines() {
                writeln!(w, "discarded  {kind}  {name}")?;
            }
            Ok(())
        },
        |o, w| {
            writeln!(w, "✓ opened {} ({})", o.event.name, o.event.event_code)?;
            let mut lost = o.discarded.lines().peekable();
            if lost.peek().is_some() {
                writeln!(w)?;
                pretty_section(w, "Replaced local changes")?;
                for (kind, name) in lost {
                    writeln!(w, "  {kind:<14} {name}")?;
                }
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use potluck_core::merge::LostVote;

    #[test]
    fn discarded_lists_every_kind() {
        let diff = SnapshotDiff {
            activity_votes: vec![LostVote {
                activity_id: "a1".into(),
                activity_name: "Volleyball".into(),
                voter: "Max".into(),
            }],
            ..SnapshotDiff::default()
        };
        let discarded = Discarded::from_diff(&diff);
        let lines: Vec<_> = discarded.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "activity vote");
        assert_eq!(lines[0].1, "Max → Volleyball");
    }
}
