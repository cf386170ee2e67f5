//! Adopting an incoming snapshot.
//!
//! Links carry complete snapshots, never deltas, and there is no server to
//! arbitrate between them. When two people edit from the same link and both
//! re-share, whichever link is opened last wins outright. [`adopt`] makes
//! that explicit: it always takes the incoming snapshot and reports what
//! the replaced one had that the incoming one lacks, so a front end can
//! warn before the loss goes unnoticed.

use std::collections::HashSet;

use tracing::warn;

use crate::model::{Activity, Assignment, DateVote, EventState, Item};

/// An activity vote present before adoption and missing after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostVote {
    pub activity_id: String,
    pub activity_name: String,
    pub voter: String,
}

/// What the replaced snapshot had that the adopted one does not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub items: Vec<Item>,
    pub assignments: Vec<Assignment>,
    pub activities: Vec<Activity>,
    pub activity_votes: Vec<LostVote>,
    pub date_votes: Vec<DateVote>,
}

impl SnapshotDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.assignments.is_empty()
            && self.activities.is_empty()
            && self.activity_votes.is_empty()
            && self.date_votes.is_empty()
    }

    /// Total number of discarded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
            + self.assignments.len()
            + self.activities.len()
            + self.activity_votes.len()
            + self.date_votes.len()
    }
}

/// The adopted snapshot plus what adopting it discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adoption {
    pub state: EventState,
    pub discarded: SnapshotDiff,
}

/// Replace `current` with `incoming`.
#[must_use]
pub fn adopt(current: Option<&EventState>, incoming: EventState) -> Adoption {
    let discarded = current.map_or_else(SnapshotDiff::default, |current| {
        if current.event_code != incoming.event_code {
            warn!(
                current = %current.event_code,
                incoming = %incoming.event_code,
                "adopting a snapshot of a different event"
            );
        }
        diff(current, &incoming)
    });

    if !discarded.is_empty() {
        warn!(
            code = %incoming.event_code,
            discarded = discarded.len(),
            "adopted snapshot drops local changes"
        );
    }

    Adoption {
        state: incoming,
        discarded,
    }
}

/// Everything in `before` that `after` lacks, matched by id.
#[must_use]
pub fn diff(before: &EventState, after: &EventState) -> SnapshotDiff {
    fn missing<T: Clone>(before: &[T], after: &[T], id: impl Fn(&T) -> &str) -> Vec<T> {
        let kept: HashSet<&str> = after.iter().map(&id).collect();
        before
            .iter()
            .filter(|entry| !kept.contains(id(*entry)))
            .cloned()
            .collect()
    }

    let mut activity_votes = Vec::new();
    for old in &before.event_activities {
        let Some(new) = after.activity(&old.id) else {
            continue;
        };
        for voter in &old.voters {
            if !new.voters.contains(voter) {
                activity_votes.push(LostVote {
                    activity_id: old.id.clone(),
                    activity_name: old.name.clone(),
                    voter: voter.clone(),
                });
            }
        }
    }

    SnapshotDiff {
        items: missing(&before.event_items, &after.event_items, |i| i.id.as_str()),
        assignments: missing(&before.event_assignments, &after.event_assignments, |a| a.id.as_str()),
        activities: missing(&before.event_activities, &after.event_activities, |a| a.id.as_str()),
        activity_votes,
        date_votes: missing(&before.event_date_votes, &after.event_date_votes, |v| v.id.as_str()),
    }
}
