//! Invariant checks for decoded snapshots.
//!
//! Snapshots built through [`super::ops`] always satisfy the model
//! invariants. Snapshots arriving from a link or a hand-edited store file
//! may not. [`validate`] reports every break; [`repair`] fixes the ones that
//! have an unambiguous resolution and leaves dangling references alone.

use std::collections::HashSet;
use std::fmt;

use super::EventState;
use super::ops::vote_count;

/// A single invariant break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `votes` disagrees with the number of voters.
    VoteCountMismatch {
        activity_id: String,
        votes: u32,
        voters: usize,
    },
    /// The same voter appears twice on one activity.
    DuplicateVoter { activity_id: String, voter: String },
    /// An item has more than one assignment.
    DuplicateAssignment { item_id: String, count: usize },
    /// One voter voted twice for the same date.
    DuplicateDateVote { date_id: String, voter: String },
    /// An assignment points at an item that does not exist.
    OrphanAssignment {
        assignment_id: String,
        item_id: String,
    },
    /// A date vote points at a date option that does not exist.
    OrphanDateVote { vote_id: String, date_id: String },
    /// Candidate dates exist but the event is not flagged multi-date.
    DatesOnSingleDayEvent { count: usize },
}

impl Violation {
    /// Whether [`repair`] resolves this violation.
    #[must_use]
    pub const fn is_repairable(&self) -> bool {
        !matches!(
            self,
            Self::OrphanAssignment { .. } | Self::OrphanDateVote { .. }
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoteCountMismatch {
                activity_id,
                votes,
                voters,
            } => write!(
                f,
                "activity {activity_id} counts {votes} votes but lists {voters} voters"
            ),
            Self::DuplicateVoter { activity_id, voter } => {
                write!(f, "activity {activity_id} lists voter {voter:?} twice")
            }
            Self::DuplicateAssignment { item_id, count } => {
                write!(f, "item {item_id} has {count} assignments")
            }
            Self::DuplicateDateVote { date_id, voter } => {
                write!(f, "{voter:?} voted for date {date_id} more than once")
            }
            Self::OrphanAssignment {
                assignment_id,
                item_id,
            } => write!(
                f,
                "assignment {assignment_id} references unknown item {item_id}"
            ),
            Self::OrphanDateVote { vote_id, date_id } => {
                write!(f, "date vote {vote_id} references unknown date {date_id}")
            }
            Self::DatesOnSingleDayEvent { count } => {
                write!(f, "{count} proposed dates on a single-date event")
            }
        }
    }
}

/// Report every invariant break in `state`, in collection order.
#[must_use]
pub fn validate(state: &EventState) -> Vec<Violation> {
    let mut out = Vec::new();

    for activity in &state.event_activities {
        let mut seen = HashSet::new();
        for voter in &activity.voters {
            if !seen.insert(voter.as_str()) {
                out.push(Violation::DuplicateVoter {
                    activity_id: activity.id.clone(),
                    voter: voter.clone(),
                });
            }
        }
        if activity.votes != vote_count(activity.voters.len()) {
            out.push(Violation::VoteCountMismatch {
                activity_id: activity.id.clone(),
                votes: activity.votes,
                voters: activity.voters.len(),
            });
        }
    }

    let item_ids: HashSet<&str> = state.event_items.iter().map(|i| i.id.as_str()).collect();
    let mut reported = HashSet::new();
    for assignment in &state.event_assignments {
        if !item_ids.contains(assignment.item_id.as_str()) {
            out.push(Violation::OrphanAssignment {
                assignment_id: assignment.id.clone(),
                item_id: assignment.item_id.clone(),
            });
        }
        let count = state
            .event_assignments
            .iter()
            .filter(|a| a.item_id == assignment.item_id)
            .count();
        if count > 1 && reported.insert(assignment.item_id.as_str()) {
            out.push(Violation::DuplicateAssignment {
                item_id: assignment.item_id.clone(),
                count,
            });
        }
    }

    let date_ids: HashSet<&str> = state.proposed_dates.iter().map(|d| d.id.as_str()).collect();
    let mut pairs = HashSet::new();
    for vote in &state.event_date_votes {
        if !date_ids.contains(vote.date_id.as_str()) {
            out.push(Violation::OrphanDateVote {
                vote_id: vote.id.clone(),
                date_id: vote.date_id.clone(),
            });
        }
        if !pairs.insert((vote.date_id.as_str(), vote.voter_name.as_str())) {
            out.push(Violation::DuplicateDateVote {
                date_id: vote.date_id.clone(),
                voter: vote.voter_name.clone(),
            });
        }
    }

    if !state.is_multi_day && !state.proposed_dates.is_empty() {
        out.push(Violation::DatesOnSingleDayEvent {
            count: state.proposed_dates.len(),
        });
    }

    out
}

/// Fix every repairable violation.
///
/// - voters are deduplicated keeping the first occurrence, then `votes` is
///   recomputed;
/// - of several assignments for one item the last one wins, matching the
///   replace-on-assign rule;
/// - of several votes by one voter for one date the first one wins;
/// - candidate dates on a single-date event turn the flag on.
///
/// Orphan references are left in place.
#[must_use]
pub fn repair(mut state: EventState) -> EventState {
    for activity in &mut state.event_activities {
        let mut seen = HashSet::new();
        activity.voters.retain(|v| seen.insert(v.clone()));
        activity.votes = vote_count(activity.voters.len());
    }

    let mut kept_items = HashSet::new();
    let mut assignments: Vec<_> = state
        .event_assignments
        .into_iter()
        .rev()
        .filter(|a| kept_items.insert(a.item_id.clone()))
        .collect();
    assignments.reverse();
    state.event_assignments = assignments;

    let mut pairs = HashSet::new();
    state
        .event_date_votes
        .retain(|v| pairs.insert((v.date_id.clone(), v.voter_name.clone())));

    if !state.proposed_dates.is_empty() {
        state.is_multi_day = true;
    }

    state
}
