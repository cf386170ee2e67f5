//! Copy-on-write mutations and read helpers for [`EventState`].
//!
//! Every mutation borrows the current snapshot and returns a brand-new one;
//! a snapshot that has been published is never edited in place. Mutations
//! that would break an invariant are either rejected with a
//! [`MutationError`] or resolved by the rule the invariant names:
//!
//! - assigning an item replaces any previous assignment of that item;
//! - a second activity vote by the same voter is a no-op;
//! - a second date vote by the same voter is a no-op for [`EventState::vote_date`]
//!   and removes the vote for [`EventState::toggle_date_vote`].
//!
//! Names and voter names are trimmed before use.

use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::{Activity, Assignment, DateOption, DateVote, EventState, Item};
use crate::error::MutationError;
use crate::id::IdSource;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Input for [`EventState::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub event_date: DateTime<Utc>,
    /// Candidate dates; a non-empty list makes the event multi-date.
    pub proposed_dates: Vec<DateTime<Utc>>,
    pub password_hash: Option<String>,
}

impl NewEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, event_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            event_date,
            proposed_dates: Vec::new(),
            password_hash: None,
        }
    }

    #[must_use]
    pub fn with_proposed_dates(mut self, dates: Vec<DateTime<Utc>>) -> Self {
        self.proposed_dates = dates;
        self
    }
}

fn clean(raw: &str, field: &'static str) -> Result<String, MutationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MutationError::EmptyName { field });
    }
    Ok(trimmed.to_string())
}

impl EventState {
    /// Create a fresh event with empty collections.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::EmptyName`] if the name is blank.
    pub fn create(
        new: NewEvent,
        ids: &mut impl IdSource,
        retention: Duration,
    ) -> Result<Self, MutationError> {
        let name = clean(&new.name, "event name")?;
        let now = ids.now();
        let proposed_dates: Vec<DateOption> = new
            .proposed_dates
            .into_iter()
            .map(|date| DateOption {
                id: ids.next_id(),
                date,
            })
            .collect();

        Ok(Self {
            id: ids.next_id(),
            event_code: ids.next_event_code(),
            name,
            event_date: new.event_date,
            password_hash: new.password_hash.filter(|p| !p.is_empty()),
            expires_at: now + retention,
            created_at: now,
            is_multi_day: !proposed_dates.is_empty(),
            proposed_dates,
            event_items: Vec::new(),
            event_assignments: Vec::new(),
            event_activities: Vec::new(),
            event_date_votes: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Items and assignments
    // -----------------------------------------------------------------------

    /// Append an item.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::EmptyName`] if the name is blank.
    pub fn add_item(&self, name: &str, ids: &mut impl IdSource) -> Result<Self, MutationError> {
        let item = Item {
            id: ids.next_id(),
            name: clean(name, "item name")?,
            event_id: self.id.clone(),
            created_at: Some(ids.now()),
        };
        let mut next = self.clone();
        next.event_items.push(item);
        Ok(next)
    }

    /// Remove an item together with its assignment.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ItemNotFound`] for an unknown id.
    pub fn remove_item(&self, item_id: &str) -> Result<Self, MutationError> {
        self.require_item(item_id)?;
        let mut next = self.clone();
        next.event_items.retain(|item| item.id != item_id);
        next.event_assignments.retain(|a| a.item_id != item_id);
        Ok(next)
    }

    /// Assign an item to a person, replacing any existing assignment.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ItemNotFound`] for an unknown id and
    /// [`MutationError::EmptyName`] for a blank person.
    pub fn assign_item(
        &self,
        item_id: &str,
        person: &str,
        ids: &mut impl IdSource,
    ) -> Result<Self, MutationError> {
        self.require_item(item_id)?;
        let person_name = clean(person, "person name")?;
        let mut next = self.clone();
        next.event_assignments.retain(|a| a.item_id != item_id);
        next.event_assignments.push(Assignment {
            id: ids.next_id(),
            item_id: item_id.to_string(),
            person_name,
            created_at: Some(ids.now()),
        });
        Ok(next)
    }

    /// Drop the assignment of an item. Unassigned items are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ItemNotFound`] for an unknown id.
    pub fn unassign_item(&self, item_id: &str) -> Result<Self, MutationError> {
        self.require_item(item_id)?;
        let mut next = self.clone();
        next.event_assignments.retain(|a| a.item_id != item_id);
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Activities
    // -----------------------------------------------------------------------

    /// Append an activity with no votes.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::EmptyName`] for a blank name and
    /// [`MutationError::DuplicateActivity`] if the name is already proposed.
    pub fn add_activity(&self, name: &str, ids: &mut impl IdSource) -> Result<Self, MutationError> {
        let name = clean(name, "activity name")?;
        if self.event_activities.iter().any(|a| a.name == name) {
            return Err(MutationError::DuplicateActivity(name));
        }
        let mut next = self.clone();
        next.event_activities.push(Activity {
            id: ids.next_id(),
            name,
            votes: 0,
            voters: Vec::new(),
            created_at: Some(ids.now()),
        });
        Ok(next)
    }

    /// Remove an activity and its votes.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ActivityNotFound`] for an unknown id.
    pub fn remove_activity(&self, activity_id: &str) -> Result<Self, MutationError> {
        self.require_activity(activity_id)?;
        let mut next = self.clone();
        next.event_activities.retain(|a| a.id != activity_id);
        Ok(next)
    }

    /// Record a vote. A voter already on the list is not added again.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ActivityNotFound`] for an unknown id and
    /// [`MutationError::EmptyName`] for a blank voter.
    pub fn vote_activity(&self, activity_id: &str, voter: &str) -> Result<Self, MutationError> {
        self.require_activity(activity_id)?;
        let voter = clean(voter, "voter name")?;
        let mut next = self.clone();
        if let Some(activity) = next.event_activities.iter_mut().find(|a| a.id == activity_id) {
            if activity.voters.contains(&voter) {
                debug!(activity = activity_id, voter = %voter, "duplicate activity vote ignored");
            } else {
                activity.voters.push(voter);
            }
            activity.votes = vote_count(activity.voters.len());
        }
        Ok(next)
    }

    /// Withdraw a vote. Withdrawing a vote that was never cast is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ActivityNotFound`] for an unknown id and
    /// [`MutationError::EmptyName`] for a blank voter.
    pub fn unvote_activity(&self, activity_id: &str, voter: &str) -> Result<Self, MutationError> {
        self.require_activity(activity_id)?;
        let voter = clean(voter, "voter name")?;
        let mut next = self.clone();
        if let Some(activity) = next.event_activities.iter_mut().find(|a| a.id == activity_id) {
            activity.voters.retain(|v| *v != voter);
            activity.votes = vote_count(activity.voters.len());
        }
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Date votes
    // -----------------------------------------------------------------------

    /// Vote for a candidate date. A repeated vote is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::DateNotFound`] for an unknown date option and
    /// [`MutationError::EmptyName`] for a blank voter.
    pub fn vote_date(
        &self,
        date_id: &str,
        voter: &str,
        ids: &mut impl IdSource,
    ) -> Result<Self, MutationError> {
        self.require_date(date_id)?;
        let voter_name = clean(voter, "voter name")?;
        if self.has_date_vote(date_id, &voter_name) {
            debug!(date = date_id, voter = %voter_name, "duplicate date vote ignored");
            return Ok(self.clone());
        }
        let mut next = self.clone();
        next.event_date_votes.push(DateVote {
            id: ids.next_id(),
            date_id: date_id.to_string(),
            voter_name,
            created_at: Some(ids.now()),
        });
        Ok(next)
    }

    /// Remove a voter's vote for a candidate date.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::DateNotFound`] for an unknown date option and
    /// [`MutationError::EmptyName`] for a blank voter.
    pub fn unvote_date(&self, date_id: &str, voter: &str) -> Result<Self, MutationError> {
        self.require_date(date_id)?;
        let voter_name = clean(voter, "voter name")?;
        let mut next = self.clone();
        next.event_date_votes
            .retain(|v| !(v.date_id == date_id && v.voter_name == voter_name));
        Ok(next)
    }

    /// Vote if the voter has not voted for this date yet, otherwise withdraw.
    ///
    /// # Errors
    ///
    /// Same as [`Self::vote_date`].
    pub fn toggle_date_vote(
        &self,
        date_id: &str,
        voter: &str,
        ids: &mut impl IdSource,
    ) -> Result<Self, MutationError> {
        if self.has_date_vote(date_id, voter.trim()) {
            self.unvote_date(date_id, voter)
        } else {
            self.vote_date(date_id, voter, ids)
        }
    }

    // -----------------------------------------------------------------------
    // Read helpers
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.event_items.iter().find(|i| i.id == item_id)
    }

    /// Find an item by exact name, first match wins.
    #[must_use]
    pub fn item_named(&self, name: &str) -> Option<&Item> {
        self.event_items.iter().find(|i| i.name == name.trim())
    }

    #[must_use]
    pub fn activity(&self, activity_id: &str) -> Option<&Activity> {
        self.event_activities.iter().find(|a| a.id == activity_id)
    }

    #[must_use]
    pub fn assignment_for(&self, item_id: &str) -> Option<&Assignment> {
        self.event_assignments.iter().find(|a| a.item_id == item_id)
    }

    #[must_use]
    pub fn has_date_vote(&self, date_id: &str, voter: &str) -> bool {
        self.event_date_votes
            .iter()
            .any(|v| v.date_id == date_id && v.voter_name == voter)
    }

    #[must_use]
    pub fn date_vote_count(&self, date_id: &str) -> usize {
        self.event_date_votes
            .iter()
            .filter(|v| v.date_id == date_id)
            .count()
    }

    #[must_use]
    pub fn date_voters(&self, date_id: &str) -> Vec<&str> {
        self.event_date_votes
            .iter()
            .filter(|v| v.date_id == date_id)
            .map(|v| v.voter_name.as_str())
            .collect()
    }

    /// Activities by descending vote count; ties keep insertion order.
    #[must_use]
    pub fn activities_by_votes(&self) -> Vec<&Activity> {
        let mut sorted: Vec<&Activity> = self.event_activities.iter().collect();
        sorted.sort_by_key(|a| Reverse(a.voters.len()));
        sorted
    }

    /// Candidate dates by descending vote count; ties keep insertion order.
    #[must_use]
    pub fn dates_by_votes(&self) -> Vec<(&DateOption, usize)> {
        let mut sorted: Vec<(&DateOption, usize)> = self
            .proposed_dates
            .iter()
            .map(|d| (d, self.date_vote_count(&d.id)))
            .collect();
        sorted.sort_by_key(|&(_, votes)| Reverse(votes));
        sorted
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole days until expiry, rounded down, so negative once expired.
    #[must_use]
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
    }

    fn require_item(&self, item_id: &str) -> Result<(), MutationError> {
        self.item(item_id)
            .map(|_| ())
            .ok_or_else(|| MutationError::ItemNotFound(item_id.to_string()))
    }

    fn require_activity(&self, activity_id: &str) -> Result<(), MutationError> {
        self.activity(activity_id)
            .map(|_| ())
            .ok_or_else(|| MutationError::ActivityNotFound(activity_id.to_string()))
    }

    fn require_date(&self, date_id: &str) -> Result<(), MutationError> {
        if self.proposed_dates.iter().any(|d| d.id == date_id) {
            Ok(())
        } else {
            Err(MutationError::DateNotFound(date_id.to_string()))
        }
    }
}

pub(crate) fn vote_count(voters: usize) -> u32 {
    u32::try_from(voters).unwrap_or(u32::MAX)
}
