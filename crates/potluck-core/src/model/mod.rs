//! Event planning data model.
//!
//! [`EventState`] is the complete snapshot of one event: the root record plus
//! five ordered child collections. Children have no lifecycle of their own;
//! they exist only inside a snapshot, and every change produces a new
//! snapshot (see [`ops`]).
//!
//! # Field names
//!
//! Serde field names are the long vocabulary names the link codec shortens
//! (see [`crate::codec::keys`]). Field declaration order is also the order
//! keys are emitted in tokens, which matches the browser widget's object
//! construction order. Do not reorder fields.
//!
//! The browser's local-storage mirror historically suffixed the collection
//! names with `_ev2025`; those spellings are accepted on input.

pub mod ops;
pub mod timestamp;
pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use ops::NewEvent;
pub use validate::{Violation, repair, validate};

/// Complete snapshot of one event's planning data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventState {
    #[serde(default)]
    pub id: String,

    /// Human-shareable eight-symbol lookup key.
    #[serde(default)]
    pub event_code: String,

    #[serde(default)]
    pub name: String,

    /// When the event takes place (the first candidate for multi-date events).
    #[serde(with = "timestamp")]
    pub event_date: DateTime<Utc>,

    /// Optional password marker. Never set by link-only events.
    #[serde(default)]
    pub password_hash: Option<String>,

    #[serde(with = "timestamp")]
    pub expires_at: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    /// Whether participants vote on [`Self::proposed_dates`].
    #[serde(rename = "isMultiDay", default)]
    pub is_multi_day: bool,

    #[serde(default)]
    pub proposed_dates: Vec<DateOption>,

    #[serde(default, alias = "event_items_ev2025")]
    pub event_items: Vec<Item>,

    #[serde(default, alias = "event_assignments_ev2025")]
    pub event_assignments: Vec<Assignment>,

    #[serde(default, alias = "event_activities_ev2025")]
    pub event_activities: Vec<Activity>,

    #[serde(default)]
    pub event_date_votes: Vec<DateVote>,
}

/// Something a participant can bring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Owning [`EventState::id`].
    #[serde(default)]
    pub event_id: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Who brings an item. At most one per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub person_name: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A proposed activity with its voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Always `voters.len()`; kept on the wire for compatibility.
    #[serde(default)]
    pub votes: u32,
    /// Voter names, each at most once, in voting order.
    #[serde(default)]
    pub voters: Vec<String>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A candidate date of a multi-date event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOption {
    #[serde(default)]
    pub id: String,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
}

/// One participant's vote for one candidate date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateVote {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date_id: String,
    #[serde(default)]
    pub voter_name: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}
