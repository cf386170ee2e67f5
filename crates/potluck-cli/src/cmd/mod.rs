//! Command handlers and the plumbing they share.
//!
//! Every handler gets a [`Session`]: the resolved configuration, the file
//! store and the output mode. Mutating handlers follow the same shape:
//! [`Session::load`] the target, apply one copy-on-write operation,
//! [`Session::commit`] the result (publish + mirror) and print the new link.

pub mod activity;
pub mod cleanup;
pub mod create;
pub mod date;
pub mod decode;
pub mod item;
pub mod link;
pub mod open;
pub mod show;
pub mod watch;

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use potluck_core::config::EffectiveConfig;
use potluck_core::error::{CoreError, MutationError};
use potluck_core::link::ShareLink;
use potluck_core::model::{Activity, DateOption, EventState, Item};
use potluck_core::pipeline;
use potluck_core::store::FileStore;
use serde::Serialize;
use tracing::debug;

use crate::output::{OutputMode, fail, pretty_kv, render_mode};

/// Everything a command needs besides its own arguments.
pub struct Session {
    pub config: EffectiveConfig,
    pub store: Arc<FileStore>,
    pub output: OutputMode,
}

impl Session {
    pub fn new(config: EffectiveConfig, output: OutputMode) -> Self {
        let store = Arc::new(FileStore::new(config.store_path.clone()));
        Self {
            config,
            store,
            output,
        }
    }

    /// Resolve `target`, an event code or a share link.
    ///
    /// A link's token wins over the stored copy; a bare code reads the store.
    pub fn load(&self, target: &str) -> anyhow::Result<EventState> {
        let now = Utc::now();
        let result = if looks_like_url(target) {
            pipeline::load_link(target, self.store.as_ref(), now)
        } else {
            pipeline::load_event(&target.trim().to_ascii_uppercase(), None, self.store.as_ref(), now)
        };
        result.or_else(|err| fail(self.output, err))
    }

    /// Publish `state`: encode it, mirror it into the store and return the link.
    pub fn commit(&self, state: &EventState) -> anyhow::Result<ShareLink> {
        pipeline::publish(state, self.store.as_ref(), &self.config.origin)
            .or_else(|err| fail(self.output, err))
    }

    /// Apply a fallible mutation, rendering its error on failure.
    pub fn apply(
        &self,
        result: Result<EventState, MutationError>,
    ) -> anyhow::Result<EventState> {
        result.or_else(|err| fail(self.output, err))
    }

    /// Commit `state` and print the outcome of `action`.
    pub fn finish(&self, action: &str, state: &EventState) -> anyhow::Result<()> {
        let link = self.commit(state)?;
        debug!(action, code = %state.event_code, "command committed");
        render_published(
            self.output,
            &Published {
                action: action.to_string(),
                event_code: state.event_code.clone(),
                name: state.name.clone(),
                link: link.to_string(),
            },
        )
    }
}

fn looks_like_url(target: &str) -> bool {
    target.contains("://")
}

/// Result of every command that produces a new link.
#[derive(Debug, Serialize)]
pub struct Published {
    pub action: String,
    pub event_code: String,
    pub name: String,
    pub link: String,
}

pub fn render_published(output: OutputMode, published: &Published) -> anyhow::Result<()> {
    render_mode(
        output,
        published,
        |p, w| writeln!(w, "{}", p.link),
        |p, w| {
            writeln!(w, "✓ {} ({} · {})", p.action, p.name, p.event_code)?;
            pretty_kv(w, "Link", &p.link)
        },
    )
}

/// Parse a date given as RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_when(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected YYYY-MM-DD[THH:MM] or RFC 3339, got '{raw}'"))
}

/// Find an item by id, then by name.
pub fn find_item<'a>(state: &'a EventState, reference: &str) -> Option<&'a Item> {
    state.item(reference).or_else(|| state.item_named(reference))
}

/// Find an activity by id, then by exact name.
pub fn find_activity<'a>(state: &'a EventState, reference: &str) -> Option<&'a Activity> {
    state.activity(reference).or_else(|| {
        state
            .event_activities
            .iter()
            .find(|a| a.name == reference.trim())
    })
}

/// Find a candidate date by id or by its 1-based position.
pub fn find_date<'a>(state: &'a EventState, reference: &str) -> Option<&'a DateOption> {
    state
        .proposed_dates
        .iter()
        .find(|d| d.id == reference)
        .or_else(|| {
            reference
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| state.proposed_dates.get(idx))
        })
}

/// Render a lookup miss the way the core would have.
pub fn missing<T>(output: OutputMode, err: MutationError) -> anyhow::Result<T> {
    fail(output, CoreError::Mutation(err))
}

/// Full event view for `show`, `decode` and `open`.
#[derive(Debug, Serialize)]
pub struct EventView {
    pub event_code: String,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub is_multi_day: bool,
    pub items: Vec<ItemView>,
    pub activities: Vec<ActivityView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateView>,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub id: String,
    pub name: String,
    pub votes: u32,
    pub voters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DateView {
    pub id: String,
    pub date: DateTime<Utc>,
    pub votes: usize,
    pub voters: Vec<String>,
}

impl EventView {
    pub fn new(state: &EventState, now: DateTime<Utc>) -> Self {
        Self {
            event_code: state.event_code.clone(),
            name: state.name.clone(),
            event_date: state.event_date,
            expires_at: state.expires_at,
            days_remaining: state.days_remaining(now),
            is_multi_day: state.is_multi_day,
            items: state
                .event_items
                .iter()
                .map(|item| ItemView {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    assigned_to: state.assignment_for(&item.id).map(|a| a.person_name.clone()),
                })
                .collect(),
            activities: state
                .activities_by_votes()
                .into_iter()
                .map(|a| ActivityView {
                    id: a.id.clone(),
                    name: a.name.clone(),
                    votes: a.votes,
                    voters: a.voters.clone(),
                })
                .collect(),
            dates: state
                .proposed_dates
                .iter()
                .map(|d| DateView {
                    id: d.id.clone(),
                    date: d.date,
                    votes: state.date_vote_count(&d.id),
                    voters: state.date_voters(&d.id).into_iter().map(str::to_string).collect(),
                })
                .collect(),
        }
    }

    fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}  {}  {}", self.event_code, self.name, fmt_when(self.event_date))?;
        for item in &self.items {
            writeln!(
                w,
                "item  {}  {}  {}",
                item.id,
                item.name,
                item.assigned_to.as_deref().unwrap_or("-")
            )?;
        }
        for activity in &self.activities {
            writeln!(
                w,
                "activity  {}  {}  {}",
                activity.id, activity.name, activity.votes
            )?;
        }
        for (idx, date) in self.dates.iter().enumerate() {
            writeln!(
                w,
                "date  {}  {}  {}  {}",
                idx + 1,
                date.id,
                fmt_when(date.date),
                date.votes
            )?;
        }
        Ok(())
    }

    fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        crate::output::pretty_section(w, &format!("{} ({})", self.name, self.event_code))?;
        pretty_kv(w, "When", fmt_when(self.event_date))?;
        let expiry = if self.days_remaining < 0 {
            "expired".to_string()
        } else {
            format!("in {} days", self.days_remaining)
        };
        pretty_kv(w, "Expires", expiry)?;

        if !self.items.is_empty() {
            writeln!(w)?;
            writeln!(w, "Items")?;
            for item in &self.items {
                match &item.assigned_to {
                    Some(person) => writeln!(w, "  {}  {:<24} → {person}", item.id, item.name)?,
                    None => writeln!(w, "  {}  {:<24}   (open)", item.id, item.name)?,
                }
            }
        }

        if !self.activities.is_empty() {
            writeln!(w)?;
            writeln!(w, "Activities")?;
            for a in &self.activities {
                writeln!(w, "  {}  {:<24} {:>2}  {}", a.id, a.name, a.votes, a.voters.join(", "))?;
            }
        }

        if !self.dates.is_empty() {
            writeln!(w)?;
            writeln!(w, "Dates")?;
            for (idx, d) in self.dates.iter().enumerate() {
                writeln!(
                    w,
                    "  {}. {}  {:>2}  {}",
                    idx + 1,
                    fmt_when(d.date),
                    d.votes,
                    d.voters.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

pub fn render_event(output: OutputMode, view: &EventView) -> anyhow::Result<()> {
    render_mode(output, view, |v, w| v.write_text(w), |v, w| v.write_pretty(w))
}

fn fmt_when(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use potluck_core::id::SeededIds;
    use potluck_core::model::NewEvent;

    #[test]
    fn parse_when_accepts_common_shapes() {
        let evening = Utc.with_ymd_and_hms(2025, 8, 1, 18, 0, 0).single().expect("valid");
        assert_eq!(parse_when("2025-08-01T18:00:00Z"), Ok(evening));
        assert_eq!(parse_when("2025-08-01T20:00:00+02:00"), Ok(evening));
        assert_eq!(parse_when("2025-08-01T18:00"), Ok(evening));
        assert_eq!(parse_when("2025-08-01 18:00"), Ok(evening));
        assert_eq!(
            parse_when("2025-08-01"),
            Ok(Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).single().expect("valid"))
        );
        assert!(parse_when("next friday").is_err());
    }

    fn event() -> EventState {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).single().expect("valid");
        let mut ids = SeededIds::new(5, at);
        EventState::create(
            NewEvent::new("Ausflug", at).with_proposed_dates(vec![at, at + Duration::days(7)]),
            &mut ids,
            Duration::days(365),
        )
        .and_then(|s| s.add_item("Grill", &mut ids))
        .and_then(|s| s.add_activity("Volleyball", &mut ids))
        .expect("build")
    }

    #[test]
    fn lookups_accept_ids_names_and_positions() {
        let state = event();
        let grill = &state.event_items[0];
        assert_eq!(find_item(&state, &grill.id).map(|i| &i.id), Some(&grill.id));
        assert_eq!(find_item(&state, "Grill").map(|i| &i.id), Some(&grill.id));
        assert!(find_item(&state, "Salat").is_none());

        assert!(find_activity(&state, "Volleyball").is_some());

        let second = &state.proposed_dates[1];
        assert_eq!(find_date(&state, "2").map(|d| &d.id), Some(&second.id));
        assert_eq!(find_date(&state, &second.id).map(|d| &d.id), Some(&second.id));
        assert!(find_date(&state, "0").is_none());
        assert!(find_date(&state, "3").is_none());
    }

    #[test]
    fn event_view_lists_everything() {
        let state = event();
        let view = EventView::new(&state, state.created_at);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].assigned_to, None);
        assert_eq!(view.activities[0].name, "Volleyball");
        assert_eq!(view.dates.len(), 2);
        assert_eq!(view.days_remaining, 365);

        let mut buf = Vec::new();
        view.write_text(&mut buf).expect("text");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("item  "));
        assert!(text.contains("date  2  "));
    }

    #[test]
    fn urls_are_told_apart_from_codes() {
        assert!(looks_like_url("https://potluck.example#/event/ABCD1234"));
        assert!(!looks_like_url("ABCD1234"));
    }
}
