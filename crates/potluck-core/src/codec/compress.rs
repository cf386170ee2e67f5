//! Structural compression of snapshots into minimal short-key records.
//!
//! Compression is lossy in a documented way:
//!
//! - fields holding `null`, an empty string or the number zero are omitted;
//!   booleans are always kept;
//! - empty collections and objects are omitted;
//! - children keep only the fields needed to rebuild them, so their
//!   `created_at` decodes as unknown (`None`);
//! - timestamps carry millisecond precision.
//!
//! [`normalize`] applies the same losses to a snapshot directly, which is
//! what `decompress(compress(s))` returns.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use super::keys::{lengthen, shorten};
use crate::error::DecodeError;
use crate::model::{EventState, repair, validate};

/// Fields each child collection keeps on the wire, in emission order.
const CHILD_FIELDS: [(&str, &[&str]); 5] = [
    ("proposed_dates", &["id", "date"]),
    ("event_items", &["id", "name", "event_id"]),
    ("event_assignments", &["id", "item_id", "person_name"]),
    ("event_activities", &["id", "name", "votes", "voters"]),
    ("event_date_votes", &["id", "date_id", "voter_name"]),
];

/// Compress a snapshot into its minimal short-key record.
#[must_use]
pub fn compress(state: &EventState) -> Value {
    let Ok(Value::Object(mut root)) = serde_json::to_value(state) else {
        // EventState serializes to an object unconditionally.
        return Value::Object(Map::new());
    };

    for (collection, fields) in CHILD_FIELDS {
        if let Some(Value::Array(children)) = root.get_mut(collection) {
            for child in children.iter_mut() {
                if let Value::Object(record) = child {
                    record.retain(|key, _| fields.contains(&key.as_str()));
                }
            }
        }
    }

    shorten(&prune(Value::Object(root)))
}

fn is_droppable(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) => false,
    }
}

/// Drop empty fields bottom-up. Array elements are never dropped, only
/// pruned themselves, so positions stay stable.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (key, prune(inner)))
                .filter(|(_, inner)| !is_droppable(inner))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune).collect()),
        other => other,
    }
}

/// Rebuild a snapshot from a minimal short-key record.
///
/// Absent fields take their zero value and every collection is present.
/// Invariant breaks in the record are logged and repaired.
///
/// # Errors
///
/// Returns [`DecodeError::NotARecord`] if `record` is not an object and
/// [`DecodeError::Shape`] if it does not fit the event schema.
pub fn decompress(record: &Value) -> Result<EventState, DecodeError> {
    if !record.is_object() {
        return Err(DecodeError::NotARecord);
    }
    let mut long = lengthen(record);
    restore_legacy_voters(&mut long);

    let state: EventState =
        serde_json::from_value(long).map_err(|err| DecodeError::Shape(err.to_string()))?;

    let violations = validate(&state);
    if violations.is_empty() {
        return Ok(state);
    }
    for violation in &violations {
        warn!(event = %state.event_code, %violation, "repairing decoded snapshot");
    }
    Ok(repair(state))
}

/// Links minted by the browser widget ran voter names through the object
/// compressor, which turned `"Max"` into `{"0":"M","1":"a","2":"x"}`.
/// Reassemble such entries into plain names.
fn restore_legacy_voters(long: &mut Value) {
    let Some(Value::Array(activities)) = long.get_mut("event_activities") else {
        return;
    };
    for activity in activities {
        let Some(Value::Array(voters)) = activity.get_mut("voters") else {
            continue;
        };
        for voter in voters.iter_mut() {
            if let Value::Object(chars) = voter {
                let mut indexed: Vec<(usize, String)> = chars
                    .iter()
                    .filter_map(|(idx, ch)| Some((idx.parse().ok()?, ch.as_str()?.to_string())))
                    .collect();
                indexed.sort_by_key(|(idx, _)| *idx);
                *voter = Value::String(indexed.into_iter().map(|(_, ch)| ch).collect());
            }
        }
    }
}

fn millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Apply the losses of a compress/decompress round trip to `state`.
#[must_use]
pub fn normalize(state: &EventState) -> EventState {
    let mut out = state.clone();
    out.password_hash = out.password_hash.filter(|p| !p.is_empty());
    out.event_date = millis(out.event_date);
    out.expires_at = millis(out.expires_at);
    out.created_at = millis(out.created_at);
    for date in &mut out.proposed_dates {
        date.date = millis(date.date);
    }
    for item in &mut out.event_items {
        item.created_at = None;
    }
    for assignment in &mut out.event_assignments {
        assignment.created_at = None;
    }
    for activity in &mut out.event_activities {
        activity.created_at = None;
    }
    for vote in &mut out.event_date_votes {
        vote.created_at = None;
    }
    repair(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, Item};
    use chrono::TimeZone;
    use serde_json::json;

    fn empty_state() -> EventState {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).single().expect("valid");
        EventState {
            id: "4Xk2a9B".into(),
            event_code: "K7Q2M9XA".into(),
            name: "Sommerfest".into(),
            event_date: at,
            password_hash: None,
            expires_at: at,
            created_at: at,
            is_multi_day: false,
            proposed_dates: Vec::new(),
            event_items: Vec::new(),
            event_assignments: Vec::new(),
            event_activities: Vec::new(),
            event_date_votes: Vec::new(),
        }
    }

    #[test]
    fn empty_state_has_no_collection_keys() {
        let record = compress(&empty_state());
        let map = record.as_object().expect("object");
        for key in ["h", "i", "j", "k", "l", "e"] {
            assert!(!map.contains_key(key), "unexpected key {key}");
        }
        assert_eq!(map.get("m"), Some(&json!(false)));

        let back = decompress(&record).expect("decompress");
        assert_eq!(back, empty_state());
    }

    #[test]
    fn root_keys_follow_creation_order() {
        let mut state = empty_state();
        state.password_hash = Some("x".into());
        state.event_items.push(Item {
            id: "i1".into(),
            name: "Grill".into(),
            event_id: state.id.clone(),
            created_at: Some(state.created_at),
        });
        let record = compress(&state);
        let keys: Vec<_> = record.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e", "f", "g", "m", "h"]);
    }

    #[test]
    fn children_are_trimmed() {
        let mut state = empty_state();
        state.event_items.push(Item {
            id: "i1".into(),
            name: "Grill".into(),
            event_id: state.id.clone(),
            created_at: Some(state.created_at),
        });
        let record = compress(&state);
        assert_eq!(record["h"], json!([{"a": "i1", "c": "Grill", "o": "4Xk2a9B"}]));
    }

    #[test]
    fn zero_votes_are_omitted_and_restored() {
        let mut state = empty_state();
        state.event_activities.push(Activity {
            id: "a1".into(),
            name: "Boccia".into(),
            votes: 0,
            voters: Vec::new(),
            created_at: None,
        });
        let record = compress(&state);
        assert_eq!(record["j"], json!([{"a": "a1", "c": "Boccia"}]));
        assert_eq!(decompress(&record).expect("decompress"), state);
    }

    #[test]
    fn legacy_voter_objects_are_reassembled() {
        let record = json!({
            "a": "e1", "b": "ABCD1234", "c": "x",
            "d": "2025-08-01T18:00:00.000Z",
            "f": "2026-07-01T10:00:00.000Z",
            "g": "2025-07-01T10:00:00.000Z",
            "m": false,
            "j": [{"a": "a1", "c": "Boccia", "q": 1,
                   "r": [{"0": "M", "1": "a", "2": "x"}]}]
        });
        let state = decompress(&record).expect("decompress");
        assert_eq!(state.event_activities[0].voters, vec!["Max"]);
    }

    #[test]
    fn inconsistent_counts_are_repaired() {
        let record = json!({
            "a": "e1", "b": "ABCD1234", "c": "x",
            "d": "2025-08-01T18:00:00.000Z",
            "f": "2026-07-01T10:00:00.000Z",
            "g": "2025-07-01T10:00:00.000Z",
            "j": [{"a": "a1", "c": "Boccia", "q": 9, "r": ["Max", "Max"]}]
        });
        let state = decompress(&record).expect("decompress");
        assert_eq!(state.event_activities[0].votes, 1);
        assert_eq!(state.event_activities[0].voters, vec!["Max"]);
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(decompress(&json!([1, 2])), Err(DecodeError::NotARecord));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let err = decompress(&json!({"a": "e1", "d": 42})).expect_err("shape");
        assert!(matches!(err, DecodeError::Shape(_)));
    }

    #[test]
    fn normalize_drops_child_timestamps() {
        let mut state = empty_state();
        state.event_items.push(Item {
            id: "i1".into(),
            name: "Grill".into(),
            event_id: state.id.clone(),
            created_at: Some(state.created_at),
        });
        state.password_hash = Some(String::new());
        let normal = normalize(&state);
        assert_eq!(normal.event_items[0].created_at, None);
        assert_eq!(normal.password_hash, None);
        assert_eq!(decompress(&compress(&state)).expect("decompress"), normal);
    }
}
