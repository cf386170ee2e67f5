//! Key shortening.
//!
//! Every field name of the event schema has a one-character code. The
//! table is fixed per [`super::SCHEMA_VERSION`]; changing an entry breaks
//! every link already shared.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Long field name to short code, in schema order.
pub const KEY_TABLE: [(&str, &str); 21] = [
    ("id", "a"),
    ("event_code", "b"),
    ("name", "c"),
    ("event_date", "d"),
    ("password_hash", "e"),
    ("expires_at", "f"),
    ("created_at", "g"),
    ("event_items", "h"),
    ("event_assignments", "i"),
    ("event_activities", "j"),
    ("event_date_votes", "k"),
    ("proposed_dates", "l"),
    ("isMultiDay", "m"),
    ("item_id", "n"),
    ("event_id", "o"),
    ("person_name", "p"),
    ("votes", "q"),
    ("voters", "r"),
    ("date_id", "s"),
    ("voter_name", "t"),
    ("date", "u"),
];

/// Collection names the browser's storage mirror used. They shorten to the
/// same codes as their plain spellings.
const LEGACY_ALIASES: [(&str, &str); 3] = [
    ("event_items_ev2025", "h"),
    ("event_assignments_ev2025", "i"),
    ("event_activities_ev2025", "j"),
];

#[must_use]
pub fn short_key(long: &str) -> Option<&'static str> {
    KEY_TABLE
        .iter()
        .chain(LEGACY_ALIASES.iter())
        .find(|(l, _)| *l == long)
        .map(|(_, s)| *s)
}

#[must_use]
pub fn long_key(short: &str) -> Option<&'static str> {
    KEY_TABLE.iter().find(|(_, s)| *s == short).map(|(l, _)| *l)
}

fn is_code(key: &str) -> bool {
    KEY_TABLE.iter().any(|(_, s)| *s == key)
}

/// Replace every vocabulary key with its code, recursing into arrays and
/// nested objects. Element and key order are preserved.
///
/// A key outside the vocabulary is a schema defect. It is logged and
/// shortened to its first character unless that character is already a
/// code or a key of the same object, in which case it is kept verbatim.
#[must_use]
pub fn shorten(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let short = short_key(key).map_or_else(|| fallback(key, map, &out), str::to_string);
                out.insert(short, shorten(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(shorten).collect()),
        other => other.clone(),
    }
}

fn fallback(key: &str, source: &Map<String, Value>, produced: &Map<String, Value>) -> String {
    let first: String = key.chars().take(1).collect();
    let collides = first.is_empty()
        || is_code(&first)
        || produced.contains_key(&first)
        || (first != key && source.contains_key(&first));
    if collides {
        warn!(key, "key outside the link vocabulary kept verbatim");
        key.to_string()
    } else {
        warn!(key, short = %first, "key outside the link vocabulary shortened to its first character");
        first
    }
}

/// Replace every code with its long name. Unknown keys pass through.
#[must_use]
pub fn lengthen(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let long = long_key(key).map_or_else(
                        || {
                            debug!(key = %key, "unknown short key passed through");
                            key.clone()
                        },
                        str::to_string,
                    );
                    (long, lengthen(inner))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(lengthen).collect()),
        other => other.clone(),
    }
}
