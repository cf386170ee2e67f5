//! Loading events from links and publishing them back out.
//!
//! The link token is authoritative; the store is a fallback mirror. Every
//! publish mirrors the snapshot into the store before returning the new
//! link, so the most recent local edit can always be reopened by code.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::codec::{decode_state, encode_state};
use crate::error::{CoreError, LinkError};
use crate::link::ShareLink;
use crate::model::EventState;
use crate::store::EventStore;

/// Resolve an event by code and optional link token.
///
/// The token wins when it decodes. A corrupt token falls back to the store.
/// An expired event is reported as [`CoreError::Expired`] whichever source
/// it came from.
///
/// # Errors
///
/// - [`CoreError::Decode`] if the token was corrupt and the store has no
///   copy;
/// - [`CoreError::Link`] if the token decodes to a different event than
///   `code`;
/// - [`CoreError::NotFound`] if there was no token and no stored copy;
/// - [`CoreError::Expired`] if the resolved event is past its expiry;
/// - [`CoreError::Store`] if the store could not be read.
#[instrument(skip(token, store), fields(has_token = token.is_some()))]
pub fn load_event(
    code: &str,
    token: Option<&str>,
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<EventState, CoreError> {
    let mut decode_failure = None;

    let from_token = match token.filter(|t| !t.trim().is_empty()) {
        Some(token) => match decode_state(token) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %err, "link data unreadable, falling back to stored copy");
                decode_failure = Some(err);
                None
            }
        },
        None => None,
    };

    let state = match from_token {
        Some(state) => {
            if state.event_code != code {
                return Err(LinkError::CodeMismatch {
                    route: code.to_string(),
                    token: state.event_code,
                }
                .into());
            }
            state
        }
        None => match store.get(code)? {
            Some(state) => state,
            None => {
                return Err(decode_failure.map_or_else(
                    || CoreError::NotFound {
                        code: code.to_string(),
                    },
                    CoreError::Decode,
                ));
            }
        },
    };

    if state.is_expired(now) {
        return Err(CoreError::Expired {
            code: code.to_string(),
            expired_at: state.expires_at,
        });
    }
    Ok(state)
}

/// Resolve an event from a share link.
///
/// # Errors
///
/// Same as [`load_event`], plus [`CoreError::Link`] for a malformed URL.
pub fn load_link(
    url: &str,
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<EventState, CoreError> {
    let link = ShareLink::parse(url)?;
    load_event(&link.event_code, link.token.as_deref(), store, now)
}

/// Encode `state`, mirror it into `store` and return the new share link.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if mirroring fails and [`CoreError::Link`]
/// if `origin` is not a valid base URL.
#[instrument(skip(state, store), fields(code = %state.event_code))]
pub fn publish(
    state: &EventState,
    store: &dyn EventStore,
    origin: &str,
) -> Result<ShareLink, CoreError> {
    let token = encode_state(state);
    let link = ShareLink::new(origin, state.event_code.clone(), Some(token))?;
    store.put(&state.event_code, state)?;
    info!(bytes = link.token.as_ref().map_or(0, String::len), "published event");
    Ok(link)
}

/// Remove every stored event that has expired. Returns how many went.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the store cannot be read or written.
pub fn cleanup_expired(store: &dyn EventStore, now: DateTime<Utc>) -> Result<usize, CoreError> {
    let mut removed = 0;
    for state in store.list()? {
        if state.is_expired(now) && store.remove(&state.event_code)? {
            debug!(code = %state.event_code, expired_at = %state.expires_at, "removed expired event");
            removed += 1;
        }
    }
    if removed > 0 {
        info!(removed, "cleaned up expired events");
    }
    Ok(removed)
}

/// Name of the stored event with `code`, if any.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the store cannot be read.
pub fn event_exists(store: &dyn EventStore, code: &str) -> Result<Option<String>, CoreError> {
    Ok(store.get(code)?.map(|state| state.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, StoreError};
    use crate::id::SeededIds;
    use crate::model::NewEvent;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).single().expect("valid")
    }

    fn event(days: i64) -> EventState {
        let mut ids = SeededIds::new(9, now());
        EventState::create(
            NewEvent::new("Sommerfest", now()),
            &mut ids,
            Duration::days(days),
        )
        .expect("create")
    }

    struct FailingStore;

    impl EventStore for FailingStore {
        fn get(&self, _: &str) -> Result<Option<EventState>, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
        fn put(&self, _: &str, _: &EventState) -> Result<(), StoreError> {
            Err(StoreError::Backend("quota exceeded".into()))
        }
        fn remove(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
        fn list(&self) -> Result<Vec<EventState>, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
    }

    #[test]
    fn publish_mirrors_and_load_prefers_token() -> Result<(), CoreError> {
        let store = MemoryStore::new();
        let state = event(365);
        let link = publish(&state, &store, "http://localhost:5173")?;
        assert_eq!(store.get(&state.event_code)?, Some(state.clone()));

        let empty = MemoryStore::new();
        let loaded = load_event(&state.event_code, link.token.as_deref(), &empty, now())?;
        assert_eq!(loaded, state);
        Ok(())
    }

    #[test]
    fn corrupt_token_falls_back_to_store() -> Result<(), CoreError> {
        let store = MemoryStore::new();
        let state = event(365);
        store.put(&state.event_code, &state)?;
        let loaded = load_event(&state.event_code, Some("%%%"), &store, now())?;
        assert_eq!(loaded, state);
        Ok(())
    }

    #[test]
    fn corrupt_token_without_copy_is_a_decode_error() {
        let err = load_event("ABCD1234", Some("%%%"), &MemoryStore::new(), now())
            .expect_err("corrupt");
        assert!(matches!(err, CoreError::Decode(DecodeError::InvalidBase64(_))));
    }

    #[test]
    fn nothing_anywhere_is_not_found() {
        let err = load_event("ABCD1234", None, &MemoryStore::new(), now()).expect_err("missing");
        assert!(matches!(err, CoreError::NotFound { ref code } if code == "ABCD1234"));
    }

    #[test]
    fn token_for_another_event_is_rejected() -> Result<(), CoreError> {
        let store = MemoryStore::new();
        let state = event(1);
        let link = publish(&state, &MemoryStore::new(), "http://localhost:5173")?;

        let err = load_event("AAAAAAAA", link.token.as_deref(), &store, now())
            .expect_err("foreign token");
        assert!(matches!(
            err,
            CoreError::Link(LinkError::CodeMismatch { ref route, ref token })
                if route == "AAAAAAAA" && *token == state.event_code
        ));
        assert_eq!(err.code().code(), "E1004");
        assert!(store.list()?.is_empty());
        Ok(())
    }

    #[test]
    fn expired_event_is_expired() {
        let store = MemoryStore::new();
        let state = event(1);
        let link = publish(&state, &store, "http://localhost:5173").expect("publish");
        let later = now() + Duration::days(2);

        let err = load_event(&state.event_code, link.token.as_deref(), &store, later)
            .expect_err("expired");
        assert!(matches!(err, CoreError::Expired { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn store_failure_surfaces_on_publish() {
        let err = publish(&event(365), &FailingStore, "http://localhost:5173").expect_err("store");
        assert!(matches!(err, CoreError::Store(StoreError::Backend(_))));
    }

    #[test]
    fn load_link_parses_url() -> Result<(), CoreError> {
        let store = MemoryStore::new();
        let state = event(365);
        let link = publish(&state, &store, "https://potluck.example")?;
        assert_eq!(load_link(&link.to_string(), &MemoryStore::new(), now())?, state);
        Ok(())
    }

    #[test]
    fn cleanup_removes_only_expired() -> Result<(), CoreError> {
        let store = MemoryStore::new();
        let short = event(1);
        let mut long = event(365);
        long.event_code = "LONGLIVE".into();
        store.put(&short.event_code, &short)?;
        store.put(&long.event_code, &long)?;

        assert_eq!(cleanup_expired(&store, now() + Duration::days(2))?, 1);
        assert_eq!(event_exists(&store, &short.event_code)?, None);
        assert_eq!(event_exists(&store, "LONGLIVE")?, Some("Sommerfest".into()));
        Ok(())
    }
}
