//! Event state stores keyed by event code.
//!
//! A store is a mirror, not the source of truth: the link token is. Stores
//! keep the latest snapshot seen for each event so an event can be reopened
//! without its link and so an unreadable link can fall back to something.
//!
//! Two implementations ship:
//!
//! - [`MemoryStore`] for tests and embedding;
//! - [`FileStore`], a JSON file laid out like the browser's local storage.

pub mod file;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

pub use file::FileStore;

use crate::error::StoreError;
use crate::model::EventState;

/// Persistence boundary for event snapshots.
///
/// Implementations must be safe to call from several threads; the
/// re-publisher calls `put` from the blocking pool.
pub trait EventStore: Send + Sync {
    /// Latest stored snapshot for `code`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    fn get(&self, code: &str) -> Result<Option<EventState>, StoreError>;

    /// Store `state` under `code`, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be written.
    fn put(&self, code: &str, state: &EventState) -> Result<(), StoreError>;

    /// Remove the snapshot for `code`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be written.
    fn remove(&self, code: &str) -> Result<bool, StoreError>;

    /// Every stored snapshot, ordered by event code.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    fn list(&self) -> Result<Vec<EventState>, StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<BTreeMap<String, EventState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> Result<MutexGuard<'_, BTreeMap<String, EventState>>, StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".into()))
    }
}

impl EventStore for MemoryStore {
    fn get(&self, code: &str) -> Result<Option<EventState>, StoreError> {
        Ok(self.events()?.get(code).cloned())
    }

    fn put(&self, code: &str, state: &EventState) -> Result<(), StoreError> {
        self.events()?.insert(code.to_string(), state.clone());
        Ok(())
    }

    fn remove(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.events()?.remove(code).is_some())
    }

    fn list(&self) -> Result<Vec<EventState>, StoreError> {
        Ok(self.events()?.values().cloned().collect())
    }
}

impl<S: EventStore + ?Sized> EventStore for std::sync::Arc<S> {
    fn get(&self, code: &str) -> Result<Option<EventState>, StoreError> {
        (**self).get(code)
    }

    fn put(&self, code: &str, state: &EventState) -> Result<(), StoreError> {
        (**self).put(code, state)
    }

    fn remove(&self, code: &str) -> Result<bool, StoreError> {
        (**self).remove(code)
    }

    fn list(&self) -> Result<Vec<EventState>, StoreError> {
        (**self).list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SeededIds;
    use crate::model::NewEvent;
    use chrono::{Duration, TimeZone, Utc};

    fn state(name: &str) -> EventState {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).single().expect("valid");
        let mut ids = SeededIds::new(name.len() as u64, at);
        EventState::create(NewEvent::new(name, at), &mut ids, Duration::days(365)).expect("create")
    }

    #[test]
    fn memory_store_crud() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let s = state("Sommerfest");
        assert_eq!(store.get(&s.event_code)?, None);

        store.put(&s.event_code, &s)?;
        assert_eq!(store.get(&s.event_code)?, Some(s.clone()));
        assert_eq!(store.list()?.len(), 1);

        assert!(store.remove(&s.event_code)?);
        assert!(!store.remove(&s.event_code)?);
        assert!(store.list()?.is_empty());
        Ok(())
    }

    #[test]
    fn put_replaces_previous_snapshot() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let s = state("Sommerfest");
        let renamed = EventState {
            name: "Herbstfest".into(),
            ..s.clone()
        };
        store.put(&s.event_code, &s)?;
        store.put(&s.event_code, &renamed)?;
        assert_eq!(
            store.get(&s.event_code)?.map(|e| e.name),
            Some("Herbstfest".into())
        );
        Ok(())
    }
}
