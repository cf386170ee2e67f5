//! JSON file store.
//!
//! The file mirrors the browser widget's local-storage entry: one object
//! whose `events` key maps event codes to full snapshots in long-name form.
//!
//! ```json
//! { "events": { "K7Q2M9XA": { "id": "…", "event_code": "K7Q2M9XA", … } } }
//! ```
//!
//! Reads take a shared advisory lock on a sibling `.lock` file, writes an
//! exclusive one. Writes go to a temporary file that is renamed over the
//! store, so readers never observe a half-written file. Entries this crate
//! cannot parse are preserved on write and skipped by [`EventStore::list`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::EventStore;
use crate::error::StoreError;
use crate::lock::StoreLock;
use crate::model::EventState;

/// How long to wait for another process holding the store lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    events: Map<String, Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Event store persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    /// Open the store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_file(&self) -> Result<StoreFile, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, starting empty");
                return Ok(StoreFile::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        if raw.trim().is_empty() {
            return Ok(StoreFile::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_file(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let body = serde_json::to_vec_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|err| self.io_error(err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_error(err))
    }

    fn modify<T>(&self, f: impl FnOnce(&mut StoreFile) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _lock = StoreLock::exclusive(&self.lock_path, self.lock_timeout)?;
        let mut file = self.read_file()?;
        let out = f(&mut file)?;
        self.write_file(&file)?;
        Ok(out)
    }
}

impl EventStore for FileStore {
    fn get(&self, code: &str) -> Result<Option<EventState>, StoreError> {
        let _lock = StoreLock::shared(&self.lock_path, self.lock_timeout)?;
        let file = self.read_file()?;
        file.events
            .get(code)
            .map(|raw| serde_json::from_value(raw.clone()).map_err(StoreError::from))
            .transpose()
    }

    fn put(&self, code: &str, state: &EventState) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)?;
        self.modify(|file| {
            file.events.insert(code.to_string(), value);
            Ok(())
        })?;
        debug!(code, path = %self.path.display(), "stored event snapshot");
        Ok(())
    }

    fn remove(&self, code: &str) -> Result<bool, StoreError> {
        self.modify(|file| Ok(file.events.remove(code).is_some()))
    }

    fn list(&self) -> Result<Vec<EventState>, StoreError> {
        let _lock = StoreLock::shared(&self.lock_path, self.lock_timeout)?;
        let file = self.read_file()?;
        let mut out: Vec<(String, EventState)> = file
            .events
            .into_iter()
            .filter_map(|(code, raw)| match serde_json::from_value(raw) {
                Ok(state) => Some((code, state)),
                Err(err) => {
                    warn!(code = %code, error = %err, "skipping unreadable stored event");
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out.into_iter().map(|(_, state)| state).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SeededIds;
    use crate::model::NewEvent;
    use chrono::{TimeZone, Utc};

    fn state(seed: u64) -> EventState {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).single().expect("valid");
        let mut ids = SeededIds::new(seed, at);
        EventState::create(
            NewEvent::new("Sommerfest", at),
            &mut ids,
            chrono::Duration::days(365),
        )
        .expect("create")
    }

    #[test]
    fn missing_file_reads_as_empty() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("events.json"));
        assert_eq!(store.get("ABCD1234")?, None);
        assert!(store.list()?.is_empty());
        Ok(())
    }

    #[test]
    fn put_then_get_across_handles() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("events.json");
        let s = state(1);

        FileStore::new(&path).put(&s.event_code, &s)?;
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(&s.event_code)?, Some(s));
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn layout_uses_events_key() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.json");
        let s = state(2);
        FileStore::new(&path).put(&s.event_code, &s)?;

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["events"][&s.event_code]["name"], "Sommerfest");
        Ok(())
    }

    #[test]
    fn reads_browser_local_storage_dump() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.json");
        fs::write(
            &path,
            r#"{"events":{"K7Q2M9XA":{"id":"4Xk2a9B","event_code":"K7Q2M9XA","name":"Sommerfest",
            "event_date":"2025-08-01T18:00:00.000Z","password_hash":null,
            "expires_at":"2026-07-01T10:00:00.000Z","created_at":"2025-07-01T10:00:00.000Z",
            "isMultiDay":false,"proposed_dates":[],"event_items_ev2025":[],
            "event_assignments_ev2025":[],"event_activities_ev2025":[],"event_date_votes":[]}}}"#,
        )
        .expect("write");

        let store = FileStore::new(&path);
        let loaded = store.get("K7Q2M9XA")?.expect("stored");
        assert_eq!(loaded.name, "Sommerfest");
        Ok(())
    }

    #[test]
    fn unreadable_entries_survive_writes_and_are_skipped_by_list() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.json");
        fs::write(&path, r#"{"events":{"BROKEN00":{"name":1}},"theme":"dark"}"#).expect("write");

        let store = FileStore::new(&path);
        let s = state(3);
        store.put(&s.event_code, &s)?;
        assert_eq!(store.list()?, vec![s]);

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert!(raw["events"].get("BROKEN00").is_some());
        assert_eq!(raw["theme"], "dark");
        assert!(store.get("BROKEN00").is_err());
        Ok(())
    }

    #[test]
    fn remove_reports_presence() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("events.json"));
        let s = state(4);
        store.put(&s.event_code, &s)?;
        assert!(store.remove(&s.event_code)?);
        assert!(!store.remove(&s.event_code)?);
        Ok(())
    }

    #[test]
    fn held_lock_times_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store =
            FileStore::new(dir.path().join("events.json")).with_lock_timeout(Duration::from_millis(20));
        let _held = StoreLock::exclusive(&store.lock_path, Duration::from_millis(50)).expect("lock");
        let s = state(5);
        assert!(matches!(
            store.put(&s.event_code, &s),
            Err(StoreError::LockTimeout { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_a_serialize_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.json");
        fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            FileStore::new(&path).get("X"),
            Err(StoreError::Serialize(_))
        ));
    }
}
