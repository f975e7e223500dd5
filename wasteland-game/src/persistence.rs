//! Snapshot storage behind a gateway trait, with in-memory and JSON file
//! adapters.
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::PersistError;
use crate::session::PlayerId;
use crate::snapshot::SnapshotRecord;

/// Storage seam for session snapshots.
///
/// Implementations serialize access per session id, so two saves for the same
/// id never interleave.
pub trait PersistenceGateway {
    /// Store `record` under `session_id`, replacing any earlier snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, session_id: &str, record: &SnapshotRecord) -> Result<(), PersistError>;

    /// Fetch the snapshot stored under `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::NotFound`] when nothing is stored, or another
    /// error if the stored document cannot be read.
    fn load(&self, session_id: &str) -> Result<SnapshotRecord, PersistError>;

    /// Remove the snapshot for `session_id`. Clearing an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be removed.
    fn clear(&self, session_id: &str) -> Result<(), PersistError>;

    /// Player id that new sessions in this store reuse, once one was issued.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored id exists but cannot be read.
    fn load_player_id(&self) -> Result<Option<PlayerId>, PersistError>;

    /// Remember `player` as the id for every later session in this store.
    ///
    /// # Errors
    ///
    /// Returns an error if the id cannot be written.
    fn save_player_id(&self, player: &PlayerId) -> Result<(), PersistError>;
}

/// Snapshots held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SnapshotRecord>>,
    player: Mutex<Option<PlayerId>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceGateway for MemoryStore {
    fn save(&self, session_id: &str, record: &SnapshotRecord) -> Result<(), PersistError> {
        let mut records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        records.insert(session_id.to_string(), record.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<SnapshotRecord, PersistError> {
        let records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        records
            .get(session_id)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(session_id.to_string()))
    }

    fn clear(&self, session_id: &str) -> Result<(), PersistError> {
        let mut records = self.records.lock().map_err(|_| PersistError::Poisoned)?;
        records.remove(session_id);
        Ok(())
    }

    fn load_player_id(&self) -> Result<Option<PlayerId>, PersistError> {
        let player = self.player.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(player.clone())
    }

    fn save_player_id(&self, player: &PlayerId) -> Result<(), PersistError> {
        let mut stored = self.player.lock().map_err(|_| PersistError::Poisoned)?;
        *stored = Some(player.clone());
        Ok(())
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid storage key pattern"))
}

/// Whether `key` is safe to use as a file name inside a storage directory.
pub(crate) fn is_valid_key(key: &str) -> bool {
    key_pattern().is_match(key)
}

/// Reject ids that could escape the storage directory.
pub(crate) fn validate_key(key: &str) -> Result<(), PersistError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(PersistError::InvalidKey(key.to_string()))
    }
}

/// One lock per storage key, held only while some caller uses the key.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Run `f` while holding the lock for `key`.
    pub(crate) fn with_key<T>(
        &self,
        key: &str,
        f: impl FnOnce() -> Result<T, PersistError>,
    ) -> Result<T, PersistError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| PersistError::Poisoned)?;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let result = {
            let _guard = lock.lock().map_err(|_| PersistError::Poisoned)?;
            f()
        };
        let mut locks = self.locks.lock().map_err(|_| PersistError::Poisoned)?;
        // The map and this call hold the only references: nobody else waits.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }
}

/// Write through a sibling temp file so readers never see a partial document.
pub(crate) fn write_atomically(path: &Path, contents: &str) -> Result<(), PersistError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// On-disk document holding the player id a store hands to new sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIdentity {
    player_id: PlayerId,
}

/// Dotted so it can never collide with a `<session_id>.json` file.
const IDENTITY_FILE: &str = "player.identity.json";

/// On-disk envelope around a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSnapshot {
    saved_at: DateTime<Utc>,
    record: SnapshotRecord,
}

/// One pretty-printed JSON document per session id inside `root`.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    locks: KeyedLocks,
}

impl JsonFileStore {
    /// Open (and create if needed) a snapshot directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            locks: KeyedLocks::default(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, PersistError> {
        validate_key(session_id)?;
        Ok(self.root.join(format!("{session_id}.json")))
    }

    /// When `session_id` was last saved.
    ///
    /// # Errors
    ///
    /// Same as [`PersistenceGateway::load`].
    pub fn saved_at(&self, session_id: &str) -> Result<DateTime<Utc>, PersistError> {
        self.read_stored(session_id).map(|stored| stored.saved_at)
    }

    fn read_stored(&self, session_id: &str) -> Result<StoredSnapshot, PersistError> {
        let path = self.path_for(session_id)?;
        let raw = self.locks.with_key(session_id, || match fs::read_to_string(&path) {
            Ok(raw) => Ok(raw),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(PersistError::NotFound(session_id.to_string()))
            }
            Err(err) => Err(err.into()),
        })?;
        let stored: StoredSnapshot = serde_json::from_str(&raw)?;
        if let Err(err) = stored.record.validate() {
            log::warn!("stored snapshot {} is invalid: {err}", path.display());
            return Err(err.into());
        }
        Ok(stored)
    }
}

impl PersistenceGateway for JsonFileStore {
    fn save(&self, session_id: &str, record: &SnapshotRecord) -> Result<(), PersistError> {
        let path = self.path_for(session_id)?;
        let stored = StoredSnapshot {
            saved_at: Utc::now(),
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        self.locks
            .with_key(session_id, || write_atomically(&path, &json))?;
        log::debug!("saved session {session_id} to {}", path.display());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<SnapshotRecord, PersistError> {
        self.read_stored(session_id).map(|stored| stored.record)
    }

    fn clear(&self, session_id: &str) -> Result<(), PersistError> {
        let path = self.path_for(session_id)?;
        self.locks.with_key(session_id, || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        })
    }

    fn load_player_id(&self) -> Result<Option<PlayerId>, PersistError> {
        let path = self.root.join(IDENTITY_FILE);
        let raw = self.locks.with_key(IDENTITY_FILE, || match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let stored: StoredIdentity = serde_json::from_str(&raw)?;
        if stored.player_id.is_valid() {
            Ok(Some(stored.player_id))
        } else {
            log::warn!(
                "ignoring unusable player id '{}' in {}",
                stored.player_id,
                path.display()
            );
            Ok(None)
        }
    }

    fn save_player_id(&self, player: &PlayerId) -> Result<(), PersistError> {
        validate_key(player.as_str())?;
        let path = self.root.join(IDENTITY_FILE);
        let json = serde_json::to_string_pretty(&StoredIdentity {
            player_id: player.clone(),
        })?;
        self.locks
            .with_key(IDENTITY_FILE, || write_atomically(&path, &json))?;
        log::debug!("stored player id {player} in {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GameSession, PlayerId};
    use crate::snapshot::to_snapshot;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "wasteland-store-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn record() -> SnapshotRecord {
        to_snapshot(&GameSession::new("Ada", PlayerId::derive("Ada", 3)))
    }

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemoryStore::new();
        assert!(store.load("slot").unwrap_err().is_not_found());
        store.save("slot", &record()).unwrap();
        assert_eq!(store.load("slot").unwrap(), record());
        store.clear("slot").unwrap();
        store.clear("slot").unwrap();
        assert!(store.load("slot").unwrap_err().is_not_found());
    }

    #[test]
    fn keys_are_validated() {
        assert!(validate_key("player_abc-01").is_ok());
        assert!(matches!(validate_key(""), Err(PersistError::InvalidKey(_))));
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key(&"x".repeat(65)).is_err());
    }

    #[test]
    fn file_store_round_trips_with_timestamp() {
        let root = temp_dir("round-trip");
        let store = JsonFileStore::open(&root).unwrap();
        let before = Utc::now();
        store.save("slot-1", &record()).unwrap();
        assert_eq!(store.load("slot-1").unwrap(), record());
        assert!(store.saved_at("slot-1").unwrap() >= before);
        assert!(root.join("slot-1.json").exists());
        store.clear("slot-1").unwrap();
        assert!(store.load("slot-1").unwrap_err().is_not_found());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_rejects_tampered_documents() {
        let root = temp_dir("tampered");
        let store = JsonFileStore::open(&root).unwrap();
        store.save("slot", &record()).unwrap();
        let path = root.join("slot.json");
        let raw = fs::read_to_string(&path).unwrap();
        fs::write(&path, raw.replace("\"health\": 100", "\"health\": 250")).unwrap();
        assert!(matches!(
            store.load("slot"),
            Err(PersistError::Snapshot(_))
        ));
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(store.load("slot"), Err(PersistError::Serde(_))));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn key_locks_are_dropped_after_use() {
        let locks = KeyedLocks::default();
        let value = locks.with_key("slot", || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert!(locks.with_key("other", || Err::<(), _>(PersistError::Poisoned)).is_err());
        assert_eq!(locks.len(), 0);

        let root = temp_dir("locks");
        let store = JsonFileStore::open(&root).unwrap();
        for id in ["a", "b", "c"] {
            store.save(id, &record()).unwrap();
            store.load(id).unwrap();
            store.clear(id).unwrap();
        }
        assert_eq!(store.locks.len(), 0);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn player_ids_persist_per_store() {
        let memory = MemoryStore::new();
        assert_eq!(memory.load_player_id().unwrap(), None);
        let player = PlayerId::derive("Ada", 3);
        memory.save_player_id(&player).unwrap();
        assert_eq!(memory.load_player_id().unwrap(), Some(player.clone()));

        let root = temp_dir("identity");
        let store = JsonFileStore::open(&root).unwrap();
        assert_eq!(store.load_player_id().unwrap(), None);
        store.save_player_id(&player).unwrap();
        assert_eq!(store.load_player_id().unwrap(), Some(player.clone()));
        let reopened = JsonFileStore::open(&root).unwrap();
        assert_eq!(reopened.load_player_id().unwrap(), Some(player));

        fs::write(root.join(IDENTITY_FILE), r#"{"player_id": "../x"}"#).unwrap();
        assert_eq!(reopened.load_player_id().unwrap(), None);
        assert!(matches!(
            reopened.save_player_id(&PlayerId::from_raw("../x")),
            Err(PersistError::InvalidKey(_))
        ));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_refuses_path_like_ids() {
        let root = temp_dir("ids");
        let store = JsonFileStore::open(&root).unwrap();
        assert!(matches!(
            store.save("../escape", &record()),
            Err(PersistError::InvalidKey(_))
        ));
        let _ = fs::remove_dir_all(root);
    }
}
