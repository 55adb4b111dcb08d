use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::Application;

pub const APPLICATIONS_KEY: &str = "apex-applications-v1";
pub const NEXT_ID_KEY: &str = "apex-next-id";
pub const DARK_MODE_KEY: &str = "apex-dark-mode";

/// A durable string-keyed slot store. Values are opaque JSON text.
pub trait SlotStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite file holding the slots table.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init()?;
        Ok(db)
    }

    pub fn default_path() -> PathBuf {
        // XDG data directory, or the current directory when there is none
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apex") {
            proj_dirs.data_dir().join("apex.db")
        } else {
            PathBuf::from("apex.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl SlotStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("Failed to read slot '{}'", key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .with_context(|| format!("Failed to write slot '{}'", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1", [key])
            .with_context(|| format!("Failed to clear slot '{}'", key))?;
        Ok(())
    }
}

/// Whole-collection persistence on top of a slot store.
///
/// Every operation is infallible from the caller's side: read failures come
/// back as "nothing stored", write failures are logged and dropped.
pub struct LocalStore {
    slots: Box<dyn SlotStore>,
}

impl LocalStore {
    pub fn new(slots: impl SlotStore + 'static) -> Self {
        Self {
            slots: Box::new(slots),
        }
    }

    /// The previously saved collection, or `None` when the slot is empty or
    /// holds something that does not decode.
    pub fn load_collection(&self) -> Option<Vec<Application>> {
        let raw = match self.slots.get(APPLICATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read applications from local store: {:#}", e);
                return None;
            }
        };
        match serde_json::from_str::<Vec<Application>>(&raw) {
            Ok(apps) => {
                let dupes = duplicate_ids(&apps);
                if !dupes.is_empty() {
                    log::warn!(
                        "Stored applications reuse app_id {:?}; only the first of each is reachable",
                        dupes
                    );
                }
                Some(apps)
            }
            Err(e) => {
                log::warn!("Failed to parse stored applications: {}", e);
                None
            }
        }
    }

    /// Replaces the stored collection with `apps`.
    pub fn save_collection(&self, apps: &[Application]) {
        if let Err(e) = self.try_save_collection(apps) {
            log::warn!("Failed to write applications to local store: {:#}", e);
        }
    }

    fn try_save_collection(&self, apps: &[Application]) -> Result<()> {
        let raw = serde_json::to_string(apps).context("Failed to serialize applications")?;
        self.slots.set(APPLICATIONS_KEY, &raw)
    }

    /// Returns the stored counter (1 when unset) and advances it by one.
    /// Fails only once the counter can no longer move forward.
    pub fn next_id(&self) -> Result<i64> {
        self.next_id_at_least(i64::MIN)
    }

    /// Like [`next_id`](Self::next_id), but never hands out a value below
    /// `floor`. The counter is moved past whatever is returned.
    pub fn next_id_at_least(&self, floor: i64) -> Result<i64> {
        let id = self.read_counter().max(floor);
        let next = id
            .checked_add(1)
            .ok_or_else(|| anyhow!("Id space exhausted at {}", id))?;
        if let Err(e) = self.slots.set(NEXT_ID_KEY, &next.to_string()) {
            log::warn!("Failed to persist id counter: {:#}", e);
        }
        Ok(id)
    }

    fn read_counter(&self) -> i64 {
        match self.slots.get(NEXT_ID_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable id counter '{}': {}", raw, e);
                1
            }),
            Ok(None) => 1,
            Err(e) => {
                log::warn!("Failed to read id counter: {:#}", e);
                1
            }
        }
    }

    pub fn dark_mode(&self) -> bool {
        match self.slots.get(DARK_MODE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable dark mode preference '{}': {}", raw, e);
                false
            }),
            Ok(None) => false,
            Err(e) => {
                log::warn!("Failed to read dark mode preference: {:#}", e);
                false
            }
        }
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        let raw = if enabled { "true" } else { "false" };
        if let Err(e) = self.slots.set(DARK_MODE_KEY, raw) {
            log::warn!("Failed to write dark mode preference: {:#}", e);
        }
    }

    /// Forgets the saved collection and the id counter.
    pub fn clear(&self) {
        for key in [APPLICATIONS_KEY, NEXT_ID_KEY] {
            if let Err(e) = self.slots.remove(key) {
                log::warn!("{:#}", e);
            }
        }
    }

    pub fn raw_slot(&self, key: &str) -> Option<String> {
        self.slots.get(key).ok().flatten()
    }
}

fn duplicate_ids(apps: &[Application]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for app in apps {
        if !seen.insert(app.app_id) && !dupes.contains(&app.app_id) {
            dupes.push(app.app_id);
        }
    }
    dupes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_collection;
    use anyhow::anyhow;

    fn memory_store() -> LocalStore {
        LocalStore::new(Database::open_in_memory().unwrap())
    }

    struct BrokenSlots;

    impl SlotStore for BrokenSlots {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk unavailable"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk unavailable"))
        }
    }

    #[test]
    fn empty_store_loads_nothing() {
        assert!(memory_store().load_collection().is_none());
    }

    #[test]
    fn save_then_load_returns_same_collection() {
        let store = memory_store();
        let apps = seed_collection();
        store.save_collection(&apps);
        assert_eq!(store.load_collection(), Some(apps));
    }

    #[test]
    fn save_replaces_previous_payload() {
        let store = memory_store();
        store.save_collection(&seed_collection());
        let fewer = seed_collection()[..1].to_vec();
        store.save_collection(&fewer);
        assert_eq!(store.load_collection().unwrap().len(), 1);
    }

    #[test]
    fn garbage_payload_loads_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.set(APPLICATIONS_KEY, "{not json").unwrap();
        let store = LocalStore::new(db);
        assert!(store.load_collection().is_none());
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let store = memory_store();
        let ids: Vec<i64> = (0..4).map(|_| store.next_id().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(store.raw_slot(NEXT_ID_KEY).as_deref(), Some("5"));
    }

    #[test]
    fn ids_continue_from_stored_counter() {
        let db = Database::open_in_memory().unwrap();
        db.set(NEXT_ID_KEY, "41").unwrap();
        let store = LocalStore::new(db);
        assert_eq!(store.next_id().unwrap(), 41);
        assert_eq!(store.next_id().unwrap(), 42);
    }

    #[test]
    fn floor_pushes_counter_forward() {
        let store = memory_store();
        assert_eq!(store.next_id_at_least(4).unwrap(), 4);
        assert_eq!(store.next_id().unwrap(), 5);
        assert_eq!(store.next_id_at_least(2).unwrap(), 6);
    }

    #[test]
    fn exhausted_counter_is_an_error_not_a_repeat() {
        let db = Database::open_in_memory().unwrap();
        db.set(NEXT_ID_KEY, &i64::MAX.to_string()).unwrap();
        let store = LocalStore::new(db);
        assert!(store.next_id().is_err());
        assert!(store.next_id().is_err());
        assert_eq!(store.raw_slot(NEXT_ID_KEY), Some(i64::MAX.to_string()));

        let fresh = memory_store();
        assert!(fresh.next_id_at_least(i64::MAX).is_err());
        assert_eq!(fresh.next_id().unwrap(), 1);
    }

    #[test]
    fn broken_backend_never_escapes() {
        let store = LocalStore::new(BrokenSlots);
        store.save_collection(&seed_collection());
        assert!(store.load_collection().is_none());
        assert_eq!(store.next_id().unwrap(), 1);
        assert!(!store.dark_mode());
        store.set_dark_mode(true);
        store.clear();
    }

    #[test]
    fn dark_mode_round_trips() {
        let store = memory_store();
        assert!(!store.dark_mode());
        store.set_dark_mode(true);
        assert!(store.dark_mode());
    }

    #[test]
    fn unreadable_dark_mode_is_off() {
        let db = Database::open_in_memory().unwrap();
        db.set(DARK_MODE_KEY, "maybe").unwrap();
        assert!(!LocalStore::new(db).dark_mode());
    }

    #[test]
    fn duplicate_ids_are_reported_once_each() {
        let mut apps = seed_collection();
        apps.push(apps[0].clone());
        apps.push(apps[0].clone());
        apps.push(apps[2].clone());
        assert_eq!(duplicate_ids(&apps), vec![1, 3]);
        assert!(duplicate_ids(&seed_collection()).is_empty());

        let store = memory_store();
        store.save_collection(&apps);
        assert_eq!(store.load_collection().unwrap().len(), 6);
    }

    #[test]
    fn clear_keeps_preferences() {
        let store = memory_store();
        store.save_collection(&seed_collection());
        store.next_id().unwrap();
        store.set_dark_mode(true);
        store.clear();
        assert!(store.load_collection().is_none());
        assert_eq!(store.next_id().unwrap(), 1);
        assert!(store.dark_mode());
    }
}
