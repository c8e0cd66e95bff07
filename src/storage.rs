use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::{new_task_id, Task, Theme};

pub const TASKS_KEY: &str = "task-manager.tasks";
pub const THEME_KEY: &str = "task-manager.theme";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Durable key-value text store backing the persistence adapter.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One file per key inside a data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        if key == TASKS_KEY {
            self.root.join(format!("{key}.json"))
        } else {
            self.root.join(key)
        }
    }

    fn write_atomic(&self, path: PathBuf, bytes: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_atomic(self.path_for(key), value.as_bytes())
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .expect("store poisoned")
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("store poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("store poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_string(tasks)?;
        self.backend.set(TASKS_KEY, &json)
    }

    /// Returns `None` when nothing usable is stored.
    pub fn load_tasks(&self) -> Option<Vec<Task>> {
        let raw = match self.backend.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                log::warn!("event=load_tasks status=error error={error}");
                return None;
            }
        };
        let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(error) => {
                log::warn!("event=load_tasks status=malformed error={error}");
                return None;
            }
        };
        Some(sanitize_records(records))
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.backend.set(THEME_KEY, theme.as_token())
    }

    pub fn load_theme(&self) -> Option<Theme> {
        match self.backend.get(THEME_KEY) {
            Ok(Some(raw)) => Theme::from_token(&raw),
            Ok(None) => None,
            Err(error) => {
                log::warn!("event=load_theme status=error error={error}");
                None
            }
        }
    }
}

// Per-record tolerance: a bad record is repaired or skipped, never fatal to the whole load.
fn sanitize_records(records: Vec<serde_json::Value>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let mut task: Task = match record {
            serde_json::Value::Object(mut fields) => {
                if !fields.get("id").is_some_and(|v| v.is_string()) {
                    fields.insert("id".into(), serde_json::Value::String(String::new()));
                }
                match serde_json::from_value(serde_json::Value::Object(fields)) {
                    Ok(task) => task,
                    Err(error) => {
                        log::warn!("event=load_tasks record={index} status=skipped error={error}");
                        continue;
                    }
                }
            }
            _ => {
                log::warn!("event=load_tasks record={index} status=skipped reason=not_an_object");
                continue;
            }
        };

        task.title = task.title.trim().to_string();
        if task.title.is_empty() {
            log::warn!("event=load_tasks record={index} status=skipped reason=blank_title");
            continue;
        }
        task.description = crate::models::normalize_optional(task.description.as_deref());

        if task.id.trim().is_empty() || seen.contains(&task.id) {
            let mut id = new_task_id();
            while seen.contains(&id) {
                id = new_task_id();
            }
            log::debug!("event=load_tasks record={index} status=reassigned_id");
            task.id = id;
        }
        seen.insert(task.id.clone());
        tasks.push(task);
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            due_date: None,
            is_completed: false,
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("unavailable")))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    #[test]
    fn save_then_load_preserves_order_and_optional_fields() {
        let storage = Storage::in_memory();
        let mut first = make_task("b", "Pay rent");
        first.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let mut second = make_task("a", "Buy milk");
        second.description = Some("2 litres".to_string());
        second.is_completed = true;
        let tasks = vec![first, second];

        storage.save_tasks(&tasks).unwrap();
        assert_eq!(storage.load_tasks(), Some(tasks));
    }

    #[test]
    fn load_tasks_absent_or_malformed_returns_none() {
        assert_eq!(Storage::in_memory().load_tasks(), None);

        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, "{not json"));
        assert_eq!(storage.load_tasks(), None);

        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, r#"{"id":"x"}"#));
        assert_eq!(storage.load_tasks(), None);

        assert_eq!(Storage::new(FailingStore).load_tasks(), None);
    }

    #[test]
    fn load_tasks_repairs_or_skips_bad_records() {
        let raw = r#"[
          {"id": "a", "title": "  keep  ", "description": "   "},
          42,
          {"id": "b", "title": "   "},
          {"title": "no id"},
          {"id": "a", "title": "duplicate id"},
          {"id": "c", "isCompleted": true},
          {"id": "d", "title": "Keep me", "isCompleted": "yes"},
          {"id": "e", "title": "Me too", "description": 42}
        ]"#;
        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, raw));
        let tasks = storage.load_tasks().expect("array should load");

        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[0].id, "a");
        assert_eq!(tasks[0].title, "keep");
        assert_eq!(tasks[0].description, None);
        assert_eq!(tasks[1].title, "no id");
        assert!(!tasks[1].id.is_empty());
        assert_eq!(tasks[2].title, "duplicate id");
        assert_ne!(tasks[2].id, "a");
        assert_eq!(tasks[3].id, "d");
        assert_eq!(tasks[3].title, "Keep me");
        assert!(!tasks[3].is_completed);
        assert_eq!(tasks[4].id, "e");
        assert_eq!(tasks[4].description, None);

        let ids: HashSet<_> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), tasks.len());
    }

    #[test]
    fn theme_round_trip_and_unknown_token() {
        let storage = Storage::in_memory();
        assert_eq!(storage.load_theme(), None);
        storage.save_theme(Theme::Dark).unwrap();
        assert_eq!(storage.load_theme(), Some(Theme::Dark));
        storage.save_theme(Theme::Light).unwrap();
        assert_eq!(storage.load_theme(), Some(Theme::Light));

        let storage = Storage::new(MemoryStore::with_entry(THEME_KEY, "purple"));
        assert_eq!(storage.load_theme(), None);
    }

    #[test]
    fn write_failures_surface_as_storage_error() {
        let storage = Storage::new(FailingStore);
        let err = storage.save_tasks(&[make_task("a", "x")]).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("quota exceeded"));
        assert!(storage.save_theme(Theme::Dark).is_err());
        assert_eq!(storage.load_theme(), None);
    }

    #[test]
    fn file_store_writes_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path().join("data"));
        files.ensure_dirs().unwrap();
        let root = files.root().to_path_buf();
        let storage = Storage::new(files);

        storage.save_tasks(&[make_task("a", "Buy milk")]).unwrap();
        storage.save_theme(Theme::Dark).unwrap();

        assert!(root.join(format!("{TASKS_KEY}.json")).is_file());
        assert_eq!(fs::read_to_string(root.join(THEME_KEY)).unwrap(), "dark");
        assert!(!root.join(format!("{TASKS_KEY}.tmp")).exists());

        let reopened = Storage::new(FileStore::new(root));
        assert_eq!(reopened.load_tasks().unwrap()[0].title, "Buy milk");
        assert_eq!(reopened.load_theme(), Some(Theme::Dark));
    }

    #[test]
    fn file_store_missing_file_is_absent_and_directory_in_the_way_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path().to_path_buf());
        assert!(files.get(TASKS_KEY).unwrap().is_none());

        fs::create_dir_all(files.path_for(THEME_KEY)).unwrap();
        assert!(files.get(THEME_KEY).is_err());
        assert!(files.set(THEME_KEY, "dark").is_err());
    }
}
