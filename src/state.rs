use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::StoreEvent;
use crate::models::{
    new_task_id, normalize_optional, parse_due_date, Task, TaskDraft, TaskPatch, Theme,
};
use crate::storage::{Storage, StorageError, TASKS_KEY, THEME_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(String),
    NotFound(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Validation(message) => write!(f, "validation error: {message}"),
            StoreError::NotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub type Observer = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Owner of the task collection and the theme flag.
///
/// Clones share the same state. Mutators run one at a time: the `writer` lock is held from
/// the state change through the storage flush and observer notification, so storage always ends up
/// with the latest snapshot and observers see changes in order. Readers only take `inner`,
/// so observers may read the store. Observers must not call mutators; that deadlocks.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<StoreData>>,
    writer: Arc<Mutex<()>>,
    storage: Arc<Storage>,
    observers: Arc<Mutex<Vec<Observer>>>,
}

impl TaskStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreData::default())),
            writer: Arc::new(Mutex::new(())),
            storage: Arc::new(storage),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replaces tasks and theme with whatever storage holds. Missing or unreadable data
    /// starts empty and light.
    pub fn load(&self) {
        let _writer = self.begin_write();
        let tasks = self.storage.load_tasks().unwrap_or_default();
        let theme = self.storage.load_theme().unwrap_or_default();
        log::info!(
            "event=store_load tasks={} theme={}",
            tasks.len(),
            theme.as_token()
        );
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks = tasks;
        guard.theme = theme;
    }

    pub fn subscribe(&self, observer: impl Fn(&StoreEvent) + Send + Sync + 'static) {
        let mut guard = self.observers.lock().expect("observers poisoned");
        guard.push(Arc::new(observer));
    }

    pub fn all(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let title = require_title(&draft.title)?;
        let due_date = match normalize_optional(draft.due_date.as_deref()) {
            Some(raw) => Some(require_due_date(&raw)?),
            None => None,
        };

        let _writer = self.begin_write();
        let (task, snapshot) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let task = Task {
                id: guard.fresh_id(),
                title,
                description: normalize_optional(draft.description.as_deref()),
                due_date,
                is_completed: false,
            };
            guard.tasks.insert(0, task.clone());
            (task, guard.tasks.clone())
        };

        log::debug!("event=task_create id={}", task.id);
        self.flush_tasks(snapshot);
        Ok(task)
    }

    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let _writer = self.begin_write();
        let (task, snapshot) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let existing = guard
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            let title = patch.title.as_deref().map(require_title).transpose()?;
            let due_date = match patch.due_date.as_deref() {
                None => None,
                Some(raw) => match normalize_optional(Some(raw)) {
                    None => Some(None),
                    Some(raw) => Some(Some(require_due_date(&raw)?)),
                },
            };

            if let Some(title) = title {
                existing.title = title;
            }
            if let Some(description) = patch.description.as_deref() {
                existing.description = normalize_optional(Some(description));
            }
            if let Some(due_date) = due_date {
                existing.due_date = due_date;
            }
            let task = existing.clone();
            (task, guard.tasks.clone())
        };

        log::debug!("event=task_update id={id}");
        self.flush_tasks(snapshot);
        Ok(task)
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let _writer = self.begin_write();
        let snapshot = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let index = guard
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            guard.tasks.remove(index);
            guard.tasks.clone()
        };

        log::debug!("event=task_remove id={id}");
        self.flush_tasks(snapshot);
        Ok(())
    }

    pub fn toggle_complete(&self, id: &str) -> Result<Task, StoreError> {
        let _writer = self.begin_write();
        let (task, snapshot) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let existing = guard
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            existing.is_completed = !existing.is_completed;
            let task = existing.clone();
            (task, guard.tasks.clone())
        };

        log::debug!(
            "event=task_toggle id={id} completed={}",
            task.is_completed
        );
        self.flush_tasks(snapshot);
        Ok(task)
    }

    pub fn theme(&self) -> Theme {
        let guard = self.inner.lock().expect("state poisoned");
        guard.theme
    }

    pub fn toggle_theme(&self) -> Theme {
        let _writer = self.begin_write();
        let theme = {
            let mut guard = self.inner.lock().expect("state poisoned");
            guard.theme = guard.theme.toggled();
            guard.theme
        };
        self.flush_theme(theme);
        theme
    }

    pub fn set_theme(&self, theme: Theme) {
        let _writer = self.begin_write();
        {
            let mut guard = self.inner.lock().expect("state poisoned");
            guard.theme = theme;
        }
        self.flush_theme(theme);
    }

    // Guards no data, so a panic in an earlier writer (e.g. an observer) is not fatal.
    fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush_tasks(&self, tasks: Vec<Task>) {
        if let Err(error) = self.storage.save_tasks(&tasks) {
            self.report_persist_failure(TASKS_KEY, error);
        }
        self.notify(&StoreEvent::TasksChanged { tasks });
    }

    fn flush_theme(&self, theme: Theme) {
        if let Err(error) = self.storage.save_theme(theme) {
            self.report_persist_failure(THEME_KEY, error);
        }
        self.notify(&StoreEvent::ThemeChanged { theme });
    }

    // In-memory state stays as mutated; the change may just not survive a reload.
    fn report_persist_failure(&self, key: &'static str, error: StorageError) {
        log::warn!("event=persist status=error key={key} error={error}");
        self.notify(&StoreEvent::PersistFailed {
            key,
            error: error.to_string(),
        });
    }

    fn notify(&self, event: &StoreEvent) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .expect("observers poisoned")
            .clone();
        for observer in observers {
            observer(event);
        }
    }
}

#[derive(Debug, Default)]
struct StoreData {
    tasks: Vec<Task>,
    theme: Theme,
}

impl StoreData {
    fn fresh_id(&self) -> String {
        let taken: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        let mut id = new_task_id();
        while taken.contains(id.as_str()) {
            id = new_task_id();
        }
        id
    }
}

fn require_title(raw: &str) -> Result<String, StoreError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("title is required".to_string()));
    }
    Ok(title.to_string())
}

fn require_due_date(raw: &str) -> Result<chrono::NaiveDate, StoreError> {
    parse_due_date(raw)
        .ok_or_else(|| StoreError::Validation(format!("invalid due date: {raw}")))
}
