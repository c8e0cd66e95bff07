pub mod commands;
pub mod events;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod surface;
pub mod view;

use std::path::PathBuf;

pub use crate::events::{StatePayload, StoreEvent};
pub use crate::models::{StatusFilter, Task, TaskDraft, TaskId, TaskPatch, Theme};
pub use crate::state::{StoreError, TaskStore};
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore, Storage, StorageError};
pub use crate::surface::{TaskBoard, TaskForm};
pub use crate::view::{project, EmptyState, Projection, ViewQuery};

pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

/// Opens the file-backed store for `config.data_dir` and loads whatever it holds.
pub fn open(config: &StoreConfig) -> Result<TaskStore, StorageError> {
    let files = FileStore::new(config.data_dir.clone());
    files.ensure_dirs()?;
    let store = TaskStore::new(Storage::new(files));
    store.load();
    Ok(store)
}

/// Starts file logging in the data directory, then opens the store.
#[cfg(all(feature = "app", not(test)))]
pub fn run(config: &StoreConfig) -> Result<TaskStore, Box<dyn std::error::Error>> {
    logging::init_logging(&config.data_dir)?;
    let store = open(config)?;
    log::info!(
        "event=app_start version={} tasks={} theme={}",
        env!("CARGO_PKG_VERSION"),
        store.len(),
        store.theme().as_token()
    );
    Ok(store)
}
