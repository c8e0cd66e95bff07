use crate::models::{Task, Theme};

/// Emitted by the store after each change, once the new state has been flushed (or failed to).
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    TasksChanged { tasks: Vec<Task> },
    ThemeChanged { theme: Theme },
    PersistFailed { key: &'static str, error: String },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub tasks: Vec<Task>,
    pub theme: Theme,
}
