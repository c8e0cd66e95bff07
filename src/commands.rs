use crate::events::StatePayload;
use crate::models::{StatusFilter, Task, TaskDraft, TaskPatch, Theme};
use crate::state::{StoreError, TaskStore};
use crate::view::{project, Projection, ViewQuery};

pub const DELETE_PROMPT: &str =
    "Are you sure you want to delete this task? This action cannot be undone.";

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Host-side hooks a front-end provides to the command handlers.
pub trait CommandCtx {
    /// Blocking confirmation before a destructive delete.
    fn confirm_delete(&self, task: &Task, prompt: &str) -> bool;
    fn emit_state_updated(&self, payload: StatePayload);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn store_err<T>(error: StoreError) -> CommandResult<T> {
    err(&error.to_string())
}

fn emit(ctx: &impl CommandCtx, store: &TaskStore) {
    let payload = StatePayload {
        tasks: store.all(),
        theme: store.theme(),
    };
    ctx.emit_state_updated(payload);
}

pub fn load_state(store: &TaskStore) -> CommandResult<StatePayload> {
    store.load();
    ok(StatePayload {
        tasks: store.all(),
        theme: store.theme(),
    })
}

pub fn list_tasks(
    store: &TaskStore,
    search_term: String,
    status_filter: String,
) -> CommandResult<Projection> {
    let status_filter = match StatusFilter::parse(&status_filter) {
        Some(filter) => filter,
        None => return err(&format!("unknown status filter: {status_filter}")),
    };
    let query = ViewQuery::new(search_term, status_filter);
    ok(project(&store.all(), &query))
}

pub fn create_task(ctx: &impl CommandCtx, store: &TaskStore, draft: TaskDraft) -> CommandResult<Task> {
    let task = match store.create(draft) {
        Ok(task) => task,
        Err(error) => return store_err(error),
    };
    emit(ctx, store);
    ok(task)
}

pub fn update_task(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    task_id: String,
    patch: TaskPatch,
) -> CommandResult<Task> {
    let task = match store.update(&task_id, patch) {
        Ok(task) => task,
        Err(error) => return store_err(error),
    };
    emit(ctx, store);
    ok(task)
}

pub fn toggle_complete(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    task_id: String,
) -> CommandResult<Task> {
    let task = match store.toggle_complete(&task_id) {
        Ok(task) => task,
        Err(error) => return store_err(error),
    };
    emit(ctx, store);
    ok(task)
}

/// Returns `ok(false)` when the user declines the confirmation prompt.
pub fn delete_task(ctx: &impl CommandCtx, store: &TaskStore, task_id: String) -> CommandResult<bool> {
    let task = match store.get(&task_id) {
        Some(task) => task,
        None => return store_err(StoreError::NotFound(task_id)),
    };
    if !ctx.confirm_delete(&task, DELETE_PROMPT) {
        log::debug!("event=task_delete id={task_id} status=declined");
        return ok(false);
    }
    if let Err(error) = store.remove(&task_id) {
        return store_err(error);
    }
    emit(ctx, store);
    ok(true)
}

pub fn toggle_theme(ctx: &impl CommandCtx, store: &TaskStore) -> CommandResult<Theme> {
    let theme = store.toggle_theme();
    emit(ctx, store);
    ok(theme)
}
