use chrono::NaiveDate;

use crate::models::{StatusFilter, TaskDraft, TaskId, TaskPatch, Theme, DUE_DATE_FORMAT};
use crate::state::{StoreError, TaskStore};
use crate::view::{project, Projection, ViewQuery};

pub const TITLE_REQUIRED: &str = "Title is required.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit(TaskId),
}

/// Field values of the add/edit modal, kept as raw text until submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub mode: FormMode,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub title_error: Option<String>,
}

impl TaskForm {
    fn blank() -> Self {
        Self {
            mode: FormMode::New,
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            title_error: None,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::New => "Add New Task",
            FormMode::Edit(_) => "Edit Task",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::New => "Add Task",
            FormMode::Edit(_) => "Save Changes",
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if !self.title.trim().is_empty() {
            self.title_error = None;
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_due_date(&mut self, due_date: impl Into<String>) {
        self.due_date = due_date.into();
    }
}

/// Headless task board: search text, status filter and the add/edit modal.
///
/// Reads through a shared store handle. A submitted form with a blank title stays open
/// with an error.
pub struct TaskBoard {
    store: TaskStore,
    query: ViewQuery,
    form: Option<TaskForm>,
}

impl TaskBoard {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            query: ViewQuery::default(),
            form: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn search_term(&self) -> &str {
        &self.query.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.query.search_term = term.into();
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.query.status_filter
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.query.status_filter = filter;
    }

    pub fn visible(&self) -> Projection {
        project(&self.store.all(), &self.query)
    }

    pub fn theme(&self) -> Theme {
        self.store.theme()
    }

    pub fn toggle_theme(&self) -> Theme {
        self.store.toggle_theme()
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        self.form.as_mut()
    }

    pub fn is_modal_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn open_new(&mut self) {
        self.form = Some(TaskForm::blank());
    }

    /// Opens the edit form prefilled from the stored task.
    pub fn open_edit(&mut self, id: &str) -> Result<(), StoreError> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.form = Some(TaskForm {
            mode: FormMode::Edit(task.id),
            title: task.title,
            description: task.description.unwrap_or_default(),
            due_date: task
                .due_date
                .map(|d: NaiveDate| d.format(DUE_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            title_error: None,
        });
        Ok(())
    }

    /// Escape key, overlay click and the cancel button all end here.
    pub fn close(&mut self) {
        self.form = None;
    }

    /// Submits the open form. Returns `Ok(false)` when no form is open or the title is
    /// blank; the form then stays open.
    pub fn submit(&mut self) -> Result<bool, StoreError> {
        let Some(form) = self.form.as_mut() else {
            return Ok(false);
        };
        if form.title.trim().is_empty() {
            form.title_error = Some(TITLE_REQUIRED.to_string());
            return Ok(false);
        }
        form.title_error = None;

        let result = match &form.mode {
            FormMode::New => self
                .store
                .create(TaskDraft {
                    title: form.title.clone(),
                    description: Some(form.description.clone()),
                    due_date: Some(form.due_date.clone()),
                })
                .map(|_| ()),
            FormMode::Edit(id) => self
                .store
                .update(
                    id,
                    TaskPatch {
                        title: Some(form.title.clone()),
                        description: Some(form.description.clone()),
                        due_date: Some(form.due_date.clone()),
                    },
                )
                .map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.form = None;
                Ok(true)
            }
            Err(error) => {
                log::debug!("event=form_submit status=rejected error={error}");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::view::EmptyState;

    fn make_board() -> TaskBoard {
        TaskBoard::new(TaskStore::new(Storage::in_memory()))
    }

    #[test]
    fn new_form_creates_task_and_closes() {
        let mut board = make_board();
        assert_eq!(board.visible().empty_state(), Some(EmptyState::NoTasks));

        board.open_new();
        let form = board.form_mut().unwrap();
        assert_eq!(form.heading(), "Add New Task");
        assert_eq!(form.submit_label(), "Add Task");
        form.set_title("  Buy milk ");
        form.set_description("   ");

        assert_eq!(board.submit(), Ok(true));
        assert!(!board.is_modal_open());
        let tasks = board.store().all();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].description, None);
        assert_eq!(tasks[0].due_date, None);
    }

    #[test]
    fn blank_title_keeps_form_open_with_error_until_fixed() {
        let mut board = make_board();
        board.open_new();
        board.form_mut().unwrap().set_title("   ");

        assert_eq!(board.submit(), Ok(false));
        assert!(board.is_modal_open());
        assert_eq!(
            board.form().unwrap().title_error.as_deref(),
            Some(TITLE_REQUIRED)
        );
        assert!(board.store().is_empty());

        board.form_mut().unwrap().set_title("x");
        assert_eq!(board.form().unwrap().title_error, None);
    }

    #[test]
    fn edit_form_prefills_and_updates_in_place() {
        let mut board = make_board();
        let first = board
            .store()
            .create(
                TaskDraft::new("Pay rent")
                    .description("landlord")
                    .due_date("2024-01-01"),
            )
            .unwrap();
        let second = board.store().create(TaskDraft::new("Buy milk")).unwrap();
        board.store().toggle_complete(&first.id).unwrap();

        board.open_edit(&first.id).unwrap();
        let form = board.form_mut().unwrap();
        assert_eq!(form.heading(), "Edit Task");
        assert_eq!(form.submit_label(), "Save Changes");
        assert_eq!(form.title, "Pay rent");
        assert_eq!(form.description, "landlord");
        assert_eq!(form.due_date, "2024-01-01");
        form.set_title("Pay rent (Jan)");
        form.set_due_date("");

        assert_eq!(board.submit(), Ok(true));
        let tasks = board.store().all();
        assert_eq!(tasks[0].id, second.id);
        assert_eq!(tasks[1].id, first.id);
        assert_eq!(tasks[1].title, "Pay rent (Jan)");
        assert_eq!(tasks[1].due_date, None);
        assert!(tasks[1].is_completed);
    }

    #[test]
    fn edit_missing_task_and_stale_form() {
        let mut board = make_board();
        assert!(matches!(
            board.open_edit("missing"),
            Err(StoreError::NotFound(_))
        ));
        assert!(!board.is_modal_open());

        let task = board.store().create(TaskDraft::new("gone soon")).unwrap();
        board.open_edit(&task.id).unwrap();
        board.store().remove(&task.id).unwrap();
        assert!(matches!(board.submit(), Err(StoreError::NotFound(_))));
        assert!(board.is_modal_open());
    }

    #[test]
    fn close_discards_form_and_submit_without_form_is_noop() {
        let mut board = make_board();
        board.open_new();
        board.form_mut().unwrap().set_title("draft");
        board.close();
        assert!(!board.is_modal_open());
        assert_eq!(board.submit(), Ok(false));
        assert!(board.store().is_empty());
    }

    #[test]
    fn search_and_filter_drive_visible_list() {
        let mut board = make_board();
        let milk = board.store().create(TaskDraft::new("Buy milk")).unwrap();
        board.store().create(TaskDraft::new("Pay rent")).unwrap();
        board.store().toggle_complete(&milk.id).unwrap();

        board.set_search_term("MILK");
        assert_eq!(board.search_term(), "MILK");
        assert_eq!(board.visible().tasks.len(), 1);

        board.set_status_filter(StatusFilter::Active);
        assert_eq!(board.status_filter(), StatusFilter::Active);
        let view = board.visible();
        assert!(view.tasks.is_empty());
        assert_eq!(view.empty_state(), Some(EmptyState::NoMatches));

        board.set_search_term("");
        assert_eq!(board.visible().tasks[0].title, "Pay rent");
    }

    #[test]
    fn theme_toggle_goes_through_store() {
        let board = make_board();
        assert_eq!(board.theme(), Theme::Light);
        assert_eq!(board.toggle_theme(), Theme::Dark);
        assert_eq!(board.store().theme(), Theme::Dark);
    }
}
