use serde::Serialize;

use crate::models::{StatusFilter, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub search_term: String,
    pub status_filter: StatusFilter,
}

impl ViewQuery {
    pub fn new(search_term: impl Into<String>, status_filter: StatusFilter) -> Self {
        Self {
            search_term: search_term.into(),
            status_filter,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    /// Nothing has been created yet.
    NoTasks,
    /// Tasks exist but the search or filter hides all of them.
    NoMatches,
}

impl EmptyState {
    pub fn headline(self) -> &'static str {
        "No tasks found"
    }

    pub fn hint(self) -> &'static str {
        match self {
            EmptyState::NoTasks => "Get started by adding a new task.",
            EmptyState::NoMatches => "Try adjusting your search or filter.",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Projection {
    pub tasks: Vec<Task>,
    pub collection_empty: bool,
    pub no_matches: bool,
}

impl Projection {
    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.collection_empty {
            Some(EmptyState::NoTasks)
        } else if self.no_matches {
            Some(EmptyState::NoMatches)
        } else {
            None
        }
    }
}

pub fn matches_search(task: &Task, search_term: &str) -> bool {
    search_term.is_empty() || task.title.to_lowercase().contains(&search_term.to_lowercase())
}

pub fn project(tasks: &[Task], query: &ViewQuery) -> Projection {
    let visible: Vec<Task> = tasks
        .iter()
        .filter(|task| matches_search(task, &query.search_term))
        .filter(|task| query.status_filter.accepts(task))
        .cloned()
        .collect();
    let collection_empty = tasks.is_empty();
    Projection {
        no_matches: !collection_empty && visible.is_empty(),
        collection_empty,
        tasks: visible,
    }
}
