//! Cached task collection plus the user's view filters.
//!
//! The backend is the source of truth; this is the last fetch, replaced
//! wholesale by [`TaskStore::set_tasks`]. Concurrent fetches resolve
//! last-write-wins with no version check.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{StatusFilter, Task, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    selected: Option<Task>,
    filter_status: StatusFilter,
    search_query: String,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection with a fresh fetch.
    ///
    /// A selection whose id did not survive the fetch is cleared; one that
    /// did is refreshed to the fetched value.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        if let Some(id) = self.selected.as_ref().map(|s| s.id) {
            self.selected = self.tasks.iter().find(|t| t.id == id).cloned();
        }
    }

    /// Optimistic local insert at the front. Does not talk to the backend.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Replace the cached task with the same id. No-op when absent.
    pub fn update_task(&mut self, task: Task) {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return;
        };
        if self.selected.as_ref().is_some_and(|s| s.id == task.id) {
            self.selected = Some(task.clone());
        }
        *slot = task;
    }

    /// Drop the task with `id`, clearing the selection if it pointed there.
    pub fn remove_task(&mut self, id: i64) {
        self.tasks.retain(|t| t.id != id);
        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            self.selected = None;
        }
    }

    /// Select a task. Selecting something not in the collection clears the
    /// selection instead.
    pub fn set_selected_task(&mut self, task: Option<Task>) {
        self.selected = task.and_then(|t| {
            self.tasks
                .iter()
                .any(|cached| cached.id == t.id)
                .then_some(t)
        });
    }

    pub fn set_filter_status(&mut self, status: impl Into<StatusFilter>) {
        self.filter_status = status.into();
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected.as_ref()
    }

    pub fn filter_status(&self) -> StatusFilter {
        self.filter_status
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The visible list: status filter AND search query, in collection order.
    /// Recomputed on every call.
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        let needle = self.search_query.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| self.filter_status.accepts(t.status))
            .filter(|t| needle.is_empty() || t.matches_query(&needle))
            .collect()
    }

    /// Whether any filter is active, for "no results" vs "no tasks" messages.
    pub fn is_filtered(&self) -> bool {
        self.filter_status != StatusFilter::All || !self.search_query.is_empty()
    }

    pub fn overview(&self, now: NaiveDateTime) -> TaskOverview {
        TaskOverview::from_tasks(&self.tasks, now)
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskOverview {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue: usize,
}

impl TaskOverview {
    pub fn from_tasks(tasks: &[Task], now: NaiveDateTime) -> Self {
        let mut overview = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Todo => overview.todo += 1,
                TaskStatus::InProgress => overview.in_progress += 1,
                TaskStatus::Completed => overview.completed += 1,
                TaskStatus::Cancelled => overview.cancelled += 1,
            }
            if task.is_overdue_at(now) {
                overview.overdue += 1;
            }
        }
        overview
    }
}

/// The `limit` most recently created tasks, newest first.
pub fn recent_tasks(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(limit);
    sorted
}
