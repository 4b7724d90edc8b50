//! In-memory task registry: the single source of truth for task status.

use std::collections::{BTreeSet, HashMap};

use readbatch_logging::batch_warn;

use crate::{
    Credential, ReadingTargets, RunSettings, SelectedBook, Summary, TaskId, TaskRecord,
    TaskStatus, Tracking,
};

/// Input to [`TaskRegistry::set_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub progress_message: String,
    pub book_name: Option<String>,
    pub detail_message: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: impl Into<TaskStatus>, progress_message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            progress_message: progress_message.into(),
            book_name: None,
            detail_message: None,
        }
    }

    pub fn with_book(mut self, book_name: impl Into<String>) -> Self {
        self.book_name = Some(book_name.into());
        self
    }

    pub fn with_detail(mut self, detail_message: Option<String>) -> Self {
        self.detail_message = detail_message;
        self
    }
}

/// Records of one run, in submission order.
///
/// Records are never removed; a new run starts from a fresh registry. Status
/// only changes through [`TaskRegistry::set_status`], and every call refreshes
/// the summary and the active set so polling membership is never stale.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, TaskRecord>,
    active: BTreeSet<TaskId>,
    summary: Summary,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one `pending` record per account.
    pub fn from_accounts(
        accounts: &[Credential],
        settings: &RunSettings,
        submitted_at_ms: u64,
    ) -> Self {
        let mut registry = Self::new();
        for (index, credential) in accounts.iter().enumerate() {
            let id = TaskId::generate(credential, submitted_at_ms, index);
            let record = TaskRecord::new(id.clone(), credential.clone(), settings);
            registry.order.push(id.clone());
            registry.tasks.insert(id, record);
        }
        registry.recompute();
        registry
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        self.active.iter().cloned().collect()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Applies a status change. Returns `false` and leaves the registry
    /// untouched when `id` is unknown.
    ///
    /// `status` and the progress message are always overwritten; the book name
    /// and the detail message only when a non-empty value is supplied, and the
    /// detail only when it differs from the progress message.
    pub fn set_status(&mut self, id: &str, update: StatusUpdate) -> bool {
        let Some(record) = self.tasks.get_mut(id) else {
            batch_warn!("status update for unknown task id {}", id);
            return false;
        };

        record.status = update.status;
        record.progress_message = update.progress_message;
        if let Some(book_name) = update.book_name.filter(|name| !name.is_empty()) {
            record.book_name = book_name;
        }
        if let Some(detail) = update
            .detail_message
            .filter(|detail| !detail.is_empty() && *detail != record.progress_message)
        {
            record.detail_message = Some(detail);
        }

        self.recompute();
        true
    }

    /// Stores the resolved book and the computed targets on the record.
    pub fn attach_targets(&mut self, id: &str, book: SelectedBook, targets: ReadingTargets) -> bool {
        let Some(record) = self.tasks.get_mut(id) else {
            batch_warn!("targets for unknown task id {}", id);
            return false;
        };
        record.params.book = Some(book);
        record.params.targets = Some(targets);
        true
    }

    /// Marks the task as running remotely. Takes effect on the next recompute,
    /// which the following `set_status` performs.
    pub fn mark_remote(&mut self, id: &str) -> bool {
        match self.tasks.get_mut(id) {
            Some(record) => {
                record.tracking = Tracking::Remote;
                true
            }
            None => {
                batch_warn!("remote hand-off for unknown task id {}", id);
                false
            }
        }
    }

    /// Ids of tasks still waiting for the orchestrator.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.records()
            .filter(|record| record.status.is(TaskStatus::PENDING))
            .map(|record| record.id.clone())
            .collect()
    }

    /// Ids of non-terminal tasks that left the orchestrator's hands.
    pub fn remote_unfinished_ids(&self) -> Vec<TaskId> {
        self.records()
            .filter(|record| record.tracking == Tracking::Remote && !record.status.is_terminal())
            .map(|record| record.id.clone())
            .collect()
    }

    /// Rebuilds summary counters and the active set from the records.
    pub fn recompute(&mut self) {
        let mut summary = Summary::default();
        self.active.clear();
        for id in &self.order {
            let Some(record) = self.tasks.get(id) else {
                continue;
            };
            summary.count(record);
            if record.is_pollable() {
                self.active.insert(id.clone());
            }
        }
        summary.active = self.active.len();
        self.summary = summary;
    }
}
