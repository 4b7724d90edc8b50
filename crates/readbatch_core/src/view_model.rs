use crate::{StatusBucket, TaskId, TaskRecord};

/// Aggregate counters shown next to the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub error: usize,
    /// Tasks currently eligible for progress polling.
    pub active: usize,
}

impl Summary {
    pub(crate) fn count(&mut self, record: &TaskRecord) {
        self.total += 1;
        match record.status.bucket() {
            StatusBucket::Pending => self.pending += 1,
            StatusBucket::Running => self.running += 1,
            StatusBucket::Completed => self.completed += 1,
            StatusBucket::Failed => self.error += 1,
        }
    }
}

/// One table row. Carries no credentials beyond the login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub task_id: TaskId,
    pub login: String,
    pub status: String,
    pub progress_message: String,
    pub book_name: String,
    pub detail_message: Option<String>,
}

impl From<&TaskRecord> for TaskRowView {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.id.clone(),
            login: record.login().to_string(),
            status: record.status.to_string(),
            progress_message: record.progress_message.clone(),
            book_name: record.book_name.clone(),
            detail_message: record.detail_message.clone(),
        }
    }
}
