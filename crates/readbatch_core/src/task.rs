use std::borrow::Borrow;
use std::fmt;

use crate::{BookMode, Credential, ReadingRanges, ReadingTargets, RunSettings, TaskStatus};

/// Book name shown until one has been chosen.
pub const UNKNOWN_BOOK: &str = "unknown";
/// Progress message of a freshly created task.
pub const QUEUED_MESSAGE: &str = "queued";

/// Run-unique task identifier, also echoed back by the remote service as `refer_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// `task_<localPart>_<submittedAtMs>_<index>`. The timestamp and ordinal keep
    /// ids unique even when two logins share a local part.
    pub fn generate(credential: &Credential, submitted_at_ms: u64, index: usize) -> Self {
        Self(format!(
            "task_{}_{}_{}",
            credential.local_part(),
            submitted_at_ms,
            index
        ))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Book resolved for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBook {
    pub slug: String,
    pub name: String,
}

/// Ranges the task was configured with plus, once computed, its concrete targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskParams {
    pub mode: BookMode,
    pub ranges: ReadingRanges,
    pub targets: Option<ReadingTargets>,
    pub book: Option<SelectedBook>,
}

impl TaskParams {
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            mode: settings.mode.clone(),
            ranges: settings.ranges,
            targets: None,
            book: None,
        }
    }
}

/// Who is currently responsible for advancing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Still driven by the orchestrator; not polled.
    Local,
    /// Running on the remote service; polled until terminal.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub credential: Credential,
    pub status: TaskStatus,
    pub progress_message: String,
    pub book_name: String,
    pub detail_message: Option<String>,
    pub params: TaskParams,
    pub tracking: Tracking,
}

impl TaskRecord {
    pub fn new(id: TaskId, credential: Credential, settings: &RunSettings) -> Self {
        Self {
            id,
            credential,
            status: TaskStatus::pending(),
            progress_message: QUEUED_MESSAGE.to_string(),
            book_name: UNKNOWN_BOOK.to_string(),
            detail_message: None,
            params: TaskParams::from_settings(settings),
            tracking: Tracking::Local,
        }
    }

    pub fn login(&self) -> &str {
        self.credential.login()
    }

    /// Non-terminal and handed to the remote service.
    pub fn is_pollable(&self) -> bool {
        self.tracking == Tracking::Remote && !self.status.is_terminal()
    }
}
