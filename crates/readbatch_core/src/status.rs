//! Task status vocabulary and terminal-state classification.
//!
//! Statuses after `starting_task` come from the remote service and are not
//! enumerated here; they are carried as opaque strings. Only the terminal
//! markers are closed, and they are matched case-insensitively.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Statuses after which no further progress is expected for a task.
pub const TERMINAL_STATUSES: [&str; 6] = [
    "completed",
    "error",
    "failed",
    "canceled",
    "inactive",
    "not_found",
];

/// Opaque task status. The stored value keeps its original case for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskStatus(String);

/// Which summary counter a status contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const PENDING: &'static str = "pending";
    pub const AUTHENTICATING: &'static str = "authenticating";
    pub const LOGGED_IN: &'static str = "logged_in";
    pub const SELECTING_BOOK: &'static str = "selecting_book";
    pub const BOOK_SELECTED: &'static str = "book_selected";
    pub const STARTING_TASK: &'static str = "starting_task";
    pub const STARTED: &'static str = "started";
    pub const COMPLETED: &'static str = "completed";
    pub const ERROR: &'static str = "error";
    pub const CANCELED: &'static str = "canceled";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn pending() -> Self {
        Self::new(Self::PENDING)
    }

    pub fn error() -> Self {
        Self::new(Self::ERROR)
    }

    pub fn canceled() -> Self {
        Self::new(Self::CANCELED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a status name.
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal(&self.0)
    }

    pub fn bucket(&self) -> StatusBucket {
        if self.is(Self::PENDING) {
            StatusBucket::Pending
        } else if self.is(Self::COMPLETED) {
            StatusBucket::Completed
        } else if self.is_terminal() {
            StatusBucket::Failed
        } else {
            StatusBucket::Running
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Classifies a raw status string, ignoring case.
pub fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES
        .iter()
        .any(|terminal| terminal.eq_ignore_ascii_case(status))
}
