use std::collections::HashMap;

use readbatch_core::{
    ReadingTargets, SelectedBook, Summary, TaskId, TaskRecord, TaskRowView, ValidationError,
};
use serde::Deserialize;
use thiserror::Error;

/// Book as returned by the lookup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Book {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Book {
    pub fn with_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: None,
        }
    }

    /// Remote name, or a placeholder built from the slug.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("book (slug: {})", self.slug),
        }
    }

    pub fn into_selected(self) -> SelectedBook {
        SelectedBook {
            name: self.display_name(),
            slug: self.slug,
        }
    }
}

/// Remote view of one task. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProgressEntry {
    pub status: Option<String>,
    #[serde(rename = "progresso")]
    pub progress_message: Option<String>,
    pub book_name: Option<String>,
    pub message: Option<String>,
}

/// One value of the progress mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressPayload {
    Entry(ProgressEntry),
    /// Anything that is not an object with string fields.
    Malformed(serde_json::Value),
}

pub type ProgressBatch = HashMap<String, ProgressPayload>;

/// Everything needed to submit one remote reading task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTask {
    pub task_id: TaskId,
    pub book: SelectedBook,
    pub targets: ReadingTargets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedTask {
    pub task_id: TaskId,
    /// Present when the service reported a status object with a `status` field.
    pub initial_status: Option<ProgressEntry>,
}

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No response: connection failure, broken body, or timeout.
    #[error("network error: {message}")]
    Network { message: String, timeout: bool },
    /// Login rejected, or a success response without a token.
    #[error("authentication failed: {message}")]
    Auth { status: Option<u16>, message: String },
    /// Non-2xx from a book endpoint, or `status: None` when the response broke
    /// its structural contract.
    #[error("{endpoint} failed: {message}")]
    Api {
        status: Option<u16>,
        endpoint: String,
        message: String,
    },
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// The service answered, but not in the agreed shape.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ClientError::Api { status: None, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. } | ClientError::Api { status, .. } => *status,
            ClientError::Network { .. } | ClientError::InvalidUrl(_) => None,
        }
    }
}

/// Failure of one account's pipeline. Never escapes that account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    #[error("book api failed ({mode}): {source}")]
    BookLookup {
        mode: &'static str,
        source: ClientError,
    },
    #[error("{0}")]
    NoBooks(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to start remote task (unexpected response): {0}")]
    UnexpectedResponse(ClientError),
    #[error("failed to start remote task: {0}")]
    StartTask(ClientError),
}

/// Notifications for the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TaskChanged(TaskRowView),
    SummaryChanged(Summary),
    PollingChanged { active: bool },
    RunFinished {
        stopped: bool,
        summary: Summary,
        records: Vec<TaskRecord>,
    },
}
