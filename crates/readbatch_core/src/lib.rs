//! Readbatch core: accounts, settings, parameter randomization and the task registry.
mod account;
mod error;
mod randomizer;
mod registry;
mod settings;
mod status;
mod task;
mod view_model;

pub use account::{parse_accounts, Credential};
pub use error::ValidationError;
pub use randomizer::{correlated_time, randomize, ReadingTargets, CORRELATION_WINDOW};
pub use registry::{StatusUpdate, TaskRegistry};
pub use settings::{BookMode, ReadingRanges, RunSettings};
pub use status::{is_terminal, StatusBucket, TaskStatus, TERMINAL_STATUSES};
pub use task::{
    SelectedBook, TaskId, TaskParams, TaskRecord, Tracking, QUEUED_MESSAGE, UNKNOWN_BOOK,
};
pub use view_model::{Summary, TaskRowView};
