//! Readbatch engine: remote API client, task orchestration and progress polling.
mod client;
mod engine;
mod orchestrator;
mod poller;
mod store;
mod types;

pub use client::{BookApi, BookQuery, ClientSettings, ReqwestBookApi};
pub use engine::{execute_run, Clock, EngineConfig, EngineHandle, RunReport, StopHandle};
pub use orchestrator::{Orchestrator, MAX_ERROR_CHARS};
pub use poller::{ProgressPoller, TickOutcome, DEFAULT_POLL_INTERVAL};
pub use store::{ChannelEventSink, EventSink, TaskStore};
pub use types::{
    Book, ClientError, EngineEvent, OrchestrationError, ProgressBatch, ProgressEntry,
    ProgressPayload, StartTask, StartedTask,
};
