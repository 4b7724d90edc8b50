#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, Once};

use readbatch_core::{parse_accounts, RunSettings, StatusUpdate, TaskId, TaskRegistry};
use readbatch_engine::{
    Book, BookApi, BookQuery, ClientError, EngineEvent, EventSink, ProgressBatch, ProgressEntry,
    StartTask, StartedTask, TaskStore,
};
use tokio_util::sync::CancellationToken;

pub const SUBMITTED_AT: u64 = 1_700_000_000_000;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(readbatch_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Every status a task went through, in order.
    pub fn statuses_for(&self, id: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::TaskChanged(row) if row.task_id.as_str() == id => Some(row.status),
                _ => None,
            })
            .collect()
    }

    pub fn polling_changes(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::PollingChanged { active } => Some(active),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scriptable in-memory stand-in for the remote service.
#[derive(Default)]
pub struct FakeApi {
    pub failing_logins: HashSet<String>,
    pub login_error_message: String,
    pub books: Vec<Book>,
    /// Returned by every book lookup instead of `books`.
    pub books_error: Option<ClientError>,
    pub start_echo_mismatch: bool,
    pub initial_status: Option<ProgressEntry>,
    /// Cancelled from inside the first `start_task` call.
    pub stop_on_start: Option<CancellationToken>,
    pub progress: Mutex<VecDeque<Result<ProgressBatch, ClientError>>>,
    /// Every call in order, e.g. `login:alice` or `progress:2`.
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn push_progress(&self, response: Result<ProgressBatch, ClientError>) {
        self.progress.lock().unwrap().push_back(response);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl BookApi for FakeApi {
    async fn login(&self, login: &str, _password: &str) -> Result<String, ClientError> {
        self.record(format!("login:{login}"));
        if self.failing_logins.contains(login) {
            let message = if self.login_error_message.is_empty() {
                "invalid credentials".to_string()
            } else {
                self.login_error_message.clone()
            };
            return Err(ClientError::Auth {
                status: Some(401),
                message,
            });
        }
        Ok(format!("token-for-{login}"))
    }

    async fn find_books(&self, query: BookQuery<'_>, _token: &str) -> Result<Vec<Book>, ClientError> {
        match query {
            BookQuery::Search(term) => self.record(format!("books:search:{term}")),
            other => self.record(format!("books:{}", other.label())),
        }
        match &self.books_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.books.clone()),
        }
    }

    async fn start_task(&self, _token: &str, request: &StartTask) -> Result<StartedTask, ClientError> {
        self.record(format!("start:{}", request.task_id));
        if let Some(stop) = &self.stop_on_start {
            stop.cancel();
        }
        if self.start_echo_mismatch {
            return Err(ClientError::Api {
                status: None,
                endpoint: "/start_read_book_task".to_string(),
                message: "echoed refer_id does not match".to_string(),
            });
        }
        Ok(StartedTask {
            task_id: request.task_id.clone(),
            initial_status: self.initial_status.clone(),
        })
    }

    async fn fetch_progress(&self, task_ids: &[TaskId]) -> Result<ProgressBatch, ClientError> {
        self.record(format!("progress:{}", task_ids.len()));
        self.progress
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ProgressBatch::new()))
    }
}

pub fn store_for(raw_accounts: &str, settings: &RunSettings) -> (TaskStore, Arc<RecordingSink>) {
    let accounts = parse_accounts(raw_accounts).unwrap();
    let registry = TaskRegistry::from_accounts(&accounts, settings, SUBMITTED_AT);
    let sink = Arc::new(RecordingSink::default());
    (TaskStore::new(registry, sink.clone()), sink)
}

/// Puts a task into the remote-running state the poller works on.
pub fn start_remotely(store: &TaskStore, id: &str) {
    assert!(store.hand_off(
        id,
        StatusUpdate::new("started", "task started via api").with_book("Dom Casmurro"),
    ));
}

pub fn task_id(local: &str, index: usize) -> String {
    format!("task_{local}_{SUBMITTED_AT}_{index}")
}
