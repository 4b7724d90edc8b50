//! Sequential per-account pipeline: login, book selection, parameters, remote start.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use readbatch_core::{
    randomize, BookMode, Credential, RunSettings, StatusUpdate, TaskId, TaskStatus,
    ValidationError,
};
use readbatch_logging::{batch_debug, batch_error, batch_info, batch_warn, redact};
use tokio_util::sync::CancellationToken;

use crate::{Book, BookApi, BookQuery, OrchestrationError, StartTask, TaskStore};

/// Longest error text stored on a task.
pub const MAX_ERROR_CHARS: usize = 100;
const MAX_BOOK_NAME_CHARS: usize = 50;

pub struct Orchestrator {
    api: Arc<dyn BookApi>,
    store: TaskStore,
    settings: RunSettings,
    rng: StdRng,
}

impl Orchestrator {
    /// `seed` pins the book picks and reading targets; `None` seeds from entropy.
    pub fn new(
        api: Arc<dyn BookApi>,
        store: TaskStore,
        settings: RunSettings,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            api,
            store,
            settings,
            rng,
        }
    }

    /// Drives every task in submission order, one at a time.
    ///
    /// When `stop` fires, the account in flight finishes its current remote call,
    /// no further account starts, and tasks still pending are canceled.
    pub async fn run_batch(&mut self, stop: &CancellationToken) {
        let ids = self.store.ids();
        batch_info!("starting orchestration for {} account(s)", ids.len());

        for id in &ids {
            if stop.is_cancelled() {
                batch_warn!("processing stopped by user; remaining accounts will not start");
                break;
            }
            self.process_account(id, stop).await;
        }

        if stop.is_cancelled() {
            let pending = self.store.pending_ids();
            self.store.cancel(&pending, "stopped by user");
        }
        self.store.refresh();
        batch_info!("sequential processing finished");
    }

    pub async fn process_account(&mut self, id: &TaskId, stop: &CancellationToken) {
        if let Err(err) = self.drive(id, stop).await {
            batch_error!(task = id; "orchestration failed: {}", err);
            let terminal = self
                .store
                .status(id.as_str())
                .is_some_and(|status| status.is_terminal());
            if !terminal {
                let message = format!("error: {}", truncate(&err.to_string(), MAX_ERROR_CHARS));
                self.store
                    .set_status(id.as_str(), StatusUpdate::new(TaskStatus::error(), message));
            }
        }
        self.store.refresh();
    }

    async fn drive(&mut self, id: &TaskId, stop: &CancellationToken) -> Result<(), OrchestrationError> {
        if stop.is_cancelled() {
            batch_warn!(task = id; "stop requested, skipping account");
            self.store.set_status(
                id.as_str(),
                StatusUpdate::new(TaskStatus::canceled(), "stopped before start"),
            );
            return Ok(());
        }

        let Some(record) = self.store.record(id.as_str()) else {
            batch_warn!(task = id; "task vanished from the registry");
            return Ok(());
        };
        batch_info!(task = id; "starting orchestration for {}", record.login());

        let Some(token) = self.login(id, &record.credential).await else {
            return Ok(());
        };

        self.store.set_status(
            id.as_str(),
            StatusUpdate::new(TaskStatus::SELECTING_BOOK, "selecting book via api..."),
        );
        let book = self.select_book(&token).await?.into_selected();
        self.store.set_status(
            id.as_str(),
            StatusUpdate::new(
                TaskStatus::BOOK_SELECTED,
                format!(
                    "book: {}. computing parameters...",
                    truncate(&book.name, MAX_BOOK_NAME_CHARS)
                ),
            )
            .with_book(book.name.clone()),
        );
        batch_info!(task = id; "book selected: {} ({})", book.name, book.slug);

        let targets = randomize(&self.settings.ranges, &mut self.rng);
        self.store.attach_targets(id.as_str(), book.clone(), targets);
        let params = format!(
            "params: {}% / {}m / {} questions",
            targets.read_percentage, targets.read_time, targets.max_questions
        );
        self.store.set_status(
            id.as_str(),
            StatusUpdate::new(
                TaskStatus::STARTING_TASK,
                format!("{params}. starting remote task..."),
            )
            .with_book(book.name.clone()),
        );

        if stop.is_cancelled() {
            self.store.set_status(
                id.as_str(),
                StatusUpdate::new(TaskStatus::canceled(), "stopped before remote task start"),
            );
            return Ok(());
        }

        let request = StartTask {
            task_id: id.clone(),
            book: book.clone(),
            targets,
        };
        let started = self
            .api
            .start_task(&token, &request)
            .await
            .map_err(|err| {
                if err.is_contract_violation() {
                    OrchestrationError::UnexpectedResponse(err)
                } else {
                    OrchestrationError::StartTask(err)
                }
            })?;
        batch_info!(task = id; "remote task started");

        let update = match started.initial_status {
            Some(initial) => StatusUpdate::new(
                initial.status.unwrap_or_else(|| TaskStatus::STARTED.to_string()),
                initial
                    .progress_message
                    .unwrap_or_else(|| "task started via api".to_string()),
            )
            .with_detail(initial.message),
            None => StatusUpdate::new(TaskStatus::STARTED, "task started via api"),
        };
        self.store.hand_off(id.as_str(), update.with_book(book.name));
        Ok(())
    }

    /// Records its own failure on the task and returns `None`.
    async fn login(&self, id: &TaskId, credential: &Credential) -> Option<String> {
        self.store.set_status(
            id.as_str(),
            StatusUpdate::new(TaskStatus::AUTHENTICATING, "authenticating..."),
        );

        match self.api.login(credential.login(), credential.password()).await {
            Ok(token) => {
                batch_debug!(task = id; "token obtained: {}", redact(&token, 10));
                self.store.set_status(
                    id.as_str(),
                    StatusUpdate::new(TaskStatus::LOGGED_IN, "login ok"),
                );
                Some(token)
            }
            Err(err) => {
                batch_error!(task = id; "login failed: {}", err);
                let message = format!("login failed: {}", truncate(&err.to_string(), MAX_ERROR_CHARS));
                self.store
                    .set_status(id.as_str(), StatusUpdate::new(TaskStatus::error(), message));
                None
            }
        }
    }

    async fn select_book(&mut self, token: &str) -> Result<Book, OrchestrationError> {
        let mode = self.settings.mode.clone();
        match &mode {
            BookMode::Recommended => {
                let books = self.lookup(BookQuery::Recommended, token).await?;
                books
                    .choose(&mut self.rng)
                    .cloned()
                    .ok_or_else(|| OrchestrationError::NoBooks("no recommended books found".to_string()))
            }
            BookMode::Indicated => {
                let books = self.lookup(BookQuery::Indicated, token).await?;
                books
                    .choose(&mut self.rng)
                    .cloned()
                    .ok_or_else(|| OrchestrationError::NoBooks("no indicated books found".to_string()))
            }
            BookMode::Search(term) => {
                let term = term.trim();
                if term.is_empty() {
                    return Err(ValidationError::MissingSearchTerm.into());
                }
                // Search results come pre-ranked; take the best match.
                let books = self.lookup(BookQuery::Search(term), token).await?;
                books
                    .into_iter()
                    .next()
                    .ok_or_else(|| OrchestrationError::NoBooks(format!("no books found for '{term}'")))
            }
            BookMode::Slug(slug) => {
                let slug = slug.trim();
                if slug.is_empty() {
                    return Err(ValidationError::MissingSlug.into());
                }
                Ok(Book::with_slug(slug))
            }
        }
    }

    async fn lookup(&self, query: BookQuery<'_>, token: &str) -> Result<Vec<Book>, OrchestrationError> {
        self.api
            .find_books(query, token)
            .await
            .map_err(|source| OrchestrationError::BookLookup {
                mode: query.label(),
                source,
            })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
