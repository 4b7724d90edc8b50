//! Batched progress polling for tasks running on the remote service.

use std::sync::Arc;
use std::time::Duration;

use readbatch_core::{StatusUpdate, TaskRecord, TaskStatus};
use readbatch_logging::{batch_debug, batch_error, batch_info, batch_warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{BookApi, ProgressBatch, ProgressEntry, ProgressPayload, TaskStore};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing active, or stop requested. No request was sent.
    Skipped,
    Polled { updated: usize },
    /// The request failed; the next tick retries.
    Failed,
}

pub struct ProgressPoller {
    api: Arc<dyn BookApi>,
    store: TaskStore,
    interval: Duration,
}

impl ProgressPoller {
    pub fn new(api: Arc<dyn BookApi>, store: TaskStore, interval: Duration) -> Self {
        Self {
            api,
            store,
            interval,
        }
    }

    /// Polls while the active set is non-empty, idles while it is empty.
    ///
    /// Returns when `stop` fires, or once `orchestration_done` has fired and
    /// no task is left to poll.
    pub async fn run(self, stop: CancellationToken, orchestration_done: CancellationToken) {
        let mut active_rx = self.store.subscribe_active();
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                changed = active_rx.wait_for(|active| *active > 0) => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = orchestration_done.cancelled() => break,
            }

            self.poll_while_active(&stop).await;
            if stop.is_cancelled() {
                break;
            }
        }
        self.store.set_polling(false);
    }

    async fn poll_while_active(&self, stop: &CancellationToken) {
        batch_info!(
            "starting progress polling for {} task(s)",
            self.store.active_len()
        );
        self.store.set_polling(true);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = self.tick(stop) => {}
            }
            if self.store.active_len() == 0 {
                break;
            }
        }

        self.store.set_polling(false);
        if stop.is_cancelled() {
            batch_info!("progress polling stopped by user");
        } else {
            batch_info!("no active tasks left; progress polling stopped");
        }
    }

    /// One poll round. A no-op without network traffic when nothing is active.
    pub async fn tick(&self, stop: &CancellationToken) -> TickOutcome {
        if stop.is_cancelled() {
            return TickOutcome::Skipped;
        }
        let ids = self.store.active_ids();
        if ids.is_empty() {
            return TickOutcome::Skipped;
        }

        batch_debug!("polling {} task(s)", ids.len());
        match self.api.fetch_progress(&ids).await {
            Ok(batch) => {
                let updated = self.merge(batch);
                if updated == 0 {
                    batch_debug!("no status changes for active tasks");
                }
                TickOutcome::Polled { updated }
            }
            Err(err) => {
                batch_error!("progress poll failed, retrying next tick: {}", err);
                TickOutcome::Failed
            }
        }
    }

    fn merge(&self, batch: ProgressBatch) -> usize {
        let mut updated = 0;
        for (id, payload) in batch {
            if !self.store.is_active(&id) {
                batch_warn!("progress for unknown or inactive task {}; ignoring", id);
                continue;
            }
            let entry = match payload {
                ProgressPayload::Entry(entry) => entry,
                ProgressPayload::Malformed(value) => {
                    batch_warn!(task = id; "invalid progress payload {}; no longer polling", value);
                    // Terminal, so the task leaves the active set and the run can end.
                    self.store.set_status(
                        &id,
                        StatusUpdate::new(TaskStatus::error(), "error: invalid progress payload"),
                    );
                    updated += 1;
                    continue;
                }
            };
            let Some(record) = self.store.record(&id) else {
                continue;
            };
            if let Some(update) = changes(&record, entry) {
                self.store.set_status(&id, update);
                updated += 1;
            }
        }
        updated
    }
}

/// Remote values with stored fallbacks, or `None` when nothing would change.
fn changes(record: &TaskRecord, entry: ProgressEntry) -> Option<StatusUpdate> {
    let status = non_empty(entry.status).unwrap_or_else(|| record.status.to_string());
    let progress =
        non_empty(entry.progress_message).unwrap_or_else(|| record.progress_message.clone());
    let book_name = non_empty(entry.book_name).unwrap_or_else(|| record.book_name.clone());
    let detail = non_empty(entry.message).filter(|detail| *detail != progress);

    let detail_changed = detail.is_some() && detail != record.detail_message;
    let unchanged = status == record.status.as_str()
        && progress == record.progress_message
        && book_name == record.book_name
        && !detail_changed;
    if unchanged {
        return None;
    }

    Some(
        StatusUpdate::new(status, progress)
            .with_book(book_name)
            .with_detail(detail),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}
