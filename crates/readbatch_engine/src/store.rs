use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use readbatch_core::{
    ReadingTargets, SelectedBook, StatusUpdate, Summary, TaskId, TaskRecord, TaskRegistry,
    TaskRowView, TaskStatus,
};
use readbatch_logging::batch_info;
use tokio::sync::watch;

use crate::EngineEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Registry of one run, shared by the orchestrator and the poller.
///
/// All status changes go through [`TaskStore::set_status`] (or
/// [`TaskStore::hand_off`], which wraps it), under one lock. The lock is never
/// held across an await point or while emitting events.
#[derive(Clone)]
pub struct TaskStore {
    registry: Arc<Mutex<TaskRegistry>>,
    sink: Arc<dyn EventSink>,
    active_tx: Arc<watch::Sender<usize>>,
    polling: Arc<AtomicBool>,
}

impl TaskStore {
    pub fn new(registry: TaskRegistry, sink: Arc<dyn EventSink>) -> Self {
        let (active_tx, _) = watch::channel(registry.active_len());
        Self {
            registry: Arc::new(Mutex::new(registry)),
            sink,
            active_tx: Arc::new(active_tx),
            polling: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The single status mutation entry point. Unknown ids are logged and ignored.
    pub fn set_status(&self, id: &str, update: StatusUpdate) -> bool {
        self.apply(id, update, false)
    }

    /// Marks the task as running remotely and applies its first remote status.
    pub fn hand_off(&self, id: &str, update: StatusUpdate) -> bool {
        self.apply(id, update, true)
    }

    fn apply(&self, id: &str, update: StatusUpdate, remote: bool) -> bool {
        let changed = {
            let mut registry = self.lock();
            if remote && !registry.mark_remote(id) {
                return false;
            }
            if registry.set_status(id, update) {
                let row = registry.get(id).map(TaskRowView::from);
                Some((row, registry.summary()))
            } else {
                None
            }
        };

        let Some((row, summary)) = changed else {
            return false;
        };
        if let Some(row) = row {
            batch_info!(task = row.task_id; "{} - {}", row.status, row.progress_message);
            self.sink.emit(EngineEvent::TaskChanged(row));
        }
        self.publish_summary(summary);
        true
    }

    pub fn attach_targets(&self, id: &str, book: SelectedBook, targets: ReadingTargets) -> bool {
        self.lock().attach_targets(id, book, targets)
    }

    /// Recomputes counters and polling membership. Idempotent.
    pub fn refresh(&self) {
        let summary = {
            let mut registry = self.lock();
            registry.recompute();
            registry.summary()
        };
        self.publish_summary(summary);
    }

    /// Emits one row per task, e.g. when a run starts.
    pub fn publish_all(&self) {
        let (rows, summary) = {
            let registry = self.lock();
            let rows: Vec<_> = registry.records().map(TaskRowView::from).collect();
            (rows, registry.summary())
        };
        for row in rows {
            self.sink.emit(EngineEvent::TaskChanged(row));
        }
        self.publish_summary(summary);
    }

    /// Moves every listed task to `canceled`, skipping ones already terminal.
    pub fn cancel(&self, ids: &[TaskId], message: &str) {
        for id in ids {
            let terminal = self
                .status(id.as_str())
                .is_some_and(|status| status.is_terminal());
            if !terminal {
                self.set_status(
                    id.as_str(),
                    StatusUpdate::new(TaskStatus::canceled(), message),
                );
            }
        }
    }

    fn publish_summary(&self, summary: Summary) {
        self.sink.emit(EngineEvent::SummaryChanged(summary));
        self.active_tx.send_replace(summary.active);
    }

    /// Emits a polling notification when the state actually flips.
    pub fn set_polling(&self, active: bool) {
        if self.polling.swap(active, Ordering::SeqCst) != active {
            self.sink.emit(EngineEvent::PollingChanged { active });
        }
    }

    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Watches the size of the active set.
    pub fn subscribe_active(&self) -> watch::Receiver<usize> {
        self.active_tx.subscribe()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.lock().ids().to_vec()
    }

    pub fn record(&self, id: &str) -> Option<TaskRecord> {
        self.lock().get(id).cloned()
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.lock().get(id).map(|record| record.status.clone())
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.lock().records().cloned().collect()
    }

    pub fn summary(&self) -> Summary {
        self.lock().summary()
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        self.lock().active_ids()
    }

    pub fn active_len(&self) -> usize {
        self.lock().active_len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.lock().is_active(id)
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.lock().pending_ids()
    }

    pub fn remote_unfinished_ids(&self) -> Vec<TaskId> {
        self.lock().remote_unfinished_ids()
    }
}
