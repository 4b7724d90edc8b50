use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use readbatch_core::{Credential, RunSettings, Summary, TaskRecord, TaskRegistry};
use readbatch_logging::{batch_error, batch_info, batch_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::poller::{ProgressPoller, DEFAULT_POLL_INTERVAL};
use crate::store::{ChannelEventSink, EventSink, TaskStore};
use crate::{BookApi, ClientError, ClientSettings, EngineEvent, Orchestrator, ReqwestBookApi};

/// Milliseconds since the Unix epoch, used in task ids.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub poll_interval: Duration,
    /// Fixed seed for book picks and reading targets.
    pub seed: Option<u64>,
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: None,
            clock: Arc::new(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis() as u64)
                    .unwrap_or_default()
            }),
        }
    }
}

/// Final state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub stopped: bool,
    pub summary: Summary,
    pub records: Vec<TaskRecord>,
}

/// Runs one batch to completion: orchestration and polling side by side,
/// then cleanup of tasks abandoned by a stop.
pub async fn execute_run(
    api: Arc<dyn BookApi>,
    store: TaskStore,
    settings: RunSettings,
    config: &EngineConfig,
    stop: CancellationToken,
) -> RunReport {
    store.publish_all();

    let orchestration_done = CancellationToken::new();
    let poller = ProgressPoller::new(api.clone(), store.clone(), config.poll_interval);
    let poller_task = tokio::spawn(poller.run(stop.clone(), orchestration_done.clone()));

    let mut orchestrator = Orchestrator::new(api, store.clone(), settings, config.seed);
    orchestrator.run_batch(&stop).await;
    orchestration_done.cancel();

    if let Err(err) = poller_task.await {
        batch_error!("progress poller task failed: {}", err);
    }

    let stopped = stop.is_cancelled();
    if stopped {
        let abandoned = store.remote_unfinished_ids();
        if !abandoned.is_empty() {
            batch_warn!(
                "{} remote task(s) keep running but are no longer tracked",
                abandoned.len()
            );
        }
        store.cancel(&abandoned, "stopped by user");
    }

    let summary = store.summary();
    batch_info!(
        "run finished: total={} completed={} error={} pending={} running={}",
        summary.total,
        summary.completed,
        summary.error,
        summary.pending,
        summary.running
    );
    RunReport {
        stopped,
        summary,
        records: store.records(),
    }
}

enum EngineCommand {
    StartRun {
        accounts: Vec<Credential>,
        settings: RunSettings,
    },
    Stop,
}

/// Stops the current run from any thread.
#[derive(Clone)]
pub struct StopHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Stop);
    }
}

/// UI-facing handle: commands in, [`EngineEvent`]s out. The async work runs on
/// a dedicated runtime thread.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ClientError> {
        let api = Arc::new(ReqwestBookApi::new(config.client.clone())?);
        Ok(Self::with_api(api, config))
    }

    pub fn with_api(api: Arc<dyn BookApi>, config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    batch_error!("failed to start engine runtime: {}", err);
                    return;
                }
            };
            let mut current: Option<(CancellationToken, JoinHandle<()>)> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartRun { accounts, settings } => {
                        // The previous run emits its last event before the new one starts.
                        if let Some((previous, handle)) = current.take() {
                            previous.cancel();
                            if let Err(err) = runtime.block_on(handle) {
                                batch_error!("previous run failed: {}", err);
                            }
                        }
                        let stop = CancellationToken::new();

                        let registry =
                            TaskRegistry::from_accounts(&accounts, &settings, (config.clock)());
                        let store = TaskStore::new(registry, sink.clone());
                        let api = api.clone();
                        let sink = sink.clone();
                        let config = config.clone();
                        let run_stop = stop.clone();
                        let handle = runtime.spawn(async move {
                            let report = execute_run(api, store, settings, &config, run_stop).await;
                            sink.emit(EngineEvent::RunFinished {
                                stopped: report.stopped,
                                summary: report.summary,
                                records: report.records,
                            });
                        });
                        current = Some((stop, handle));
                    }
                    EngineCommand::Stop => match &current {
                        Some((stop, _)) => {
                            batch_warn!("stop requested: no new accounts will start and polling halts");
                            stop.cancel();
                        }
                        None => batch_warn!("stop requested but no run is active"),
                    },
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    /// Stops the previous run, waits for its `RunFinished`, then starts a new batch
    /// on a fresh registry.
    pub fn start_run(&self, accounts: Vec<Credential>, settings: RunSettings) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::StartRun { accounts, settings });
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Stop);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Blocks for the next event. `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
