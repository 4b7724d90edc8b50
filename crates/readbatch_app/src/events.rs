use std::io::Write;

use readbatch_core::{Summary, TaskRecord, TaskRowView};
use readbatch_engine::{EngineEvent, EngineHandle};
use readbatch_logging::{batch_info, batch_warn};

use crate::error::AppError;

/// What the engine reported when the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stopped: bool,
    pub summary: Summary,
    pub records: Vec<TaskRecord>,
}

impl RunOutcome {
    /// Not stopped, and every task ended `completed`.
    pub fn is_clean(&self) -> bool {
        !self.stopped && self.summary.completed == self.summary.total
    }
}

/// Prints task rows and summaries as the engine reports them.
pub struct EventPrinter<W: Write> {
    out: W,
    last_summary: Summary,
}

impl<W: Write> EventPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_summary: Summary::default(),
        }
    }

    /// Returns the outcome on `RunFinished`, `None` for every other event.
    pub fn handle(&mut self, event: EngineEvent) -> Option<RunOutcome> {
        match event {
            EngineEvent::TaskChanged(row) => {
                let text = format_row(&row);
                self.line(&text);
                None
            }
            EngineEvent::SummaryChanged(summary) => {
                self.last_summary = summary;
                None
            }
            EngineEvent::PollingChanged { active } => {
                if active {
                    batch_info!("progress polling active");
                    self.line("-- polling progress --");
                } else {
                    batch_info!("progress polling idle");
                }
                let text = format_summary(&self.last_summary);
                self.line(&text);
                None
            }
            EngineEvent::RunFinished {
                stopped,
                summary,
                records,
            } => {
                let heading = if stopped {
                    "-- run stopped --"
                } else {
                    "-- run finished --"
                };
                self.line(heading);
                self.line(&format_summary(&summary));
                Some(RunOutcome {
                    stopped,
                    summary,
                    records,
                })
            }
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            batch_warn!("failed to print run output: {}", err);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Blocks until the current run finishes.
pub fn wait_for_run<W: Write>(
    engine: &EngineHandle,
    printer: &mut EventPrinter<W>,
) -> Result<RunOutcome, AppError> {
    while let Some(event) = engine.recv() {
        if let Some(outcome) = printer.handle(event) {
            return Ok(outcome);
        }
    }
    Err(AppError::EngineGone)
}

pub fn format_row(row: &TaskRowView) -> String {
    let mut text = format!(
        "{} {} [{}] {} | {}",
        row.task_id,
        row.login,
        row.status.to_uppercase(),
        row.book_name,
        row.progress_message
    );
    if let Some(detail) = &row.detail_message {
        text.push_str(&format!(" ({detail})"));
    }
    text
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "total {} | pending {} | running {} | completed {} | error {} | polling {}",
        summary.total,
        summary.pending,
        summary.running,
        summary.completed,
        summary.error,
        summary.active
    )
}
