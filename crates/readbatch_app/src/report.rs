//! Plain-text result report written at the end of a run.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use readbatch_core::{TaskRecord, UNKNOWN_BOOK};
use tempfile::NamedTempFile;

use crate::error::AppError;

const RULE: &str = "==================================================";
const SEPARATOR: &str = "--------------------------------------------------";
const NOT_SET: &str = "(not set)";
const MASKED_PASSWORD: &str = "********";

pub struct ReportContext<'a> {
    pub generated_at: DateTime<Local>,
    pub api_url: &'a str,
    pub include_passwords: bool,
}

/// `reading_results_<timestamp>.txt`, safe on every filesystem.
pub fn report_filename(generated_at: &DateTime<Local>) -> String {
    format!(
        "reading_results_{}.txt",
        generated_at.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// One block per task, sorted by task id.
pub fn render_report(context: &ReportContext<'_>, records: &[TaskRecord]) -> String {
    let mut sorted: Vec<&TaskRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Reading results - {}",
        context.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Book task API: {}", context.api_url);
    let _ = writeln!(out, "{RULE}\n");

    for record in sorted {
        let password = if context.include_passwords {
            record.credential.password()
        } else {
            MASKED_PASSWORD
        };
        let book = if record.book_name == UNKNOWN_BOOK {
            "N/A"
        } else {
            record.book_name.as_str()
        };
        let message = if record.progress_message.is_empty() {
            record.detail_message.as_deref().unwrap_or("N/A")
        } else {
            record.progress_message.as_str()
        };

        let _ = writeln!(out, "Task: {}", record.id);
        let _ = writeln!(out, "  Login: {}", record.login());
        let _ = writeln!(out, "  Password: {password}");
        let _ = writeln!(out, "  Selected book: {book}");
        let _ = writeln!(out, "  Final status: {}", record.status.as_str().to_uppercase());
        let _ = writeln!(out, "  Message: {message}");
        write_targets(&mut out, record);
        let _ = writeln!(out, "{SEPARATOR}");
    }
    out
}

fn write_targets(out: &mut String, record: &TaskRecord) {
    let params = &record.params;
    let ranges = params.ranges;
    let target_book = params
        .book
        .as_ref()
        .map(|book| {
            if book.name.is_empty() {
                book.slug.clone()
            } else {
                book.name.clone()
            }
        })
        .unwrap_or_else(|| NOT_SET.to_string());
    let (time, questions, percentage) = match params.targets {
        Some(targets) => (
            format!("{} min", targets.read_time),
            format!("{} questions", targets.max_questions),
            format!("{}%", targets.read_percentage),
        ),
        None => (NOT_SET.to_string(), NOT_SET.to_string(), NOT_SET.to_string()),
    };

    let _ = writeln!(out, "  --- Targets ---");
    let _ = writeln!(out, "  Target book: {target_book}");
    let _ = writeln!(out, "  Time range: {}-{} min", ranges.min_time, ranges.max_time);
    let _ = writeln!(
        out,
        "  Question range: {}-{} questions",
        ranges.min_questions, ranges.max_questions
    );
    let _ = writeln!(out, "  Read time: {time}");
    let _ = writeln!(out, "  Questions: {questions}");
    let _ = writeln!(out, "  Read percentage: {percentage}");
}

/// Renders the report and writes it atomically into `dir`.
pub fn write_report(
    dir: &Path,
    context: &ReportContext<'_>,
    records: &[TaskRecord],
) -> Result<PathBuf, AppError> {
    let content = render_report(context, records);
    let target = dir.join(report_filename(&context.generated_at));
    let report_error = |source| AppError::Report {
        path: target.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(report_error)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(report_error)?;
    tmp.write_all(content.as_bytes()).map_err(report_error)?;
    tmp.flush().map_err(report_error)?;
    tmp.as_file_mut().sync_all().map_err(report_error)?;
    tmp.persist(&target).map_err(|err| report_error(err.error))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use readbatch_core::{
        parse_accounts, BookMode, ReadingRanges, ReadingTargets, RunSettings, SelectedBook,
        StatusUpdate, TaskRegistry,
    };

    use super::*;

    fn records() -> Vec<TaskRecord> {
        let accounts = parse_accounts("zoe:secret-z\nann@school.example:secret-a\n").unwrap();
        let settings = RunSettings {
            mode: BookMode::Recommended,
            ranges: ReadingRanges::default(),
        };
        let mut registry = TaskRegistry::from_accounts(&accounts, &settings, 5);
        let ann = registry.ids()[1].clone();
        registry.attach_targets(
            ann.as_str(),
            SelectedBook {
                slug: "iracema".to_string(),
                name: "Iracema".to_string(),
            },
            ReadingTargets {
                read_time: 42,
                read_percentage: 88,
                max_questions: 5,
            },
        );
        registry.set_status(
            ann.as_str(),
            StatusUpdate::new("completed", "done").with_book("Iracema"),
        );
        registry.records().cloned().collect()
    }

    fn context(include_passwords: bool) -> ReportContext<'static> {
        ReportContext {
            generated_at: Local.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap(),
            api_url: "http://localhost:8000",
            include_passwords,
        }
    }

    #[test]
    fn filename_has_no_colons() {
        assert_eq!(
            report_filename(&context(false).generated_at),
            "reading_results_2026-03-01T09-05-00.txt"
        );
    }

    #[test]
    fn report_lists_tasks_by_id_with_masked_passwords() {
        let text = render_report(&context(false), &records());
        let expected = "\
Reading results - 2026-03-01 09:05:00
Book task API: http://localhost:8000
==================================================

Task: task_ann_5_1
  Login: ann@school.example
  Password: ********
  Selected book: Iracema
  Final status: COMPLETED
  Message: done
  --- Targets ---
  Target book: Iracema
  Time range: 10-60 min
  Question range: 3-10 questions
  Read time: 42 min
  Questions: 5 questions
  Read percentage: 88%
--------------------------------------------------
Task: task_zoe_5_0
  Login: zoe
  Password: ********
  Selected book: N/A
  Final status: PENDING
  Message: queued
  --- Targets ---
  Target book: (not set)
  Time range: 10-60 min
  Question range: 3-10 questions
  Read time: (not set)
  Questions: (not set)
  Read percentage: (not set)
--------------------------------------------------
";
        assert_eq!(text, expected);
    }

    #[test]
    fn passwords_can_be_included() {
        let text = render_report(&context(true), &records());
        assert!(text.contains("  Password: secret-a\n"));
        assert!(text.contains("  Password: secret-z\n"));
    }

    #[test]
    fn report_is_written_into_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_dir = dir.path().join("results");
        let path = write_report(&out_dir, &context(false), &records()).expect("written");

        assert_eq!(path, out_dir.join("reading_results_2026-03-01T09-05-00.txt"));
        let written = fs::read_to_string(&path).expect("read back");
        assert_eq!(written, render_report(&context(false), &records()));
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 1);
    }
}
