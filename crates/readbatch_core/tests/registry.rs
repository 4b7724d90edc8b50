use std::sync::Once;

use pretty_assertions::assert_eq;
use readbatch_core::{
    parse_accounts, ReadingTargets, RunSettings, SelectedBook, StatusUpdate, Summary,
    TaskRegistry, TaskStatus, QUEUED_MESSAGE, UNKNOWN_BOOK,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(readbatch_logging::initialize_for_tests);
}

fn registry(raw: &str) -> TaskRegistry {
    let accounts = parse_accounts(raw).unwrap();
    TaskRegistry::from_accounts(&accounts, &RunSettings::default(), 1_700_000_000_000)
}

fn hand_off(registry: &mut TaskRegistry, id: &str, status: &str) {
    assert!(registry.mark_remote(id));
    assert!(registry.set_status(id, StatusUpdate::new(status, "running remotely")));
}

#[test]
fn new_records_are_pending_and_ids_are_unique() {
    init_logging();
    let registry = registry("alice@a.example:1\nalice@b.example:2\nbob:3\n");

    let ids: Vec<_> = registry.ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(
        ids,
        vec![
            "task_alice_1700000000000_0",
            "task_alice_1700000000000_1",
            "task_bob_1700000000000_2",
        ]
    );

    let first = registry.get("task_alice_1700000000000_0").unwrap();
    assert!(first.status.is(TaskStatus::PENDING));
    assert_eq!(first.progress_message, QUEUED_MESSAGE);
    assert_eq!(first.book_name, UNKNOWN_BOOK);
    assert_eq!(first.detail_message, None);
    assert_eq!(first.login(), "alice@a.example");

    assert_eq!(
        registry.summary(),
        Summary {
            total: 3,
            pending: 3,
            ..Summary::default()
        }
    );
    assert!(registry.active_ids().is_empty());
}

#[test]
fn unknown_task_update_is_ignored() {
    init_logging();
    let mut registry = registry("alice:1\n");
    let before: Vec<_> = registry.records().cloned().collect();

    let applied = registry.set_status("task_nobody_1_0", StatusUpdate::new("completed", "done"));

    assert!(!applied);
    let after: Vec<_> = registry.records().cloned().collect();
    assert_eq!(before, after);
    assert_eq!(registry.summary().completed, 0);
}

#[test]
fn book_name_and_detail_are_sticky() {
    init_logging();
    let mut registry = registry("alice:1\n");
    let id = registry.ids()[0].to_string();

    registry.set_status(
        &id,
        StatusUpdate::new("book_selected", "book chosen")
            .with_book("Dom Casmurro")
            .with_detail(Some("first detail".to_string())),
    );
    registry.set_status(
        &id,
        StatusUpdate::new("starting_task", "starting")
            .with_book("")
            .with_detail(None),
    );

    let record = registry.get(&id).unwrap();
    assert_eq!(record.status.as_str(), "starting_task");
    assert_eq!(record.progress_message, "starting");
    assert_eq!(record.book_name, "Dom Casmurro");
    assert_eq!(record.detail_message.as_deref(), Some("first detail"));

    // A detail equal to the progress message is not stored.
    registry.set_status(
        &id,
        StatusUpdate::new("reading", "page 3").with_detail(Some("page 3".to_string())),
    );
    assert_eq!(
        registry.get(&id).unwrap().detail_message.as_deref(),
        Some("first detail")
    );
}

#[test]
fn only_remote_non_terminal_tasks_are_active() {
    init_logging();
    let mut registry = registry("alice:1\nbob:2\n");
    let alice = registry.ids()[0].to_string();
    let bob = registry.ids()[1].to_string();

    registry.set_status(&alice, StatusUpdate::new("authenticating", "logging in"));
    assert!(registry.active_ids().is_empty());
    assert_eq!(registry.summary().running, 1);
    assert_eq!(registry.summary().pending, 1);

    hand_off(&mut registry, &alice, "started");
    hand_off(&mut registry, &bob, "Reading");
    assert_eq!(registry.active_len(), 2);
    assert_eq!(registry.summary().active, 2);

    registry.set_status(&alice, StatusUpdate::new("COMPLETED", "done"));
    assert!(!registry.is_active(&alice));
    assert!(registry.is_active(&bob));
    assert_eq!(registry.get(&alice).unwrap().status.as_str(), "COMPLETED");
    assert_eq!(
        registry.summary(),
        Summary {
            total: 2,
            pending: 0,
            running: 1,
            completed: 1,
            error: 0,
            active: 1,
        }
    );
}

#[test]
fn terminal_statuses_count_as_errors_except_completed() {
    init_logging();
    let mut registry = registry("a:1\nb:2\nc:3\nd:4\n");
    let ids: Vec<_> = registry.ids().iter().map(|id| id.to_string()).collect();

    registry.set_status(&ids[0], StatusUpdate::new("not_found", "missing"));
    registry.set_status(&ids[1], StatusUpdate::new("Inactive", "idle"));
    registry.set_status(&ids[2], StatusUpdate::new("failed", "failed"));
    registry.set_status(&ids[3], StatusUpdate::new("completed", "done"));

    let summary = registry.summary();
    assert_eq!(summary.error, 3);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.running, 0);
}

#[test]
fn failed_remote_task_is_no_longer_unfinished() {
    init_logging();
    let mut registry = registry("alice:1\n");
    let id = registry.ids()[0].to_string();
    hand_off(&mut registry, &id, "started");
    assert_eq!(registry.remote_unfinished_ids().len(), 1);

    registry.set_status(&id, StatusUpdate::new(TaskStatus::ERROR, "invalid progress payload"));
    assert!(!registry.is_active(&id));
    assert!(registry.remote_unfinished_ids().is_empty());
    assert_eq!(registry.summary().error, 1);
}

#[test]
fn targets_are_attached_to_params() {
    init_logging();
    let mut registry = registry("alice:1\n");
    let id = registry.ids()[0].to_string();
    let targets = ReadingTargets {
        read_time: 30,
        read_percentage: 85,
        max_questions: 4,
    };

    assert!(registry.attach_targets(
        &id,
        SelectedBook {
            slug: "o-alienista".to_string(),
            name: "O Alienista".to_string(),
        },
        targets,
    ));

    let params = &registry.get(&id).unwrap().params;
    assert_eq!(params.targets, Some(targets));
    assert_eq!(params.book.as_ref().unwrap().slug, "o-alienista");
    assert_eq!(params.ranges, RunSettings::default().ranges);
}

#[test]
fn pending_ids_follow_submission_order() {
    init_logging();
    let mut registry = registry("a:1\nb:2\nc:3\n");
    let first = registry.ids()[0].to_string();
    registry.set_status(&first, StatusUpdate::new("error", "boom"));

    let pending: Vec<_> = registry.pending_ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(
        pending,
        vec!["task_b_1700000000000_1", "task_c_1700000000000_2"]
    );
}
