//! End-to-end tests against a real log file
//!
//! - lifecycle hooks write through to `user-activities.log`
//! - records land in call order and existing content is never truncated
//! - an unwritable store never interrupts the calling host operation

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use user_activity_log::cli::{replay, ReplayRequest, ReplaySummary};
use user_activity_log::config_loader::LoggerConfig;
use user_activity_log::session_context::{FixedClock, StaticRequest};
use user_activity_log::{
    ActivityLogger, EventFields, EventKind, EventRecorder, FileSink, InMemoryDirectory,
    LifecycleHooks, UserRecord,
};

fn noon() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    )
}

fn file_logger(dir: &TempDir) -> (ActivityLogger, Arc<InMemoryDirectory>, std::path::PathBuf) {
    let config = LoggerConfig::new(dir.path().to_str().unwrap());
    let sink = FileSink::new(config.log_path());
    let directory = Arc::new(InMemoryDirectory::with_users([UserRecord::new(2, "ops")
        .with_roles(&["administrator"])]));
    let recorder = EventRecorder::new(sink)
        .with_request_source(Arc::new(StaticRequest::new(
            "10.0.0.5",
            "curl/8.0",
            "/wp-login.php",
        )))
        .with_clock(noon());

    (
        ActivityLogger::new(recorder, directory.clone()),
        directory,
        config.log_path(),
    )
}

#[test]
fn login_failed_line_is_bit_exact() {
    let dir = TempDir::new().unwrap();
    let (logger, _, path) = file_logger(&dir);

    logger.on_login_failed("bob");

    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        contents,
        "[2024-05-01 12:00:00] IP: 10.0.0.5 - URI: /wp-login.php - User-Agent: curl/8.0 - Action: LOGIN_FAILED - Username: bob\n"
    );
}

#[test]
fn records_append_in_call_order_after_existing_content() {
    let dir = TempDir::new().unwrap();
    let (logger, directory, path) = file_logger(&dir);
    std::fs::write(&path, "previous run\n").unwrap();

    directory.set_current_user(2);
    logger.on_login_failed("first");
    logger.on_user_deleted(9, None);
    logger.on_role_changed(9, "", &["editor".to_string(), "author".to_string()]);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "previous run");
    assert!(lines[1].ends_with("Action: LOGIN_FAILED - Username: first"));
    assert!(lines[2].ends_with("Action: USER_DELETED - ID: 9 - Reassigned To: 0 - Deleted By: ops - Deleter ID: 2"));
    assert!(lines[3].ends_with(
        "Action: ROLE_CHANGED - User: Unknown - ID: 9 - Old Roles: editor, author - New Role: none - Changed By: ops - Editor ID: 2"
    ));
}

/// Stand-in for a host login flow that fires the hook mid-operation
fn host_login(hooks: &dyn LifecycleHooks, username: &str) -> &'static str {
    hooks.on_login_success(username, &UserRecord::new(1, username));
    "logged-in"
}

#[test]
fn unwritable_store_does_not_interrupt_host() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-created");
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();

    let recorder = EventRecorder::new(FileSink::in_dir(missing.to_str().unwrap()))
        .with_failure_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let logger = ActivityLogger::new(recorder, Arc::new(InMemoryDirectory::new()));

    assert_eq!(host_login(&logger, "bob"), "logged-in");
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(!missing.exists());
}

#[test]
fn try_record_surfaces_store_failure() {
    let dir = TempDir::new().unwrap();
    let recorder = EventRecorder::new(FileSink::new(dir.path().join("a/b/c.log")));

    let err = recorder
        .try_record(EventKind::LoginFailed, EventFields::new().with("Username", "x"))
        .unwrap_err();
    assert!(err.is_store_failure());
}

#[test]
fn replay_dispatches_jsonl_in_order() {
    let dir = TempDir::new().unwrap();
    let config = LoggerConfig::new(dir.path().to_str().unwrap());
    let directory = Arc::new(InMemoryDirectory::with_users([
        UserRecord::new(1, "admin"),
        UserRecord::new(5, "pat").with_email("pat@old.example"),
    ]));
    let request = Arc::new(ReplayRequest::default());
    let recorder = EventRecorder::new(FileSink::new(config.log_path()))
        .with_request_source(request.clone())
        .with_clock(noon());
    let logger = ActivityLogger::new(recorder, directory.clone());

    let input = r#"{"event": "login-failed", "username": "pat", "request": {"client_address": "203.0.113.9", "request_uri": "/wp-login.php"}}
not json at all

{"event": "user-updated", "user_id": 5, "previous": {"id": 5, "login": "pat", "email": "pat@old.example"}, "actor_id": 1, "directory_update": {"id": 5, "login": "pat", "email": "pat@new.example"}}
{"event": "password-reset-succeeded", "user": {"id": 5, "login": "pat"}, "new_password": "s3cret"}
"#;

    let summary = replay(Cursor::new(input), &logger, &directory, &request).unwrap();
    assert_eq!(summary, ReplaySummary { dispatched: 3, skipped: 1 });

    let contents = std::fs::read_to_string(config.log_path()).unwrap();
    assert_eq!(
        contents,
        concat!(
            "[2024-05-01 12:00:00] IP: 203.0.113.9 - URI: /wp-login.php - User-Agent: Unknown - Action: LOGIN_FAILED - Username: pat\n",
            "[2024-05-01 12:00:00] IP: Unknown - URI: Unknown - User-Agent: Unknown - Action: USER_UPDATED - ID: 5 - Login: pat - Changes: pat@old.example => pat@new.example - Updated By: admin - Editor ID: 1\n",
            "[2024-05-01 12:00:00] IP: Unknown - URI: Unknown - User-Agent: Unknown - Action: PASSWORD_RESET_SUCCESS - User: pat - ID: 5\n",
        )
    );
    assert!(!contents.contains("s3cret"));
}
