use crate::backend::{DesktopLog, LOG_DIR, LOG_FILENAME};

use googletest::assert_that;
use googletest::prelude::{contains_substring, eq, len, starts_with};
use tempfile::TempDir;

#[test]
fn given_app_dir_when_open_then_log_path_under_logs() {
    let temp = TempDir::new().unwrap();

    let log = DesktopLog::open(temp.path());

    assert_that!(log.path(), eq(temp.path().join(LOG_DIR).join(LOG_FILENAME).as_path()));
    assert!(temp.path().join(LOG_DIR).is_dir());
}

#[test]
fn given_message_when_line_then_appended_with_timestamp() {
    // Given
    let temp = TempDir::new().unwrap();
    let log = DesktopLog::open(temp.path());

    // When
    log.line("Using port 8000");
    log.line("Backend started with PID 42");

    // Then
    let lines = log.recent_lines(10);
    assert_that!(lines, len(eq(2)));
    assert_that!(lines[0].as_str(), starts_with("["));
    assert_that!(lines[0].as_str(), contains_substring("Z] Using port 8000"));
    assert_that!(lines[1].as_str(), contains_substring("] Backend started with PID 42"));
}

#[test]
fn given_existing_log_when_reopened_then_appends() {
    let temp = TempDir::new().unwrap();
    DesktopLog::open(temp.path()).line("first run");

    let log = DesktopLog::open(temp.path());
    log.line("second run");

    let lines = log.recent_lines(10);
    assert_that!(lines, len(eq(2)));
    assert_that!(lines[1].as_str(), contains_substring("second run"));
}

#[test]
fn given_many_lines_when_recent_lines_then_returns_tail_in_order() {
    let temp = TempDir::new().unwrap();
    let log = DesktopLog::open(temp.path());
    for i in 0..5 {
        log.line(format!("line {i}"));
    }

    let lines = log.recent_lines(2);

    assert_that!(lines, len(eq(2)));
    assert_that!(lines[0].as_str(), contains_substring("line 3"));
    assert_that!(lines[1].as_str(), contains_substring("line 4"));
}

#[test]
fn given_cloned_log_when_line_then_shares_file() {
    let temp = TempDir::new().unwrap();
    let log = DesktopLog::open(temp.path());
    let clone = log.clone();

    clone.line("from clone");

    assert_that!(log.recent_lines(1)[0].as_str(), contains_substring("from clone"));
}

#[test]
fn given_unwritable_app_dir_when_line_then_does_not_panic() {
    // Given: app dir is a regular file so logs/ cannot be created
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    // When
    let log = DesktopLog::open(&blocker);
    log.line("lost line");
    log.line("another lost line");

    // Then
    assert!(log.recent_lines(5).is_empty());
}
