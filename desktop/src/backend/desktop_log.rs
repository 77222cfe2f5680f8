//! Timestamped launcher log at `<app_dir>/logs/desktop.log`.
//!
//! Receives supervisor lifecycle events and every line the backend writes
//! to stdout/stderr. Writing never fails from the caller's point of view:
//! an unwritable file degrades to console-only output.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILENAME: &str = "desktop.log";

#[derive(Clone)]
pub struct DesktopLog {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    file: Mutex<Option<File>>,
    write_failed: AtomicBool,
}

impl DesktopLog {
    /// Open (or create) the log under `<app_dir>/logs/`.
    ///
    /// The directory is created eagerly. Failure is tolerated and retried
    /// on the next write.
    pub fn open(app_dir: &Path) -> Self {
        let path = app_dir.join(LOG_DIR).join(LOG_FILENAME);
        let file = Self::open_file(&path)
            .inspect_err(|e| warn!("Desktop log unavailable at {}: {e}", path.display()))
            .ok();

        Self {
            inner: Arc::new(Inner {
                path,
                file: Mutex::new(file),
                write_failed: AtomicBool::new(false),
            }),
        }
    }

    fn open_file(path: &Path) -> std::io::Result<File> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Append `[<ISO-8601>] message` and echo it to the console.
    pub fn line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(target: "desktop_log", "{message}");

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{timestamp}] {message}\n");

        let Ok(mut guard) = self.inner.file.lock() else {
            return;
        };

        if guard.is_none() {
            *guard = Self::open_file(&self.inner.path).ok();
        }

        let result = match guard.as_mut() {
            Some(file) => file.write_all(line.as_bytes()),
            None => Err(std::io::Error::other("log file not open")),
        };

        if let Err(e) = result {
            *guard = None;
            // Only the first failure is reported to avoid flooding the console.
            if !self.inner.write_failed.swap(true, Ordering::Relaxed) {
                warn!("Failed to write {}: {e}", self.inner.path.display());
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Last `count` lines of the log file, oldest first.
    pub fn recent_lines(&self, count: usize) -> Vec<String> {
        let Ok(content) = std::fs::read_to_string(&self.inner.path) else {
            return Vec::new();
        };

        let mut lines: Vec<String> = content
            .lines()
            .rev()
            .take(count)
            .map(String::from)
            .collect();
        lines.reverse();
        lines
    }
}
