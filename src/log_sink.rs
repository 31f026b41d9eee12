//! Append-only log store
//!
//! [`LogSink`] is the single append point for rendered records. The file
//! implementation opens in append mode for every record and releases the
//! handle before returning, so no descriptor outlives one call.

use crate::errors::{ActivityLogError, ActivityLogResult, SafeLock};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File name of the activity log inside the storage directory
pub const DEFAULT_LOG_FILE_NAME: &str = "user-activities.log";

/// Destination for rendered log lines
pub trait LogSink: Send + Sync {
    /// Append one complete, newline-terminated line
    fn append(&self, line: &str) -> ActivityLogResult<()>;
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn append(&self, line: &str) -> ActivityLogResult<()> {
        (**self).append(line)
    }
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn append(&self, line: &str) -> ActivityLogResult<()> {
        (**self).append(line)
    }
}

/// Normalize a filesystem path to forward-slash form.
///
/// Backslashes become slashes, runs of slashes collapse except a leading
/// `//` (network shares), and a Windows drive letter is upper-cased.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");

    let mut normalized = String::with_capacity(unified.len());
    let mut previous_slash = false;
    for (i, c) in unified.chars().enumerate() {
        if c == '/' {
            if previous_slash && i > 1 {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(c);
    }

    let mut chars = normalized.chars();
    if let (Some(drive), Some(':')) = (chars.next(), chars.next()) {
        if drive.is_ascii_alphabetic() {
            normalized.replace_range(0..1, &drive.to_ascii_uppercase().to_string());
        }
    }

    normalized
}

/// Log file path for a storage directory: `normalize(base_dir + "/" + file_name)`
pub fn resolve_log_path(base_dir: &str, file_name: &str) -> PathBuf {
    PathBuf::from(normalize_path(&format!("{base_dir}/{file_name}")))
}

/// Appends to a single file fixed at construction
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sink for `user-activities.log` inside `base_dir`
    pub fn in_dir(base_dir: &str) -> Self {
        Self::new(resolve_log_path(base_dir, DEFAULT_LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, line: &str) -> ActivityLogResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ActivityLogError::store_write(&self.path, e))?;

        // One write per record keeps lines whole under O_APPEND
        file.write_all(line.as_bytes())
            .map_err(|e| ActivityLogError::store_write(&self.path, e))
    }
}

/// Keeps records in memory, in append order
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .safe_lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Concatenation of all lines, as a file would hold them
    pub fn contents(&self) -> String {
        self.lines().concat()
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) -> ActivityLogResult<()> {
        self.lines.safe_lock()?.push(line.to_string());
        Ok(())
    }
}
