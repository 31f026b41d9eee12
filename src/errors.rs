//! Error handling for the activity logger
//!
//! A single error enum covers every failure the crate can observe. Most of
//! these never reach a host: the recorder swallows store failures so that
//! a logging problem cannot interrupt the lifecycle operation that caused it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the activity logger
#[derive(Error, Debug)]
pub enum ActivityLogError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to append to log store {}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    #[error("Mutex lock failed: {resource}")]
    MutexPoisoned { resource: String },
}

/// Result alias used throughout the crate
pub type ActivityLogResult<T> = Result<T, ActivityLogError>;

impl ActivityLogError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a store write failure for the given log path
    pub fn store_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreWrite {
            path: path.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// True when this error is a failed append to the log store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreWrite { .. })
    }
}

/// Helper trait for mutex access that reports poisoning instead of panicking
pub trait SafeLock<T: ?Sized> {
    fn safe_lock(&self) -> ActivityLogResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self) -> ActivityLogResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| ActivityLogError::MutexPoisoned {
            resource: "mutex".to_string(),
        })
    }
}

/// Helper trait for read access to an `RwLock`
pub trait SafeReadLock<T: ?Sized> {
    fn safe_read(&self) -> ActivityLogResult<std::sync::RwLockReadGuard<'_, T>>;
}

impl<T: ?Sized> SafeReadLock<T> for std::sync::RwLock<T> {
    fn safe_read(&self) -> ActivityLogResult<std::sync::RwLockReadGuard<'_, T>> {
        self.read().map_err(|_| ActivityLogError::MutexPoisoned {
            resource: "rwlock_read".to_string(),
        })
    }
}

/// Helper trait for write access to an `RwLock`
pub trait SafeWriteLock<T: ?Sized> {
    fn safe_write(&self) -> ActivityLogResult<std::sync::RwLockWriteGuard<'_, T>>;
}

impl<T: ?Sized> SafeWriteLock<T> for std::sync::RwLock<T> {
    fn safe_write(&self) -> ActivityLogResult<std::sync::RwLockWriteGuard<'_, T>> {
        self.write().map_err(|_| ActivityLogError::MutexPoisoned {
            resource: "rwlock_write".to_string(),
        })
    }
}

impl From<std::io::Error> for ActivityLogError {
    fn from(err: std::io::Error) -> Self {
        ActivityLogError::io("io_operation", err)
    }
}

impl From<serde_json::Error> for ActivityLogError {
    fn from(err: serde_json::Error) -> Self {
        ActivityLogError::serialization("json_operation", err)
    }
}

impl From<figment::Error> for ActivityLogError {
    fn from(err: figment::Error) -> Self {
        ActivityLogError::config(err.to_string())
    }
}
