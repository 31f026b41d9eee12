//! Library root for the `user_activity_log` crate
//!
//! Subscribes to identity lifecycle events, sanitizes and formats each one,
//! and appends it as a single line to an append-only activity log.

// Core error handling
pub mod errors;

// Record pipeline
pub mod audit;
pub mod recorder;
pub mod sanitizer;

// Log store
pub mod log_sink;

// Host collaborators
pub mod directory;
pub mod hooks;
pub mod session_context;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

#[cfg(test)]
mod tests {
    pub mod lifecycle_scenarios;
    pub mod sanitizer_properties;
}

pub use audit::{ActivityEvent, EventFields, EventKind, LogRecord};
pub use directory::{InMemoryDirectory, UserDirectory, UserRecord};
pub use errors::{ActivityLogError, ActivityLogResult};
pub use hooks::{ActivityLogger, LifecycleEvent, LifecycleHooks};
pub use log_sink::{FileSink, LogSink, MemorySink};
pub use recorder::EventRecorder;
pub use sanitizer::{sanitize, sanitize_text, LogValue};
