//! Event recorder: enrich, sanitize, render and append
//!
//! [`EventRecorder::record`] is the boundary between lifecycle handling and
//! the log store. It always returns normally: a store failure is reported
//! through `tracing` and the optional failure handler, then dropped, so a
//! login or profile update never fails because its audit line could not be
//! written.

use crate::audit::{ActivityEvent, EventFields, EventKind, LogRecord};
use crate::errors::{ActivityLogError, ActivityLogResult};
use crate::log_sink::LogSink;
use crate::session_context::{Clock, LocalClock, NoRequest, RequestContext, RequestSource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked with every swallowed store failure
pub type FailureHandler = Box<dyn Fn(&ActivityLogError) + Send + Sync>;

pub struct EventRecorder {
    sink: Box<dyn LogSink>,
    request: Arc<dyn RequestSource>,
    clock: Box<dyn Clock>,
    on_failure: Option<FailureHandler>,
}

impl EventRecorder {
    /// Recorder with no request context and the local clock
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            request: Arc::new(NoRequest),
            clock: Box::new(LocalClock),
            on_failure: None,
        }
    }

    /// Read request metadata from `request` at record time
    pub fn with_request_source(mut self, request: Arc<dyn RequestSource>) -> Self {
        self.request = request;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Observe store failures that `record` would otherwise drop silently
    pub fn with_failure_handler(
        mut self,
        handler: impl Fn(&ActivityLogError) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Box::new(handler));
        self
    }

    /// Record one event. Never fails from the caller's point of view.
    pub fn record(&self, kind: EventKind, fields: EventFields) {
        if let Err(err) = self.try_record(kind, fields) {
            warn!(
                target: "user_activity_log::recorder",
                action = %kind,
                error = %err,
                "dropping activity record"
            );
            if let Some(handler) = &self.on_failure {
                handler(&err);
            }
        }
    }

    /// Like [`record`](Self::record) but hands the store failure back
    pub fn try_record(&self, kind: EventKind, fields: EventFields) -> ActivityLogResult<()> {
        let record = self.render(&ActivityEvent::new(kind, fields));
        self.sink.append(record.as_str())?;
        debug!(
            target: "user_activity_log::recorder",
            action = %kind,
            "activity record appended"
        );
        Ok(())
    }

    /// Render an event against the current request without writing it
    pub fn render(&self, event: &ActivityEvent) -> LogRecord {
        let context = RequestContext::capture(self.request.as_ref(), self.clock.as_ref());
        LogRecord::render(event, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::{FileSink, MemorySink};
    use crate::session_context::{FixedClock, StaticRequest};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_record_appends_exact_line() {
        let sink = Arc::new(MemorySink::new());
        let recorder = EventRecorder::new(sink.clone())
            .with_request_source(Arc::new(StaticRequest::new(
                "10.0.0.5",
                "curl/8.0",
                "/wp-login.php",
            )))
            .with_clock(clock());

        recorder.record(EventKind::LoginFailed, EventFields::new().with("Username", "bob"));

        assert_eq!(
            sink.lines(),
            vec!["[2024-05-01 12:00:00] IP: 10.0.0.5 - URI: /wp-login.php - User-Agent: curl/8.0 - Action: LOGIN_FAILED - Username: bob\n".to_string()]
        );
    }

    #[test]
    fn test_user_updated_changes_keep_arrows() {
        let sink = Arc::new(MemorySink::new());
        let recorder = EventRecorder::new(sink.clone()).with_clock(clock());

        recorder.record(
            EventKind::UserUpdated,
            EventFields::new().with("ID", 7u64).with(
                "Changes",
                vec!["a@old.example => a@new.example", "Kim => <b>Kimberly</b>"],
            ),
        );

        assert_eq!(
            sink.lines(),
            vec!["[2024-05-01 12:00:00] IP: Unknown - URI: Unknown - User-Agent: Unknown - Action: USER_UPDATED - ID: 7 - Changes: a@old.example => a@new.example, Kim => Kimberly\n".to_string()]
        );
    }

    #[test]
    fn test_missing_request_renders_unknown() {
        let sink = Arc::new(MemorySink::new());
        let recorder = EventRecorder::new(sink.clone()).with_clock(clock());

        recorder.record(
            EventKind::PasswordResetRequested,
            EventFields::new().with("User", "carol"),
        );

        assert_eq!(
            sink.contents(),
            "[2024-05-01 12:00:00] IP: Unknown - URI: Unknown - User-Agent: Unknown - Action: PASSWORD_RESET_REQUESTED - User: carol\n"
        );
    }

    #[test]
    fn test_records_keep_call_order() {
        let sink = Arc::new(MemorySink::new());
        let recorder = EventRecorder::new(sink.clone()).with_clock(clock());

        for name in ["first", "second", "third"] {
            recorder.record(EventKind::LoginFailed, EventFields::new().with("Username", name));
        }

        let users: Vec<String> = sink
            .lines()
            .iter()
            .map(|l| l.rsplit("Username: ").next().unwrap().trim_end().to_string())
            .collect();
        assert_eq!(users, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_store_failure_is_swallowed_and_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = failures.clone();

        let recorder = EventRecorder::new(FileSink::new(dir.path().join("absent/user-activities.log")))
            .with_failure_handler(move |err| {
                assert!(err.is_store_failure());
                seen.fetch_add(1, Ordering::SeqCst);
            });

        recorder.record(EventKind::LoginFailed, EventFields::new().with("Username", "bob"));
        assert_eq!(failures.load(Ordering::SeqCst), 1);

        let err = recorder
            .try_record(EventKind::LoginFailed, EventFields::new().with("Username", "bob"))
            .unwrap_err();
        assert!(err.is_store_failure());
    }
}
