//! Lifecycle event kinds and the single-line record format

use crate::errors::ActivityLogError;
use crate::sanitizer::{sanitize, sanitize_request_text, sanitize_text, LogValue};
use crate::session_context::RequestContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used at the head of every record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The identity lifecycle events this logger observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    LoginSuccess,
    LoginFailed,
    UserCreated,
    UserUpdated,
    UserDeleted,
    PasswordResetRequested,
    PasswordResetSuccess,
    RoleChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::LoginSuccess,
        EventKind::LoginFailed,
        EventKind::UserCreated,
        EventKind::UserUpdated,
        EventKind::UserDeleted,
        EventKind::PasswordResetRequested,
        EventKind::PasswordResetSuccess,
        EventKind::RoleChanged,
    ];

    /// The fixed tag written after `Action:`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LoginSuccess => "LOGIN_SUCCESS",
            EventKind::LoginFailed => "LOGIN_FAILED",
            EventKind::UserCreated => "USER_CREATED",
            EventKind::UserUpdated => "USER_UPDATED",
            EventKind::UserDeleted => "USER_DELETED",
            EventKind::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
            EventKind::PasswordResetSuccess => "PASSWORD_RESET_SUCCESS",
            EventKind::RoleChanged => "ROLE_CHANGED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ActivityLogError;

    fn from_str(input: &str) -> Result<EventKind, Self::Err> {
        let normalized = input.trim().to_uppercase().replace('-', "_");
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ActivityLogError::invalid_event(format!("unknown event kind '{input}'")))
    }
}

/// Ordered field mapping for one event; insertion order is output order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFields(Vec<(String, LogValue)>);

impl EventFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style
    pub fn with(mut self, name: &str, value: impl Into<LogValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field, replacing the value in place if the name already exists
    pub fn push(&mut self, name: &str, value: impl Into<LogValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LogValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LogValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Sanitize every value; names are fixed literals and stay as given.
    pub fn sanitized(&self) -> EventFields {
        EventFields(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), sanitize(value)))
                .collect(),
        )
    }
}

impl<N: Into<String>, V: Into<LogValue>> FromIterator<(N, V)> for EventFields {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut fields = EventFields::new();
        for (name, value) in iter {
            let name: String = name.into();
            fields.push(&name, value);
        }
        fields
    }
}

/// One semantic event: a kind tag plus its ordered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: EventKind,
    pub fields: EventFields,
}

impl ActivityEvent {
    pub fn new(kind: EventKind, fields: EventFields) -> Self {
        Self { kind, fields }
    }
}

/// Immutable textual rendering of one event and its request context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    line: String,
}

impl LogRecord {
    /// Sanitize `event` and render it against `context`.
    ///
    /// Context values are sanitized too: client address, user agent and
    /// request path all come from the inbound request. Percent-encoding in
    /// them is kept as sent.
    pub fn render(event: &ActivityEvent, context: &RequestContext) -> Self {
        let action = sanitize_text(event.kind.as_str());
        let fields = event.fields.sanitized();

        let mut line = format!(
            "[{}] IP: {} - URI: {} - User-Agent: {} - Action: {} - ",
            context.timestamp.format(TIMESTAMP_FORMAT),
            sanitize_request_text(&context.client_address),
            sanitize_request_text(&context.request_uri),
            sanitize_request_text(&context.user_agent),
            action,
        );

        let details: Vec<String> = fields
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        line.push_str(&details.join(" - "));
        line.push('\n');

        Self { line }
    }

    /// The full line including its trailing newline
    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn into_line(self) -> String {
        self.line
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}
