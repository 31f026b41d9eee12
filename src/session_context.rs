//! Request context captured once per recorded event

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Literal used for any request attribute the host cannot supply
pub const UNKNOWN: &str = "Unknown";

/// Read access to the inbound request that triggered a lifecycle event
pub trait RequestSource: Send + Sync {
    fn client_address(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn request_uri(&self) -> Option<String>;
}

/// Source of the record timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, truncated to whole seconds when rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// For events raised outside any request (CLI tools, cron jobs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequest;

impl RequestSource for NoRequest {
    fn client_address(&self) -> Option<String> {
        None
    }

    fn user_agent(&self) -> Option<String> {
        None
    }

    fn request_uri(&self) -> Option<String> {
        None
    }
}

/// Request metadata known up front
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRequest {
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub request_uri: Option<String>,
}

impl StaticRequest {
    pub fn new(client_address: &str, user_agent: &str, request_uri: &str) -> Self {
        Self {
            client_address: Some(client_address.to_string()),
            user_agent: Some(user_agent.to_string()),
            request_uri: Some(request_uri.to_string()),
        }
    }
}

impl RequestSource for StaticRequest {
    fn client_address(&self) -> Option<String> {
        self.client_address.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn request_uri(&self) -> Option<String> {
        self.request_uri.clone()
    }
}

/// Snapshot of the request at record time; never stored on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub timestamp: NaiveDateTime,
    pub client_address: String,
    pub user_agent: String,
    pub request_uri: String,
}

impl RequestContext {
    /// Read every attribute once, substituting [`UNKNOWN`] for absent ones
    pub fn capture(request: &dyn RequestSource, clock: &dyn Clock) -> Self {
        Self {
            timestamp: clock.now(),
            client_address: or_unknown(request.client_address()),
            user_agent: or_unknown(request.user_agent()),
            request_uri: or_unknown(request.request_uri()),
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}
