//! Host-side user records and the current-actor lookup
//!
//! The logger never owns user data. Hosts expose their store through
//! [`UserDirectory`]; [`InMemoryDirectory`] covers hosts without one and
//! the replay tool.

use crate::errors::{ActivityLogError, ActivityLogResult, SafeReadLock, SafeWriteLock};
use crate::session_context::UNKNOWN;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// A user as resolved by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserRecord {
    pub fn new(id: u64, login: &str) -> Self {
        Self {
            id,
            login: login.to_string(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }
}

/// User lookup and current-actor access provided by the host
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, id: u64) -> Option<UserRecord>;

    /// Id of the authenticated user performing the action, 0 when none
    fn current_user_id(&self) -> u64;
}

/// The user acting on another account, resolved to what a record shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub login: String,
}

impl Actor {
    /// Resolve the current actor; a missing actor or record falls back to
    /// `"Unknown"`, and a missing actor to id 0.
    pub fn resolve(directory: &dyn UserDirectory) -> Self {
        let id = directory.current_user_id();
        let login = if id == 0 {
            None
        } else {
            directory.find_user(id).map(|user| user.login)
        };

        Self {
            id,
            login: login.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// Thread-safe in-process directory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<u64, UserRecord>>,
    current_user: AtomicU64,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let map = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: RwLock::new(map),
            current_user: AtomicU64::new(0),
        }
    }

    /// Load a JSON array of user records
    pub fn from_json(json: &str) -> ActivityLogResult<Self> {
        let users: Vec<UserRecord> = serde_json::from_str(json)
            .map_err(|e| ActivityLogError::serialization("parsing user directory", e))?;
        Ok(Self::with_users(users))
    }

    pub fn upsert(&self, user: UserRecord) -> ActivityLogResult<()> {
        self.users.safe_write()?.insert(user.id, user);
        Ok(())
    }

    pub fn remove(&self, id: u64) -> ActivityLogResult<Option<UserRecord>> {
        Ok(self.users.safe_write()?.remove(&id))
    }

    /// Set the acting user; 0 clears it
    pub fn set_current_user(&self, id: u64) {
        self.current_user.store(id, Ordering::SeqCst);
    }
}

impl UserDirectory for InMemoryDirectory {
    fn find_user(&self, id: u64) -> Option<UserRecord> {
        // A poisoned lock reads as a lookup miss
        self.users.safe_read().ok()?.get(&id).cloned()
    }

    fn current_user_id(&self) -> u64 {
        self.current_user.load(Ordering::SeqCst)
    }
}
