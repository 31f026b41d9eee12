//! Lifecycle subscription surface
//!
//! Hosts call one [`LifecycleHooks`] method at the moment each identity
//! event happens. [`ActivityLogger`] turns every call into exactly one
//! record; the per-kind builders only assemble the ordered field mapping.

use crate::audit::{EventFields, EventKind};
use crate::directory::{Actor, UserDirectory, UserRecord};
use crate::recorder::EventRecorder;
use crate::sanitizer::LogValue;
use crate::session_context::UNKNOWN;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One method per lifecycle event the host can raise
pub trait LifecycleHooks {
    fn on_login_success(&self, username: &str, user: &UserRecord);
    fn on_login_failed(&self, username: &str);
    fn on_user_created(&self, user_id: u64);
    fn on_user_updated(&self, user_id: u64, previous: &UserRecord);
    fn on_user_deleted(&self, user_id: u64, reassign_to: Option<u64>);
    fn on_password_reset_requested(&self, username: &str);
    fn on_password_reset(&self, user: &UserRecord, new_password: &str);
    fn on_role_changed(&self, user_id: u64, new_role: &str, old_roles: &[String]);
}

/// A lifecycle notification in serializable form, for hosts that queue
/// events or replay them from a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    LoginSuccess {
        username: String,
        user: UserRecord,
    },
    LoginFailed {
        username: String,
    },
    UserCreated {
        user_id: u64,
    },
    UserUpdated {
        user_id: u64,
        previous: UserRecord,
    },
    UserDeleted {
        user_id: u64,
        #[serde(default)]
        reassign_to: Option<u64>,
    },
    PasswordResetRequested {
        username: String,
    },
    PasswordResetSucceeded {
        user: UserRecord,
        #[serde(default)]
        new_password: String,
    },
    RoleChanged {
        user_id: u64,
        new_role: String,
        #[serde(default)]
        old_roles: Vec<String>,
    },
}

impl LifecycleEvent {
    /// The record kind this notification produces
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::LoginSuccess { .. } => EventKind::LoginSuccess,
            LifecycleEvent::LoginFailed { .. } => EventKind::LoginFailed,
            LifecycleEvent::UserCreated { .. } => EventKind::UserCreated,
            LifecycleEvent::UserUpdated { .. } => EventKind::UserUpdated,
            LifecycleEvent::UserDeleted { .. } => EventKind::UserDeleted,
            LifecycleEvent::PasswordResetRequested { .. } => EventKind::PasswordResetRequested,
            LifecycleEvent::PasswordResetSucceeded { .. } => EventKind::PasswordResetSuccess,
            LifecycleEvent::RoleChanged { .. } => EventKind::RoleChanged,
        }
    }

    /// Invoke the matching hook
    pub fn dispatch(&self, hooks: &dyn LifecycleHooks) {
        match self {
            LifecycleEvent::LoginSuccess { username, user } => hooks.on_login_success(username, user),
            LifecycleEvent::LoginFailed { username } => hooks.on_login_failed(username),
            LifecycleEvent::UserCreated { user_id } => hooks.on_user_created(*user_id),
            LifecycleEvent::UserUpdated { user_id, previous } => {
                hooks.on_user_updated(*user_id, previous)
            }
            LifecycleEvent::UserDeleted { user_id, reassign_to } => {
                hooks.on_user_deleted(*user_id, *reassign_to)
            }
            LifecycleEvent::PasswordResetRequested { username } => {
                hooks.on_password_reset_requested(username)
            }
            LifecycleEvent::PasswordResetSucceeded { user, new_password } => {
                hooks.on_password_reset(user, new_password)
            }
            LifecycleEvent::RoleChanged { user_id, new_role, old_roles } => {
                hooks.on_role_changed(*user_id, new_role, old_roles)
            }
        }
    }
}

/// Writes one activity record per lifecycle hook call
pub struct ActivityLogger {
    recorder: EventRecorder,
    directory: Arc<dyn UserDirectory>,
}

impl ActivityLogger {
    pub fn new(recorder: EventRecorder, directory: Arc<dyn UserDirectory>) -> Self {
        Self { recorder, directory }
    }

    fn lookup_user(&self, user_id: u64) -> Option<UserRecord> {
        self.directory.find_user(user_id)
    }

    pub fn login_success_fields(username: &str, user: &UserRecord) -> EventFields {
        EventFields::new()
            .with("User", username)
            .with("ID", user.id)
            .with("Display Name", &user.display_name)
            .with("Email", &user.email)
            .with("Roles", roles_or_none(&user.roles))
    }

    pub fn login_failed_fields(username: &str) -> EventFields {
        EventFields::new().with("Username", username)
    }

    pub fn user_created_fields(user_id: u64, user: Option<&UserRecord>, creator: &Actor) -> EventFields {
        EventFields::new()
            .with("ID", user_id)
            .with("Login", user.map_or(UNKNOWN, |u| u.login.as_str()))
            .with("Email", user.map_or(UNKNOWN, |u| u.email.as_str()))
            .with("Roles", LogValue::list(user.map(|u| u.roles.clone()).unwrap_or_default()))
            .with("Created By", &creator.login)
            .with("Creator ID", creator.id)
    }

    pub fn user_updated_fields(
        user_id: u64,
        current: Option<&UserRecord>,
        previous: &UserRecord,
        editor: &Actor,
    ) -> EventFields {
        let mut changes = Vec::new();
        if let Some(user) = current {
            if previous.email != user.email {
                changes.push(format!("{} => {}", previous.email, user.email));
            }
            if previous.display_name != user.display_name {
                changes.push(format!("{} => {}", previous.display_name, user.display_name));
            }
        }

        let changes = if changes.is_empty() {
            LogValue::from("Profile data updated")
        } else {
            LogValue::list(changes)
        };

        EventFields::new()
            .with("ID", user_id)
            .with("Login", current.map_or(UNKNOWN, |u| u.login.as_str()))
            .with("Changes", changes)
            .with("Updated By", &editor.login)
            .with("Editor ID", editor.id)
    }

    pub fn user_deleted_fields(user_id: u64, reassign_to: Option<u64>, deleter: &Actor) -> EventFields {
        EventFields::new()
            .with("ID", user_id)
            .with("Reassigned To", reassign_to.unwrap_or(0))
            .with("Deleted By", &deleter.login)
            .with("Deleter ID", deleter.id)
    }

    pub fn password_reset_requested_fields(username: &str) -> EventFields {
        EventFields::new().with("User", username)
    }

    pub fn password_reset_fields(user: &UserRecord) -> EventFields {
        EventFields::new().with("User", &user.login).with("ID", user.id)
    }

    pub fn role_changed_fields(
        user_id: u64,
        user: Option<&UserRecord>,
        new_role: &str,
        old_roles: &[String],
        editor: &Actor,
    ) -> EventFields {
        let new_role = if new_role.is_empty() { "none" } else { new_role };

        EventFields::new()
            .with("User", user.map_or(UNKNOWN, |u| u.login.as_str()))
            .with("ID", user_id)
            .with("Old Roles", LogValue::list(old_roles))
            .with("New Role", new_role)
            .with("Changed By", &editor.login)
            .with("Editor ID", editor.id)
    }
}

fn roles_or_none(roles: &[String]) -> LogValue {
    if roles.is_empty() {
        LogValue::from("none")
    } else {
        LogValue::list(roles)
    }
}

impl LifecycleHooks for ActivityLogger {
    fn on_login_success(&self, username: &str, user: &UserRecord) {
        self.recorder
            .record(EventKind::LoginSuccess, Self::login_success_fields(username, user));
    }

    fn on_login_failed(&self, username: &str) {
        self.recorder
            .record(EventKind::LoginFailed, Self::login_failed_fields(username));
    }

    fn on_user_created(&self, user_id: u64) {
        let user = self.lookup_user(user_id);
        let creator = Actor::resolve(self.directory.as_ref());
        self.recorder.record(
            EventKind::UserCreated,
            Self::user_created_fields(user_id, user.as_ref(), &creator),
        );
    }

    fn on_user_updated(&self, user_id: u64, previous: &UserRecord) {
        let current = self.lookup_user(user_id);
        let editor = Actor::resolve(self.directory.as_ref());
        self.recorder.record(
            EventKind::UserUpdated,
            Self::user_updated_fields(user_id, current.as_ref(), previous, &editor),
        );
    }

    fn on_user_deleted(&self, user_id: u64, reassign_to: Option<u64>) {
        let deleter = Actor::resolve(self.directory.as_ref());
        self.recorder.record(
            EventKind::UserDeleted,
            Self::user_deleted_fields(user_id, reassign_to, &deleter),
        );
    }

    fn on_password_reset_requested(&self, username: &str) {
        self.recorder.record(
            EventKind::PasswordResetRequested,
            Self::password_reset_requested_fields(username),
        );
    }

    fn on_password_reset(&self, user: &UserRecord, _new_password: &str) {
        self.recorder
            .record(EventKind::PasswordResetSuccess, Self::password_reset_fields(user));
    }

    fn on_role_changed(&self, user_id: u64, new_role: &str, old_roles: &[String]) {
        let user = self.lookup_user(user_id);
        let editor = Actor::resolve(self.directory.as_ref());
        self.recorder.record(
            EventKind::RoleChanged,
            Self::role_changed_fields(user_id, user.as_ref(), new_role, old_roles, &editor),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nobody() -> Actor {
        Actor { id: 0, login: UNKNOWN.into() }
    }

    fn rendered(fields: &EventFields) -> Vec<String> {
        fields.iter().map(|(n, v)| format!("{n}: {v}")).collect()
    }

    #[test]
    fn test_login_success_roles_fallback() {
        let user = UserRecord::new(3, "alice")
            .with_email("alice@example.com")
            .with_display_name("Alice");
        let fields = ActivityLogger::login_success_fields("alice", &user);
        assert_eq!(
            rendered(&fields),
            vec!["User: alice", "ID: 3", "Display Name: Alice", "Email: alice@example.com", "Roles: none"]
        );

        let admin = user.with_roles(&["administrator", "editor"]);
        let fields = ActivityLogger::login_success_fields("alice", &admin);
        assert_eq!(fields.get("Roles").unwrap().to_string(), "administrator, editor");
    }

    #[test]
    fn test_role_change_without_actor() {
        let user = UserRecord::new(8, "sam");
        let fields = ActivityLogger::role_changed_fields(
            8,
            Some(&user),
            "editor",
            &["subscriber".to_string()],
            &nobody(),
        );
        assert_eq!(
            rendered(&fields),
            vec!["User: sam", "ID: 8", "Old Roles: subscriber", "New Role: editor", "Changed By: Unknown", "Editor ID: 0"]
        );
    }

    #[test]
    fn test_role_removed_renders_none() {
        let fields = ActivityLogger::role_changed_fields(8, None, "", &[], &nobody());
        assert_eq!(fields.get("New Role").unwrap().to_string(), "none");
        assert_eq!(fields.get("User").unwrap().to_string(), "Unknown");
        assert_eq!(fields.get("Old Roles").unwrap().to_string(), "");
    }

    #[test]
    fn test_user_deleted_without_reassignment() {
        let fields = ActivityLogger::user_deleted_fields(12, None, &nobody());
        assert_eq!(
            rendered(&fields),
            vec!["ID: 12", "Reassigned To: 0", "Deleted By: Unknown", "Deleter ID: 0"]
        );
    }

    #[test]
    fn test_user_updated_lists_changes() {
        let previous = UserRecord::new(4, "kim")
            .with_email("old@example.com")
            .with_display_name("Kim");
        let current = previous.clone().with_email("new@example.com").with_display_name("Kimberly");
        let editor = Actor { id: 1, login: "admin".into() };

        let fields = ActivityLogger::user_updated_fields(4, Some(&current), &previous, &editor);
        assert_eq!(
            rendered(&fields),
            vec![
                "ID: 4",
                "Login: kim",
                "Changes: old@example.com => new@example.com, Kim => Kimberly",
                "Updated By: admin",
                "Editor ID: 1",
            ]
        );
    }

    #[test]
    fn test_user_updated_without_tracked_changes() {
        let previous = UserRecord::new(4, "kim");
        let fields = ActivityLogger::user_updated_fields(4, Some(&previous), &previous, &nobody());
        assert_eq!(fields.get("Changes").unwrap().to_string(), "Profile data updated");
    }

    #[test]
    fn test_user_created_with_creator() {
        let user = UserRecord::new(20, "newbie")
            .with_email("n@example.com")
            .with_roles(&["subscriber"]);
        let creator = Actor { id: 1, login: "admin".into() };
        let fields = ActivityLogger::user_created_fields(20, Some(&user), &creator);
        assert_eq!(
            rendered(&fields),
            vec!["ID: 20", "Login: newbie", "Email: n@example.com", "Roles: subscriber", "Created By: admin", "Creator ID: 1"]
        );
    }

    #[test]
    fn test_lifecycle_event_from_json() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"event": "user-deleted", "user_id": 12}"#,
        )
        .unwrap();
        assert_eq!(event, LifecycleEvent::UserDeleted { user_id: 12, reassign_to: None });
        assert_eq!(event.kind(), EventKind::UserDeleted);
    }
}
