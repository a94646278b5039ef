//! Boundaries to the collaborators a session talks to: who is typing, which
//! employee that is, where sessions are stored and how the user is told.

use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

use crate::session::{Reading, SessionSummary};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmployeeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_inner!(UserId, EmployeeId, SessionId);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("could not prepare storage at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BreakKind {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRecord {
    pub kind: BreakKind,
    pub reason: String,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClose {
    pub end_time: DateTime<Local>,
    pub summary: SessionSummary,
}

impl SessionClose {
    pub fn productivity_score(&self) -> u8 {
        self.summary.productivity_score()
    }
}

pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserId>;
}

pub trait EmployeeDirectory {
    fn find_employee_by_user(&self, user: &UserId) -> StoreResult<Option<EmployeeId>>;
}

pub trait SessionStore {
    fn create_session(
        &mut self,
        employee: &EmployeeId,
        start_time: DateTime<Local>,
    ) -> StoreResult<SessionId>;

    fn append_reading(&mut self, session: &SessionId, reading: &Reading) -> StoreResult<()>;

    fn record_break(&mut self, session: &SessionId, record: &BreakRecord) -> StoreResult<()>;

    fn close_session(&mut self, session: &SessionId, close: &SessionClose) -> StoreResult<()>;
}

/// Directory and store behind one handle
pub trait Backend: EmployeeDirectory + SessionStore {}

impl<T: EmployeeDirectory + SessionStore> Backend for T {}

/// Identity resolved once from flags, config or the environment
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    pub fn new(user: Option<String>) -> Self {
        Self {
            user: user
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .map(UserId),
        }
    }

    /// Falls back to `$USER` then `$USERNAME`
    pub fn from_env_or(user: Option<String>) -> Self {
        let user = user
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok());
        Self::new(user)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            duration: None,
        }
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Where user-facing messages go
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_users_resolve_to_none() {
        assert_eq!(StaticIdentity::new(Some("  ".into())).current_user(), None);
        assert_eq!(StaticIdentity::new(None).current_user(), None);
        assert_eq!(
            StaticIdentity::new(Some(" ana ".into())).current_user(),
            Some(UserId("ana".into()))
        );
    }

    #[test]
    fn explicit_user_beats_environment() {
        let identity = StaticIdentity::from_env_or(Some("kim".into()));
        assert_eq!(identity.current_user(), Some(UserId("kim".into())));
    }

    #[test]
    fn break_kind_labels() {
        assert_eq!(BreakKind::Automatic.to_string(), "automatic");
        assert_eq!(BreakKind::Manual.to_string(), "manual");
    }

    #[test]
    fn store_error_messages() {
        let err = StoreError::UnknownSession(SessionId("abc".into()));
        assert_eq!(err.to_string(), "unknown session abc");
    }
}
