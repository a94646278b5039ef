use chrono::Local;

use crate::backend::{
    Backend, BreakRecord, IdentityProvider, Notification, Notifier, SessionClose, SessionId,
    StoreError,
};
use crate::session::{Reading, SessionSummary};

/// Best-effort persistence of a monitoring session.
///
/// Nothing here can fail the caller: every storage problem is logged, shown to
/// the user once, and otherwise ignored. Without a backend the recorder does
/// nothing at all.
pub struct SessionRecorder {
    identity: Box<dyn IdentityProvider>,
    backend: Option<Box<dyn Backend>>,
    active: Option<SessionId>,
}

impl SessionRecorder {
    pub fn new(identity: Box<dyn IdentityProvider>, backend: Box<dyn Backend>) -> Self {
        Self {
            identity,
            backend: Some(backend),
            active: None,
        }
    }

    /// A recorder that never persists anything
    pub fn offline(identity: Box<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            backend: None,
            active: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_none()
    }

    pub fn active_session(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// Open a persisted session for the current user, if one can be resolved
    pub fn begin(&mut self, notifier: &mut dyn Notifier) {
        if self.active.is_some() {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let Some(user) = self.identity.current_user() else {
            log::warn!("no current user, session will not be saved");
            notifier.notify(Notification::new(
                "Not signed in",
                "This session will not be saved.",
            ));
            return;
        };

        let employee = match backend.find_employee_by_user(&user) {
            Ok(Some(employee)) => employee,
            Ok(None) => {
                log::warn!("user {user} has no employee record, session will not be saved");
                notifier.notify(Notification::new(
                    "No employee record",
                    format!("Run `lull enroll` for {user} to keep session history."),
                ));
                return;
            }
            Err(e) => {
                report(notifier, "employee lookup", &e);
                return;
            }
        };

        match backend.create_session(&employee, Local::now()) {
            Ok(id) => {
                log::info!("recording session {id} for employee {employee}");
                self.active = Some(id);
            }
            Err(e) => report(notifier, "creating session", &e),
        }
    }

    pub fn reading(&mut self, reading: &Reading, notifier: &mut dyn Notifier) {
        let (Some(backend), Some(id)) = (self.backend.as_mut(), self.active.as_ref()) else {
            return;
        };
        match backend.append_reading(id, reading) {
            Ok(()) => log::debug!(
                "reading at {}s: score {} wpm {}",
                reading.elapsed_secs,
                reading.fatigue_score,
                reading.wpm
            ),
            Err(e) => report(notifier, "saving reading", &e),
        }
    }

    pub fn break_taken(&mut self, record: &BreakRecord, notifier: &mut dyn Notifier) {
        let (Some(backend), Some(id)) = (self.backend.as_mut(), self.active.as_ref()) else {
            return;
        };
        if let Err(e) = backend.record_break(id, record) {
            report(notifier, "saving break", &e);
        }
    }

    /// Close the persisted session. The recorder is ready for a new one afterwards.
    pub fn finish(&mut self, summary: SessionSummary, notifier: &mut dyn Notifier) {
        let Some(id) = self.active.take() else {
            return;
        };
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let close = SessionClose {
            end_time: Local::now(),
            summary,
        };
        match backend.close_session(&id, &close) {
            Ok(()) => log::info!(
                "closed session {id}: final score {}, productivity {}",
                summary.final_score,
                close.productivity_score()
            ),
            Err(e) => report(notifier, "closing session", &e),
        }
    }
}

fn report(notifier: &mut dyn Notifier, action: &str, err: &StoreError) {
    log::warn!("{action} failed: {err}");
    notifier.notify(Notification::new(
        "Could not save session data",
        format!("{action} failed: {err}"),
    ));
}
