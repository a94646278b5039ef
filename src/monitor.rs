use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::backend::{BreakKind, BreakRecord, Notification, Notifier};
use crate::clock::Clock;
use crate::notify::Toasts;
use crate::recorder::SessionRecorder;
use crate::runtime::MonitorEvent;
use crate::scheduler::{TimerKind, TimerSlot, TimerTag};
use crate::scoring::Jitter;
use crate::session::{FatigueSession, SessionEvent, SessionState, SessionSummary};
use crate::time_series::{ScoreHistory, ScorePoint};

/// One hour of once-per-second samples
const HISTORY_LEN: usize = 3_600;
const BREAK_TOAST: Duration = Duration::from_secs(5);
/// Session ticks and break countdown steps are one second each
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Drives a [`FatigueSession`] with real timers and reports what happens.
///
/// At most one timer is armed at a time: the monitoring tick or the break
/// countdown. Both deliver [`MonitorEvent::Timer`] through the app's event
/// queue, and ticks from a timer that has since been replaced are dropped.
pub struct Monitor<C: Clock, J: Jitter> {
    session: FatigueSession<C, J>,
    recorder: SessionRecorder,
    toasts: Toasts,
    timers: TimerSlot,
    events: Sender<MonitorEvent>,
    history: ScoreHistory,
}

impl<C: Clock, J: Jitter> Monitor<C, J> {
    pub fn new(
        session: FatigueSession<C, J>,
        recorder: SessionRecorder,
        events: Sender<MonitorEvent>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session,
            recorder,
            toasts: Toasts::new(),
            timers: TimerSlot::new(tick_interval),
            events,
            history: ScoreHistory::new(HISTORY_LEN),
        }
    }

    pub fn start(&mut self) -> bool {
        if !self.session.start() {
            return false;
        }
        self.recorder.begin(&mut self.toasts);
        self.arm(TimerKind::Monitor);
        self.toasts.notify(Notification::new(
            "Monitoring Started",
            "Your typing patterns are being analyzed.",
        ));
        true
    }

    /// Start when idle, stop otherwise
    pub fn toggle(&mut self) {
        match self.session.state() {
            SessionState::Idle => {
                self.start();
            }
            SessionState::Monitoring | SessionState::OnBreak => {
                self.stop();
            }
        }
    }

    pub fn keystroke(&mut self) -> bool {
        self.session.record_keystroke()
    }

    /// Break requested by the user rather than by the score
    pub fn take_break(&mut self) -> bool {
        if self.session.trigger_break().is_none() {
            return false;
        }
        self.begin_break(BreakKind::Manual, "requested by user".to_string());
        true
    }

    pub fn on_timer(&mut self, tag: TimerTag) {
        if !self.timers.is_current(tag) {
            log::trace!("dropping stale {:?} tick", tag.kind);
            return;
        }
        match tag.kind {
            TimerKind::Monitor => {
                let events = self.session.tick();
                self.history.push(ScorePoint::new(
                    self.session.elapsed_secs() as f64,
                    self.session.fatigue_score() as f64,
                ));
                for event in events {
                    self.handle(event);
                }
            }
            TimerKind::Break => {
                if let Some(event) = self.session.countdown() {
                    self.handle(event);
                }
            }
        }
    }

    pub fn stop(&mut self) -> Option<SessionSummary> {
        self.timers.disarm();
        let summary = self.session.stop()?;
        self.recorder.finish(summary, &mut self.toasts);
        self.toasts.notify(Notification::new(
            "Monitoring Paused",
            format!(
                "Final fatigue score {} after {} keystrokes.",
                summary.final_score, summary.total_keystrokes
            ),
        ));
        Some(summary)
    }

    pub fn reset(&mut self) {
        self.stop();
        self.session.reset();
        self.history.clear();
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ReadingDue(reading) => self.recorder.reading(&reading, &mut self.toasts),
            SessionEvent::BreakStarted { score } => {
                self.begin_break(BreakKind::Automatic, format!("fatigue score {score}"))
            }
            SessionEvent::BreakCompleted => {
                self.arm(TimerKind::Monitor);
                self.toasts.notify(Notification::new(
                    "Break Complete",
                    "You can resume your work now.",
                ));
            }
        }
    }

    fn begin_break(&mut self, kind: BreakKind, reason: String) {
        self.arm(TimerKind::Break);
        let secs = self.session.policy().break_len();
        log::info!("{kind} break for {secs}s: {reason}");
        self.recorder.break_taken(
            &BreakRecord {
                kind,
                reason,
                duration_secs: secs,
            },
            &mut self.toasts,
        );
        self.toasts.notify(
            Notification::new(
                "Break Time!",
                format!("Your fatigue score is high. Please take a {secs}-second break."),
            )
            .lasting(BREAK_TOAST),
        );
    }

    fn arm(&mut self, kind: TimerKind) {
        let tx = self.events.clone();
        self.timers
            .arm(kind, move |tag| tx.send(MonitorEvent::Timer(tag)).is_ok());
    }

    pub fn session(&self) -> &FatigueSession<C, J> {
        &self.session
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn toasts_mut(&mut self) -> &mut Toasts {
        &mut self.toasts
    }

    pub fn history(&self) -> &[ScorePoint] {
        self.history.recent()
    }

    pub fn active_timer(&self) -> Option<TimerTag> {
        self.timers.active()
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }
}
