use crate::clock::Clock;
use crate::keystrokes::{KeystrokeLog, WPM_WINDOW_MS};
use crate::policy::BreakPolicy;
use crate::scoring::{evaluate, Jitter, ScoreBreakdown, ScoreInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum SessionState {
    #[default]
    Idle,
    Monitoring,
    #[strum(to_string = "On Break")]
    OnBreak,
}

/// Periodic sample persisted while monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub fatigue_score: u8,
    pub wpm: u32,
    pub keystroke_count: u64,
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ReadingDue(Reading),
    BreakStarted { score: u8 },
    BreakCompleted,
}

/// Final numbers of a session, produced when it stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub final_score: u8,
    pub total_keystrokes: u64,
    pub elapsed_secs: u64,
    pub break_count: u32,
}

impl SessionSummary {
    pub fn productivity_score(&self) -> u8 {
        100 - self.final_score.min(100)
    }
}

/// Plain copy of the observable session fields
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub elapsed_secs: u64,
    pub current_wpm: u32,
    pub fatigue_score: u8,
    pub break_secs_remaining: u32,
    pub total_keystrokes: u64,
    pub break_count: u32,
    pub retained_keystrokes: usize,
}

/// Fatigue simulation and break policy for one monitoring session.
///
/// The session does not own any timers. Whoever drives it calls [`tick`] once
/// per second while monitoring and [`countdown`] once per second while on a
/// break.
///
/// [`tick`]: FatigueSession::tick
/// [`countdown`]: FatigueSession::countdown
#[derive(Debug)]
pub struct FatigueSession<C: Clock, J: Jitter> {
    clock: C,
    jitter: J,
    policy: BreakPolicy,
    state: SessionState,
    elapsed_secs: u64,
    keystrokes: KeystrokeLog,
    last_activity_ms: u64,
    current_wpm: u32,
    fatigue_score: u8,
    breakdown: ScoreBreakdown,
    break_secs_remaining: u32,
    total_keystrokes: u64,
    break_count: u32,
}

impl<C: Clock, J: Jitter> FatigueSession<C, J> {
    pub fn new(clock: C, jitter: J, policy: BreakPolicy) -> Self {
        Self {
            clock,
            jitter,
            policy,
            state: SessionState::Idle,
            elapsed_secs: 0,
            keystrokes: KeystrokeLog::new(),
            last_activity_ms: 0,
            current_wpm: 0,
            fatigue_score: 0,
            breakdown: ScoreBreakdown::default(),
            break_secs_remaining: policy.break_len(),
            total_keystrokes: 0,
            break_count: 0,
        }
    }

    /// Begin monitoring. Returns false when already monitoring or on a break.
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Monitoring;
        self.last_activity_ms = self.clock.now_ms();
        true
    }

    /// Returns whether the keystroke was counted
    pub fn record_keystroke(&mut self) -> bool {
        if self.state != SessionState::Monitoring {
            return false;
        }
        let now = self.clock.now_ms();
        self.keystrokes.push(now);
        self.last_activity_ms = now;
        self.total_keystrokes += 1;
        true
    }

    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.state != SessionState::Monitoring {
            return events;
        }

        self.elapsed_secs += 1;
        let now = self.clock.now_ms();
        self.current_wpm = self.keystrokes.count_within(now, WPM_WINDOW_MS) as u32;

        let inputs = ScoreInputs {
            elapsed_secs: self.elapsed_secs,
            now_ms: now,
            last_activity_ms: self.last_activity_ms,
            wpm: self.current_wpm,
            keystrokes: &self.keystrokes,
        };
        self.breakdown = evaluate(&inputs, &mut self.jitter);
        self.fatigue_score = self.breakdown.score();

        if self.policy.reading_due(self.elapsed_secs) {
            events.push(SessionEvent::ReadingDue(self.reading()));
        }
        if self.policy.should_break(self.fatigue_score) {
            events.extend(self.trigger_break());
        }
        events
    }

    pub fn trigger_break(&mut self) -> Option<SessionEvent> {
        if self.state != SessionState::Monitoring {
            return None;
        }
        self.state = SessionState::OnBreak;
        self.break_secs_remaining = self.policy.break_len();
        self.break_count += 1;
        Some(SessionEvent::BreakStarted {
            score: self.fatigue_score,
        })
    }

    /// One second of break time. Resumes monitoring when the countdown runs out.
    pub fn countdown(&mut self) -> Option<SessionEvent> {
        if self.state != SessionState::OnBreak {
            return None;
        }
        self.break_secs_remaining = self.break_secs_remaining.saturating_sub(1);
        if self.break_secs_remaining > 0 {
            return None;
        }
        self.state = SessionState::Monitoring;
        self.break_secs_remaining = self.policy.break_len();
        self.last_activity_ms = self.clock.now_ms();
        Some(SessionEvent::BreakCompleted)
    }

    /// Back to idle with counters kept. A running break is abandoned.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if self.state == SessionState::Idle {
            return None;
        }
        self.state = SessionState::Idle;
        self.break_secs_remaining = self.policy.break_len();
        Some(self.summary())
    }

    pub fn reset(&mut self) -> Option<SessionSummary> {
        let summary = self.stop();
        self.elapsed_secs = 0;
        self.keystrokes.clear();
        self.last_activity_ms = 0;
        self.current_wpm = 0;
        self.fatigue_score = 0;
        self.breakdown = ScoreBreakdown::default();
        self.total_keystrokes = 0;
        self.break_count = 0;
        summary
    }

    pub fn reading(&self) -> Reading {
        Reading {
            fatigue_score: self.fatigue_score,
            wpm: self.current_wpm,
            keystroke_count: self.total_keystrokes,
            elapsed_secs: self.elapsed_secs,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            final_score: self.fatigue_score,
            total_keystrokes: self.total_keystrokes,
            elapsed_secs: self.elapsed_secs,
            break_count: self.break_count,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            elapsed_secs: self.elapsed_secs,
            current_wpm: self.current_wpm,
            fatigue_score: self.fatigue_score,
            break_secs_remaining: self.break_secs_remaining,
            total_keystrokes: self.total_keystrokes,
            break_count: self.break_count,
            retained_keystrokes: self.keystrokes.len(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == SessionState::Monitoring
    }

    pub fn is_on_break(&self) -> bool {
        self.state == SessionState::OnBreak
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn keystrokes(&self) -> &KeystrokeLog {
        &self.keystrokes
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    pub fn current_wpm(&self) -> u32 {
        self.current_wpm
    }

    pub fn fatigue_score(&self) -> u8 {
        self.fatigue_score
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn break_secs_remaining(&self) -> u32 {
        self.break_secs_remaining
    }

    pub fn total_keystrokes(&self) -> u64 {
        self.total_keystrokes
    }

    pub fn break_count(&self) -> u32 {
        self.break_count
    }

    pub fn policy(&self) -> &BreakPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
