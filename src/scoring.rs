//! Fatigue heuristic.
//!
//! The score is a weighted sum of four independently capped proxies (time on
//! task, idle time, rhythm irregularity, speed decay) plus a bounded jitter so
//! the displayed value never looks frozen. It is a pressure indicator for the
//! break policy, not a measurement.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::keystrokes::KeystrokeLog;
use crate::util::{mean, std_dev};

pub const SESSION_CAP: f64 = 30.0;
pub const INACTIVITY_CAP: f64 = 25.0;
pub const INCONSISTENCY_CAP: f64 = 20.0;
pub const SPEED_CAP: f64 = 15.0;
pub const JITTER_MAX: f64 = 10.0;

const SESSION_WEIGHT: f64 = 1.5;
const INACTIVITY_WEIGHT: f64 = 8.0;
const IDLE_UNIT_SECS: f64 = 30.0;
const MAX_IDLE_UNITS: f64 = 5.0;
const BASELINE_WPM: f64 = 80.0;
const MIN_SAMPLES_FOR_MEAN: usize = 2;
const MIN_SAMPLES_FOR_INCONSISTENCY: usize = 6;

/// Source of the bounded random term
pub trait Jitter {
    /// A value in `[0, upper)`
    fn sample(&mut self, upper: f64) -> f64;
}

impl<J: Jitter + ?Sized> Jitter for Box<J> {
    fn sample(&mut self, upper: f64) -> f64 {
        (**self).sample(upper)
    }
}

#[derive(Debug, Clone)]
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Jitter for RandomJitter {
    fn sample(&mut self, upper: f64) -> f64 {
        if upper <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..upper)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self, _upper: f64) -> f64 {
        0.0
    }
}

/// Always returns the same value, clamped into range
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&mut self, upper: f64) -> f64 {
        self.0.clamp(0.0, upper.max(0.0))
    }
}

/// Everything the heuristic looks at for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub elapsed_secs: u64,
    pub now_ms: u64,
    pub last_activity_ms: u64,
    pub wpm: u32,
    pub keystrokes: &'a KeystrokeLog,
}

/// Per-factor contributions of a computed score, already capped
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub session: f64,
    pub inactivity: f64,
    pub inconsistency: f64,
    pub speed: f64,
    pub jitter: f64,
    pub mean_gap_ms: f64,
    pub idle_secs: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.session + self.inactivity + self.inconsistency + self.speed + self.jitter
    }

    pub fn score(&self) -> u8 {
        self.total().round().clamp(0.0, 100.0) as u8
    }
}

pub fn session_contribution(elapsed_secs: u64) -> f64 {
    let minutes = elapsed_secs as f64 / 60.0;
    (minutes * SESSION_WEIGHT).min(SESSION_CAP)
}

pub fn inactivity_factor(idle_secs: f64) -> f64 {
    (idle_secs / IDLE_UNIT_SECS).clamp(0.0, MAX_IDLE_UNITS)
}

pub fn inactivity_contribution(idle_secs: f64) -> f64 {
    (inactivity_factor(idle_secs) * INACTIVITY_WEIGHT).min(INACTIVITY_CAP)
}

pub fn speed_contribution(wpm: u32) -> f64 {
    ((BASELINE_WPM - wpm as f64).max(0.0) / 2.0).min(SPEED_CAP)
}

/// Mean gap and capped irregularity for a keystroke log
pub fn rhythm(keystrokes: &KeystrokeLog) -> (f64, f64) {
    let samples = keystrokes.len();
    if samples < MIN_SAMPLES_FOR_MEAN {
        return (0.0, 0.0);
    }
    let gaps = keystrokes.gaps();
    let mean_gap = mean(&gaps).unwrap_or(0.0);
    let inconsistency = if samples < MIN_SAMPLES_FOR_INCONSISTENCY {
        0.0
    } else {
        std_dev(&gaps).unwrap_or(0.0) / 100.0
    };
    (mean_gap, inconsistency.min(INCONSISTENCY_CAP))
}

pub fn evaluate<J: Jitter + ?Sized>(inputs: &ScoreInputs<'_>, jitter: &mut J) -> ScoreBreakdown {
    let idle_secs = inputs.now_ms.saturating_sub(inputs.last_activity_ms) as f64 / 1000.0;
    let (mean_gap_ms, inconsistency) = rhythm(inputs.keystrokes);

    ScoreBreakdown {
        session: session_contribution(inputs.elapsed_secs),
        inactivity: inactivity_contribution(idle_secs),
        inconsistency,
        speed: speed_contribution(inputs.wpm),
        jitter: jitter.sample(JITTER_MAX).clamp(0.0, JITTER_MAX),
        mean_gap_ms,
        idle_secs,
    }
}
