use serde::{Deserialize, Serialize};

pub const DEFAULT_BREAK_THRESHOLD: u8 = 80;
pub const DEFAULT_BREAK_SECS: u32 = 20;
pub const DEFAULT_READING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_WARNING_THRESHOLD: u8 = 40;
pub const DEFAULT_CRITICAL_THRESHOLD: u8 = 70;

/// When a break is forced, how long it lasts and how often readings are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakPolicy {
    pub threshold: u8,
    pub break_secs: u32,
    pub reading_interval_secs: u64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BREAK_THRESHOLD,
            break_secs: DEFAULT_BREAK_SECS,
            reading_interval_secs: DEFAULT_READING_INTERVAL_SECS,
        }
    }
}

impl BreakPolicy {
    pub fn should_break(&self, score: u8) -> bool {
        score >= self.threshold
    }

    /// A zero break length would never count down, treat it as one second
    pub fn break_len(&self) -> u32 {
        self.break_secs.max(1)
    }

    pub fn reading_due(&self, elapsed_secs: u64) -> bool {
        self.reading_interval_secs > 0
            && elapsed_secs > 0
            && elapsed_secs % self.reading_interval_secs == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FatigueLevel {
    Low,
    Medium,
    High,
}

/// Score bands used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelBands {
    pub warning: u8,
    pub critical: u8,
}

impl Default for LevelBands {
    fn default() -> Self {
        Self {
            warning: DEFAULT_WARNING_THRESHOLD,
            critical: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

impl LevelBands {
    pub fn classify(&self, score: u8) -> FatigueLevel {
        if score < self.warning {
            FatigueLevel::Low
        } else if score < self.critical {
            FatigueLevel::Medium
        } else {
            FatigueLevel::High
        }
    }
}
