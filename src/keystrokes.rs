use itertools::Itertools;
use std::collections::VecDeque;

/// Keystrokes older than this are dropped on every insert
pub const RETENTION_MS: u64 = 5 * 60 * 1000;
/// Trailing window used for the typing-rate proxy
pub const WPM_WINDOW_MS: u64 = 60 * 1000;

/// Chronological log of keystroke timestamps bounded to a retention window.
///
/// Timestamps come from a monotonic clock so the deque stays sorted and pruning
/// only ever pops from the front.
#[derive(Debug, Clone)]
pub struct KeystrokeLog {
    stamps: VecDeque<u64>,
    retention_ms: u64,
}

impl KeystrokeLog {
    pub fn new() -> Self {
        Self::with_retention(RETENTION_MS)
    }

    pub fn with_retention(retention_ms: u64) -> Self {
        Self {
            stamps: VecDeque::new(),
            retention_ms,
        }
    }

    /// Append a keystroke and drop everything that fell out of the retention window
    pub fn push(&mut self, now_ms: u64) {
        self.stamps.push_back(now_ms);
        self.prune(now_ms);
    }

    pub fn prune(&mut self, now_ms: u64) {
        while let Some(&oldest) = self.stamps.front() {
            if now_ms.saturating_sub(oldest) < self.retention_ms {
                break;
            }
            self.stamps.pop_front();
        }
    }

    /// Number of keystrokes strictly younger than `window_ms` at `now_ms`
    pub fn count_within(&self, now_ms: u64, window_ms: u64) -> usize {
        self.stamps
            .iter()
            .rev()
            .take_while(|&&t| now_ms.saturating_sub(t) < window_ms)
            .count()
    }

    /// Inter-arrival gaps in milliseconds between consecutive keystrokes
    pub fn gaps(&self) -> Vec<f64> {
        self.stamps
            .iter()
            .tuple_windows()
            .map(|(a, b)| b.saturating_sub(*a) as f64)
            .collect()
    }

    pub fn oldest(&self) -> Option<u64> {
        self.stamps.front().copied()
    }

    pub fn newest(&self) -> Option<u64> {
        self.stamps.back().copied()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &u64> {
        self.stamps.iter()
    }
}

impl Default for KeystrokeLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_prunes_entries_outside_retention() {
        let mut log = KeystrokeLog::new();
        log.push(0);
        log.push(1_000);
        log.push(200_000);
        assert_eq!(log.len(), 3);

        // 300_000 is exactly five minutes after the first keystroke
        log.push(300_000);
        assert_eq!(log.oldest(), Some(1_000));

        log.push(301_000);
        assert_eq!(log.oldest(), Some(200_000));
        assert!(log.iter().all(|&t| 301_000 - t < RETENTION_MS));
    }

    #[test]
    fn count_within_straddles_window_boundary() {
        let mut log = KeystrokeLog::new();
        for t in [10_000, 39_999, 40_000, 40_001, 99_000] {
            log.push(t);
        }
        // at 100_000 the window covers (40_000, 100_000]
        assert_eq!(log.count_within(100_000, WPM_WINDOW_MS), 2);
        assert_eq!(log.count_within(99_999, WPM_WINDOW_MS), 3);
        assert_eq!(log.count_within(160_000, WPM_WINDOW_MS), 0);
    }

    #[test]
    fn gaps_are_consecutive_differences() {
        let mut log = KeystrokeLog::new();
        assert!(log.gaps().is_empty());
        log.push(100);
        assert!(log.gaps().is_empty());
        log.push(250);
        log.push(300);
        assert_eq!(log.gaps(), vec![150.0, 50.0]);
    }

    #[test]
    fn clear_empties_log() {
        let mut log = KeystrokeLog::with_retention(10);
        log.push(1);
        log.push(2);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.newest(), None);
    }
}
