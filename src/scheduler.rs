use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Which of the two session timers a tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Monitor,
    Break,
}

/// Identifies one armed timer. A fresh generation is issued every time a timer
/// is armed so ticks still queued from a cancelled timer can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTag {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Repeating callback on a background thread.
///
/// Dropping the task cancels it and joins the thread, so nothing keeps firing
/// after its owner is gone.
#[derive(Debug)]
pub struct PeriodicTask {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Run `on_tick` every `interval` until cancelled or until it returns false
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match cancelled.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !on_tick() {
                        break;
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            cancel: Some(cancel),
            handle: Some(handle),
        }
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // dropping the sender wakes the worker immediately
        drop(self.cancel.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("periodic task panicked");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Holds at most one armed timer and hands out tags for its ticks
#[derive(Debug)]
pub struct TimerSlot {
    interval: Duration,
    generation: u64,
    active: Option<(TimerTag, PeriodicTask)>,
}

impl TimerSlot {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            active: None,
        }
    }

    /// Replace whatever is armed with a new timer that reports through `emit`
    pub fn arm<F>(&mut self, kind: TimerKind, emit: F) -> TimerTag
    where
        F: Fn(TimerTag) -> bool + Send + 'static,
    {
        self.disarm();
        self.generation += 1;
        let tag = TimerTag {
            kind,
            generation: self.generation,
        };
        let task = PeriodicTask::spawn(self.interval, move || emit(tag));
        log::debug!("armed {:?} timer (generation {})", kind, tag.generation);
        self.active = Some((tag, task));
        tag
    }

    pub fn disarm(&mut self) {
        if let Some((tag, task)) = self.active.take() {
            log::debug!("disarmed {:?} timer (generation {})", tag.kind, tag.generation);
            task.cancel();
        }
    }

    pub fn active(&self) -> Option<TimerTag> {
        self.active.as_ref().map(|(tag, _)| *tag)
    }

    pub fn is_current(&self, tag: TimerTag) -> bool {
        self.active() == Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::TryRecvError;

    #[test]
    fn task_ticks_until_dropped() {
        let (tx, rx) = mpsc::channel();
        let task = PeriodicTask::spawn(Duration::from_millis(2), move || tx.send(()).is_ok());

        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }
        drop(task);

        // the worker is joined, so its sender is gone once the backlog drains
        while rx.try_recv().is_ok() {}
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn task_stops_when_callback_declines() {
        let (tx, rx) = mpsc::channel();
        let mut remaining = 2;
        let task = PeriodicTask::spawn(Duration::from_millis(1), move || {
            remaining -= 1;
            let _ = tx.send(());
            remaining > 0
        });

        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
        drop(task);
    }

    #[test]
    fn cancel_returns_promptly_on_long_interval() {
        let task = PeriodicTask::spawn(Duration::from_secs(3600), || true);
        let started = std::time::Instant::now();
        task.cancel();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn slot_issues_fresh_tags_and_drops_old_timer() {
        let (tx, rx) = mpsc::channel::<TimerTag>();
        let mut slot = TimerSlot::new(Duration::from_millis(2));

        let tx_monitor = tx.clone();
        let first = slot.arm(TimerKind::Monitor, move |tag| tx_monitor.send(tag).is_ok());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), first);

        let second = slot.arm(TimerKind::Break, move |tag| tx.send(tag).is_ok());
        assert_ne!(first, second);
        assert!(!slot.is_current(first));
        assert!(slot.is_current(second));

        // skip anything the first timer queued before it was cancelled
        let tick = loop {
            let tag = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if tag != first {
                break tag;
            }
        };
        assert_eq!(tick, second);

        slot.disarm();
        assert_eq!(slot.active(), None);
        while rx.try_recv().is_ok() {}
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }
}
