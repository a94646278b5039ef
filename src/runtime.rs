use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::scheduler::TimerTag;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    Key(KeyEvent),
    Resize,
    /// A session timer fired
    Timer(TimerTag),
    /// Nothing arrived within the refresh interval
    Refresh,
}

/// Source of terminal and timer events
pub trait MonitorEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<MonitorEvent, RecvTimeoutError>;

    /// Sender timers use to feed ticks into the same queue as key presses
    fn sender(&self) -> Sender<MonitorEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<MonitorEvent>,
    rx: Receiver<MonitorEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key release/repeat reports would double count keystrokes
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    input_tx.send(MonitorEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => input_tx.send(MonitorEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    log::error!("terminal input failed: {e}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<MonitorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<MonitorEvent> {
        self.tx.clone()
    }
}

/// Channel-backed event source for tests
pub struct TestEventSource {
    tx: Sender<MonitorEvent>,
    rx: Receiver<MonitorEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<MonitorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<MonitorEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: MonitorEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: MonitorEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the refresh interval and returns the next event, or Refresh on timeout
    pub fn step(&self) -> MonitorEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                MonitorEvent::Refresh
            }
        }
    }

    pub fn sender(&self) -> Sender<MonitorEvent> {
        self.event_source.sender()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerKind;

    #[test]
    fn step_returns_refresh_on_timeout() {
        let runner = Runner::new(
            TestEventSource::new(),
            FixedTicker::new(Duration::from_millis(1)),
        );

        match runner.step() {
            MonitorEvent::Refresh => {}
            other => panic!("expected Refresh on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_timer_ticks() {
        let runner = Runner::new(
            TestEventSource::new(),
            FixedTicker::new(Duration::from_millis(10)),
        );
        let tag = TimerTag {
            kind: TimerKind::Break,
            generation: 3,
        };
        runner.sender().send(MonitorEvent::Timer(tag)).unwrap();
        runner.sender().send(MonitorEvent::Resize).unwrap();

        match runner.step() {
            MonitorEvent::Timer(t) => assert_eq!(t, tag),
            other => panic!("expected Timer event, got {other:?}"),
        }
        assert!(matches!(runner.step(), MonitorEvent::Resize));
    }
}
