use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::backend::{Notification, Notifier};

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone)]
struct Toast {
    notification: Notification,
    expires_at: Instant,
}

/// Short-lived messages shown over the monitor screen
#[derive(Debug, Clone)]
pub struct Toasts {
    items: VecDeque<Toast>,
    default_ttl: Duration,
    capacity: usize,
}

impl Toasts {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TOAST_TTL)
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            default_ttl,
            capacity: MAX_TOASTS,
        }
    }

    /// Drop everything that has outlived its duration
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|toast| toast.expires_at > now);
    }

    /// Oldest first
    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().map(|toast| &toast.notification)
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.back().map(|toast| &toast.notification)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for Toasts {
    fn notify(&mut self, notification: Notification) {
        log::info!("{}: {}", notification.title, notification.message);
        let ttl = notification.duration.unwrap_or(self.default_ttl);
        self.items.push_back(Toast {
            notification,
            expires_at: Instant::now() + ttl,
        });
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_few() {
        let mut toasts = Toasts::new();
        for i in 0..5 {
            toasts.notify(Notification::new(format!("t{i}"), "m"));
        }
        let titles: Vec<_> = toasts.visible().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["t2", "t3", "t4"]);
        assert_eq!(toasts.latest().unwrap().title, "t4");
    }

    #[test]
    fn toasts_expire_by_their_own_duration() {
        let mut toasts = Toasts::with_ttl(Duration::from_secs(1));
        toasts.notify(Notification::new("short", "gone soon"));
        toasts.notify(Notification::new("long", "sticks").lasting(Duration::from_secs(60)));

        toasts.expire(Instant::now() + Duration::from_secs(5));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.latest().unwrap().title, "long");

        toasts.expire(Instant::now() + Duration::from_secs(120));
        assert!(toasts.is_empty());
    }
}
