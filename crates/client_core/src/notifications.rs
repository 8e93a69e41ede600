use std::time::{Duration, Instant};

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub raised_at: Instant,
}

impl Notification {
    /// Service messages can span several lines (compiler output); each is rendered on its own.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.message.lines()
    }
}

/// Transient error surface. Notifications never queue: each one is visible from the moment it
/// is raised until it expires or is dismissed.
#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    active: Vec<Notification>,
    next_id: u64,
    raised_total: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: Vec::new(),
            next_id: 0,
            raised_total: 0,
        }
    }

    pub fn raise(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId(self.next_id);
        self.active.push(Notification {
            id,
            message: message.into(),
            raised_at: now,
        });
        self.raised_total += 1;
        id
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|notification| notification.id != id);
        self.active.len() != before
    }

    /// Drops notifications older than the TTL and returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        let ttl = self.ttl;
        self.active
            .retain(|notification| now.saturating_duration_since(notification.raised_at) < ttl);
        before - self.active.len()
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.last()
    }

    pub fn raised_total(&self) -> usize {
        self.raised_total
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
