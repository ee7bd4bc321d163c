use std::time::{Duration, Instant};

/// How long a notification stays visible after it is shown.
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(4);

/// Visual category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// A transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

/// Single-slot notification display. A new notification replaces the
/// current one and restarts its hide deadline; nothing is queued.
#[derive(Debug, Clone)]
pub struct NotificationSlot {
    current: Option<Notification>,
    duration: Duration,
}

impl NotificationSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) {
        self.current = Some(Notification {
            message: message.into(),
            kind,
            shown_at: now,
        });
    }

    /// The notification still visible at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.shown_at) < self.duration)
    }

    /// Drop an expired notification. Returns true if one was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        if self.current.is_some() && self.visible(now).is_none() {
            self.current = None;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for NotificationSlot {
    fn default() -> Self {
        Self::new(NOTIFICATION_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_after_duration() {
        let t0 = Instant::now();
        let mut slot = NotificationSlot::default();
        slot.push("hello", NotificationKind::Info, t0);
        assert!(slot.visible(t0 + Duration::from_millis(3999)).is_some());
        assert!(slot.visible(t0 + Duration::from_secs(4)).is_none());
    }

    #[test]
    fn second_push_replaces_and_restarts_deadline() {
        let t0 = Instant::now();
        let mut slot = NotificationSlot::default();
        slot.push("first", NotificationKind::Info, t0);
        let t1 = t0 + Duration::from_secs(2);
        slot.push("second", NotificationKind::Warning, t1);

        let at_first_deadline = t0 + Duration::from_secs(4) + Duration::from_millis(1);
        let shown = slot.visible(at_first_deadline).unwrap();
        assert_eq!(shown.message, "second");
        assert_eq!(shown.kind, NotificationKind::Warning);

        assert!(slot.visible(t1 + Duration::from_secs(4)).is_none());
    }

    #[test]
    fn prune_only_reports_expired() {
        let t0 = Instant::now();
        let mut slot = NotificationSlot::default();
        assert!(!slot.prune(t0));
        slot.push("x", NotificationKind::Error, t0);
        assert!(!slot.prune(t0 + Duration::from_secs(1)));
        assert!(slot.prune(t0 + Duration::from_secs(5)));
        assert!(slot.visible(t0).is_none());
    }
}
