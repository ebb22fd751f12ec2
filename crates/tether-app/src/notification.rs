//! Transient user-facing notices.

use std::{
    fmt,
    time::{Duration, Instant},
};

/// How long a notification stays up unless told otherwise.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Something failed.
    Error,
    /// Something completed.
    Success,
    /// Neutral status.
    Info,
    /// Degraded but working.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
        })
    }
}

/// A notice that dismisses itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: Level,
    /// Text shown to the user.
    pub text: String,
    /// When it disappears.
    pub expires_at: Instant,
}

/// Active notifications in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    items: Vec<Notification>,
}

impl Notifications {
    /// Add a notice that expires [`DEFAULT_DISMISS_AFTER`] from `now`.
    pub fn push(&mut self, level: Level, text: impl Into<String>, now: Instant) {
        self.push_for(level, text, now, DEFAULT_DISMISS_AFTER);
    }

    /// Add a notice with an explicit lifetime.
    pub fn push_for(
        &mut self,
        level: Level,
        text: impl Into<String>,
        now: Instant,
        lifetime: Duration,
    ) {
        let text = text.into();
        tracing::debug!(%level, %text, "notification");
        self.items.push(Notification { level, text, expires_at: now + lifetime });
    }

    /// Drop expired notices. Returns how many were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        self.items.retain(|n| n.expires_at > now);
        before - self.items.len()
    }

    /// Notices still visible at `now`.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter(move |n| n.expires_at > now)
    }

    /// Earliest expiry, if any.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.items.iter().map(|n| n.expires_at).min()
    }

    /// Number of stored notices, expired or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_expire_after_default_lifetime() {
        let start = Instant::now();
        let mut notices = Notifications::default();
        notices.push(Level::Info, "hello", start);
        notices.push_for(Level::Error, "longer", start, Duration::from_secs(10));

        assert_eq!(notices.visible(start + Duration::from_secs(4)).count(), 2);
        assert_eq!(notices.next_expiry(), Some(start + DEFAULT_DISMISS_AFTER));

        let later = start + Duration::from_secs(5);
        assert_eq!(notices.visible(later).count(), 1);
        assert_eq!(notices.prune(later), 1);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.visible(later).next().unwrap().level, Level::Error);
    }
}
