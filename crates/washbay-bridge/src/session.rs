//! Session lock between "identifier sent" and "verdict handled".

use std::time::Duration;
use tokio::time::Instant;
use washbay_core::Identifier;

/// An identifier awaiting the controller's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub identifier: Identifier,
    pub sent_at: Instant,
    pub deadline: Instant,
}

impl PendingSession {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Dispatcher lock state.
///
/// While `Locked`, no reader is polled and no identifier is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Locked(PendingSession),
}

impl SessionState {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, SessionState::Locked(_))
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        match self {
            SessionState::Locked(pending) => Some(pending),
            SessionState::Idle => None,
        }
    }

    /// Lock for `identifier`, sent at `now`, expiring after `response_timeout`.
    pub fn lock(&mut self, identifier: Identifier, now: Instant, response_timeout: Duration) {
        *self = SessionState::Locked(PendingSession {
            identifier,
            sent_at: now,
            deadline: now + response_timeout,
        });
    }

    /// Clear the lock, returning the session it guarded.
    pub fn take(&mut self) -> Option<PendingSession> {
        match std::mem::take(self) {
            SessionState::Locked(pending) => Some(pending),
            SessionState::Idle => None,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Relay ran for the full duration.
    Activated { relay: String, duration: Duration },
    /// Controller refused the identifier.
    Denied,
    /// Controller granted access with an unusable record.
    Malformed(String),
    /// Controller named a relay the bay does not have.
    UnknownRelay(String),
    /// Relay failed to switch.
    ActivationFailed { relay: String, message: String },
    /// No usable verdict before the deadline.
    TimedOut,
}

/// Running totals, reported at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub started: u64,
    pub activated: u64,
    pub denied: u64,
    pub malformed: u64,
    pub unknown_relay: u64,
    pub failed: u64,
    pub timed_out: u64,
}

impl SessionStats {
    pub fn record(&mut self, outcome: &SessionOutcome) {
        let counter = match outcome {
            SessionOutcome::Activated { .. } => &mut self.activated,
            SessionOutcome::Denied => &mut self.denied,
            SessionOutcome::Malformed(_) => &mut self.malformed,
            SessionOutcome::UnknownRelay(_) => &mut self.unknown_relay,
            SessionOutcome::ActivationFailed { .. } => &mut self.failed,
            SessionOutcome::TimedOut => &mut self.timed_out,
        };
        *counter += 1;
    }

    /// Sessions that ended, whatever the outcome.
    #[must_use]
    pub fn resolved(&self) -> u64 {
        self.activated + self.denied + self.malformed + self.unknown_relay + self.failed + self.timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lock_and_take() {
        let mut state = SessionState::default();
        assert!(!state.is_locked());
        assert_eq!(state.take(), None);

        let now = Instant::now();
        state.lock(Identifier::rfid("abc"), now, Duration::from_secs(7));
        assert!(state.is_locked());

        let pending = state.pending().unwrap();
        assert_eq!(pending.deadline - pending.sent_at, Duration::from_secs(7));
        assert!(!pending.is_expired(now + Duration::from_secs(6)));
        assert!(pending.is_expired(now + Duration::from_secs(7)));

        let taken = state.take().unwrap();
        assert_eq!(taken.identifier.value, "abc");
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = SessionStats::default();
        stats.record(&SessionOutcome::Denied);
        stats.record(&SessionOutcome::TimedOut);
        stats.record(&SessionOutcome::Activated {
            relay: "yikama".into(),
            duration: Duration::from_secs(30),
        });
        assert_eq!(stats.denied, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.activated, 1);
        assert_eq!(stats.resolved(), 3);
    }
}
