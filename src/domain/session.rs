//! Livestream session record and lifecycle rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SessionId, UserId};

/// Lifecycle status of a livestream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not yet started.
    Scheduled,
    /// Currently broadcasting; the only status in which the viewer count
    /// may change.
    Live,
    /// Finished; viewer count has been reset to zero.
    Ended,
}

impl SessionStatus {
    /// Returns the status as a lowercase string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Ended => "ended",
        }
    }
}

/// A livestream session as stored by the gateway.
///
/// The viewer count is mutated exclusively through atomic store deltas
/// while the session is [`SessionStatus::Live`]; stopping the stream
/// resets it to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivestreamSession {
    /// Session identifier (matches the platform's content record).
    pub id: SessionId,
    /// Artist hosting the stream.
    pub artist_id: UserId,
    /// Human-readable stream title.
    pub title: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Number of viewers currently joined.
    pub viewer_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the stream went live, if it has.
    pub started_at: Option<DateTime<Utc>>,
    /// When the stream ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,
}

impl LivestreamSession {
    /// Creates a new scheduled session.
    #[must_use]
    pub fn new(id: SessionId, artist_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id,
            artist_id,
            title: title.into(),
            status: SessionStatus::Scheduled,
            viewer_count: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Returns `true` if the session is currently broadcasting.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.status, SessionStatus::Live)
    }

    /// Returns `true` if the transition to `next` is allowed.
    ///
    /// Scheduled → Live and Live → Ended are the only legal moves.
    #[must_use]
    pub const fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self.status, next),
            (SessionStatus::Scheduled, SessionStatus::Live)
                | (SessionStatus::Live, SessionStatus::Ended)
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_session() -> LivestreamSession {
        LivestreamSession::new(SessionId::new(), UserId::new(), "album listening party")
    }

    #[test]
    fn new_session_is_scheduled_with_zero_viewers() {
        let session = make_session();
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.viewer_count, 0);
        assert!(!session.is_live());
    }

    #[test]
    fn only_forward_transitions_allowed() {
        let mut session = make_session();
        assert!(session.can_transition_to(SessionStatus::Live));
        assert!(!session.can_transition_to(SessionStatus::Ended));

        session.status = SessionStatus::Live;
        assert!(session.can_transition_to(SessionStatus::Ended));
        assert!(!session.can_transition_to(SessionStatus::Scheduled));

        session.status = SessionStatus::Ended;
        assert!(!session.can_transition_to(SessionStatus::Live));
    }

    #[test]
    fn status_strings_are_lowercase() {
        assert_eq!(SessionStatus::Scheduled.as_str(), "scheduled");
        assert_eq!(SessionStatus::Live.as_str(), "live");
        assert_eq!(SessionStatus::Ended.as_str(), "ended");
    }
}
