//! Session states and the events emitted on transitions.

use std::fmt;

/// Where the session stands.
///
/// `Unknown` only exists before the first check. `Expired` is transient: it
/// is always followed by `Unauthenticated` once teardown finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet checked against storage.
    Unknown,
    /// A token is stored. `expires_at` is epoch milliseconds, absent when the
    /// server did not say how long the token lives.
    Authenticated { expires_at: Option<i64> },
    /// The token is no longer valid and teardown is in progress.
    Expired,
    /// No session.
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    /// The session can no longer come back without a fresh sign-in.
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionState::Expired | SessionState::Unauthenticated)
    }

    pub fn expires_at(&self) -> Option<i64> {
        match self {
            SessionState::Authenticated { expires_at } => *expires_at,
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unknown => write!(f, "unknown"),
            SessionState::Authenticated { .. } => write!(f, "authenticated"),
            SessionState::Expired => write!(f, "expired"),
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// What noticed that the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCause {
    /// The precise timer set at sign-in fired.
    Timer,
    /// The periodic safety-net check caught it.
    Poll,
    /// An explicit check found the stored expiry in the past.
    Check,
    /// The host returned to the foreground after the expiry passed.
    Foreground,
    /// The server answered 401.
    Rejected,
}

impl ExpiryCause {
    /// The notice to show the user for this cause.
    pub fn notice(self) -> SessionNotice {
        match self {
            ExpiryCause::Rejected => SessionNotice::Rejected,
            _ => SessionNotice::Expired,
        }
    }
}

impl fmt::Display for ExpiryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpiryCause::Timer => "timer",
            ExpiryCause::Poll => "poll",
            ExpiryCause::Check => "check",
            ExpiryCause::Foreground => "foreground",
            ExpiryCause::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One-shot message shown alongside the redirect to sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    Expired,
    Rejected,
}

impl SessionNotice {
    pub fn title(&self) -> &'static str {
        match self {
            SessionNotice::Expired => "Session Expired",
            SessionNotice::Rejected => "Signed Out",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::Expired => "Your session has expired, please sign in again",
            SessionNotice::Rejected => {
                "The server no longer accepts your session, please sign in again"
            }
        }
    }
}

/// Broadcast on every session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established from a login response.
    SignedIn { expires_at: Option<i64> },
    /// The session expired or was rejected; teardown follows.
    Expired { cause: ExpiryCause },
    /// Teardown finished. `notice` is what the user was shown, if anything.
    SignedOut { notice: Option<SessionNotice> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_notice_text() {
        assert_eq!(
            SessionNotice::Expired.message(),
            "Your session has expired, please sign in again"
        );
        assert_eq!(ExpiryCause::Poll.notice(), SessionNotice::Expired);
        assert_eq!(ExpiryCause::Rejected.notice(), SessionNotice::Rejected);
    }
}
