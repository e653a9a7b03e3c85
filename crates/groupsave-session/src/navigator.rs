//! Host navigation seam.

use crate::state::SessionNotice;

/// Lets the session manager send the user back to sign-in.
///
/// Implementations must be cheap and non-blocking; they are called while
/// teardown is in progress.
pub trait Navigator: Send + Sync {
    /// Discard the navigation history and show the sign-in screen.
    fn reset_to_sign_in(&self);

    /// Show a one-shot notice before the reset.
    fn show_notice(&self, _notice: SessionNotice) {}
}
