//! Terminal stand-in for the app's navigation stack.

use console::Style;
use groupsave_session::{Navigator, SessionNotice};

/// Prints the sign-in redirect to stderr.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn reset_to_sign_in(&self) {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to("Signed out. Run 'groupsave login' to sign in again.")
        );
    }

    fn show_notice(&self, notice: SessionNotice) {
        let yellow = Style::new().yellow().bold();
        eprintln!();
        eprintln!("{} {}", yellow.apply_to(notice.title()), notice.message());
    }
}
