//! Side-effect sinks supplied by the embedding application.

use crate::session::UserProfile;
use crate::SessionResult;
use url::Url;

/// Receives the one-per-session welcome notice.
pub trait WelcomeNotifier: Send + Sync {
    fn welcome(&self, user: &UserProfile);
}

/// Performs full-page navigation away from the current process.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> SessionResult<()>;
}

/// Welcome message shown to a freshly authenticated user.
pub fn welcome_message(user: &UserProfile) -> String {
    format!("Welcome, {}!", user.display_label())
}
