//! CLI command implementations.

mod auth;

pub use auth::{login, logout, resume, status};

use crate::output::{self, OutputFormat};
use anyhow::Result;
use credential_store::create_credential_store;
use session_config::{Config, Paths};
use session_lifecycle::{
    welcome_message, ControllerSettings, FetcherSettings, HttpStatusFetcher, Navigator,
    SessionController, SessionError, SessionResult, UserProfile, WelcomeNotifier,
};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Prints the welcome notice as a success line.
struct PrintNotifier {
    format: OutputFormat,
}

impl WelcomeNotifier for PrintNotifier {
    fn welcome(&self, user: &UserProfile) {
        output::print_success(&welcome_message(user), &self.format);
    }
}

/// Hands navigation to the desktop browser.
struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) -> SessionResult<()> {
        info!(url = %url, "Opening browser");
        open::that(url.as_str()).map_err(|e| SessionError::Navigation(e.to_string()))
    }
}

/// Wire a controller to the file-backed store and the HTTP fetcher.
pub fn build_controller(
    config: &Config,
    paths: &Paths,
    format: OutputFormat,
) -> Result<SessionController> {
    paths.ensure_dirs()?;

    let store = Arc::new(create_credential_store(
        paths.credentials_file(),
        paths.session_state_file(),
    ));
    let fetcher = Arc::new(HttpStatusFetcher::new(FetcherSettings::from_config(config)?)?);

    Ok(SessionController::new(
        ControllerSettings::from_config(config)?,
        store,
        fetcher,
        Arc::new(PrintNotifier { format }),
        Arc::new(BrowserNavigator),
    ))
}
