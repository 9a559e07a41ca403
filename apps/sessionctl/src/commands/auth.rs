//! Authentication commands.

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use serde::Serialize;
use session_lifecycle::{Session, SessionController};
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionReport {
    #[serde(flatten)]
    session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleaned_url: Option<String>,
}

fn print_report(report: &SessionReport, format: &OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Text => {
            output::print_heading("Session");
            match report.session.user() {
                Some(user) => {
                    output::print_row("Status", "Logged in");
                    output::print_row("User", &user.username);
                    output::print_row("Display name", user.display_label());
                }
                None => output::print_row("Status", "Not logged in"),
            }
            if let Some(url) = &report.cleaned_url {
                output::print_row("Cleaned URL", url);
            }
        }
    }
}

async fn determine(controller: &SessionController, current_url: Option<&Url>) -> Result<SessionReport> {
    let started = controller.start(current_url)?;
    let session = controller.settled().await?;
    started.disposer.dispose();

    Ok(SessionReport {
        session,
        cleaned_url: started.cleaned_url.map(String::from),
    })
}

/// Check authentication status with the stored credential.
pub async fn status(controller: &SessionController, format: &OutputFormat) -> Result<()> {
    let report = determine(controller, None).await?;
    print_report(&report, format);
    Ok(())
}

/// Complete a login from the backend's return URL.
pub async fn resume(controller: &SessionController, url: &str, format: &OutputFormat) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("invalid return URL: {}", url))?;
    let report = determine(controller, Some(&url)).await?;
    print_report(&report, format);
    Ok(())
}

/// Open the login page in the browser.
pub fn login(controller: &SessionController, format: &OutputFormat) -> Result<()> {
    controller.login()?;
    output::print_success(
        "Opened the login page in your browser. Run `sessionctl resume <url>` with the address you land on.",
        format,
    );
    Ok(())
}

/// Logout and clear the stored credential.
pub async fn logout(controller: &SessionController, format: &OutputFormat) -> Result<()> {
    controller.logout().await?;
    output::print_success("Logged out", format);
    Ok(())
}
