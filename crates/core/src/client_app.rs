//! User-Agent sniffing for the client application.
//!
//! Coarse: it only picks which catalog to send a visitor
//! to. Version-level compatibility checks happen downstream with the raw
//! User-Agent.

use crate::config::AllowListConfiguration;

const ANDROID: &str = "android";

/// Pick a client application for a User-Agent.
///
/// Any Android browser maps to `android` (when that app is configured), so
/// mobile visitors land on the mobile catalog. Everything else, including a
/// missing header, gets the configured default.
pub fn client_app_from_user_agent<'a>(
    user_agent: Option<&str>,
    config: &'a AllowListConfiguration,
) -> &'a str {
    let is_android = user_agent.is_some_and(|ua| ua.to_ascii_lowercase().contains(ANDROID));

    if is_android {
        if let Some(app) = config
            .valid_client_applications
            .iter()
            .find(|app| app.as_str() == ANDROID)
        {
            return app;
        }
    }
    &config.default_client_app
}
