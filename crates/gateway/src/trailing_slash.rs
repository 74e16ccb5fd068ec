//! Trailing-slash canonicalization for already-prefixed paths.
//!
//! Runs after prefix resolution has passed a request through. Exceptions are
//! configured as templated paths so one entry covers every lang and app:
//! `/$lang/about`, `/$lang/$clientApp/search`.

use prefixgate_core::{AllowListConfiguration, LocaleConfig};

const LANG_PLACEHOLDER: &str = "$lang";
const CLIENT_APP_PLACEHOLDER: &str = "$clientApp";

/// Replace the lang and client-app segments of `path` (no query string) with
/// their placeholders.
pub fn template_path(path: &str, allow_list: &AllowListConfiguration, locale: &LocaleConfig) -> String {
    let mut segments: Vec<&str> = path.strip_prefix('/').unwrap_or(path).split('/').collect();

    if locale.is_valid_lang(segments[0]) {
        segments[0] = LANG_PLACEHOLDER;
    }
    if segments.len() > 1 && allow_list.is_valid_client_app(segments[1]) {
        segments[1] = CLIENT_APP_PLACEHOLDER;
    } else if allow_list.is_valid_client_app(segments[0]) {
        // Locale-exception URLs carry the app first.
        segments[0] = CLIENT_APP_PLACEHOLDER;
    }

    format!("/{}", segments.join("/"))
}

/// Where to send a request whose path lacks its trailing slash, or `None`
/// when the path is fine as-is. The query string is carried over untouched.
pub fn trailing_slash_redirect(
    path_and_query: &str,
    allow_list: &AllowListConfiguration,
    locale: &LocaleConfig,
) -> Option<String> {
    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };

    let templated = template_path(path, allow_list, locale);
    if allow_list.is_valid_trailing_slash_url_exception(&templated) {
        tracing::debug!(path = %templated, "Not adding a trailing slash; exception found");
        return None;
    }
    if path.ends_with('/') {
        return None;
    }

    Some(match query {
        Some(query) => format!("{}/?{}", path, query),
        None => format!("{}/", path),
    })
}
