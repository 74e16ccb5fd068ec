//! `/{lang}/{clientApp}/` prefix resolution.
//!
//! Every request path is normalized once, before routing, so it carries a
//! valid lang and client application (or an allow-listed exception in their
//! place). Resolution is a pure function of the path, two headers and the
//! configuration; the HTTP side lives in [`crate::middleware`].
//!
//! The decision is made in two passes, each an ordered rule table where the
//! first matching predicate wins:
//!
//! 1. [`LangRule`] decides what happens to the first segment.
//! 2. [`AppRule`] decides what happens to the second, including the
//!    exception gate that hands unknown exception paths back upstream.

use prefixgate_core::{
    client_app_from_user_agent, AllowListConfiguration, LangSource, LanguageResolution, LocaleConfig,
};

/// `Cache-Control: max-age` for permanent prefix redirects.
pub const ONE_YEAR_IN_SECONDS: u64 = 31_536_000;

/// Request signals the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct PrefixRequest<'a> {
    /// Path with leading slash and optional `?query`.
    pub path: &'a str,
    pub accept_language: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

impl<'a> PrefixRequest<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            accept_language: None,
            user_agent: None,
        }
    }

    pub fn with_accept_language(mut self, value: &'a str) -> Self {
        self.accept_language = Some(value);
        self
    }

    pub fn with_user_agent(mut self, value: &'a str) -> Self {
        self.user_agent = Some(value);
        self
    }
}

/// Request headers a response must `Vary` on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vary {
    pub accept_language: bool,
    pub user_agent: bool,
}

impl Vary {
    pub fn is_empty(&self) -> bool {
        !self.accept_language && !self.user_agent
    }

    pub fn header_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.accept_language {
            names.push("accept-language");
        }
        if self.user_agent {
            names.push("user-agent");
        }
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// 301: derived from the URL alone, safe to cache for a long time.
    Permanent,
    /// 302: depends on request headers, or replaced a leading segment we
    /// did not recognize (possibly a locale that is disabled for now).
    Temporary,
}

impl RedirectKind {
    pub fn status_code(self) -> u16 {
        match self {
            RedirectKind::Permanent => 301,
            RedirectKind::Temporary => 302,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The path is canonical; hand these values to downstream handlers.
    Passthrough {
        lang: String,
        client_app: String,
        vary: Vary,
    },
    Redirect {
        kind: RedirectKind,
        location: String,
        vary: Vary,
    },
    /// A recognized exception this server does not render. Upstream is
    /// expected to serve it instead.
    NotFound,
}

impl Resolution {
    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Resolution::Passthrough { .. } => "passthrough",
            Resolution::Redirect { .. } => "redirect",
            Resolution::NotFound => "not_found",
        }
    }
}

/// Resolves prefixes against one immutable configuration.
#[derive(Debug, Clone)]
pub struct PathPrefixResolver {
    allow_list: AllowListConfiguration,
    locale: LocaleConfig,
}

impl PathPrefixResolver {
    pub fn new(allow_list: AllowListConfiguration, locale: LocaleConfig) -> Self {
        Self { allow_list, locale }
    }

    pub fn allow_list(&self) -> &AllowListConfiguration {
        &self.allow_list
    }

    pub fn locale(&self) -> &LocaleConfig {
        &self.locale
    }

    pub fn resolve(&self, request: &PrefixRequest<'_>) -> Resolution {
        resolve_prefix(request, &self.allow_list, &self.locale)
    }

    /// See [`crate::trailing_slash::trailing_slash_redirect`].
    pub fn trailing_slash_redirect(&self, path: &str) -> Option<String> {
        crate::trailing_slash::trailing_slash_redirect(path, &self.allow_list, &self.locale)
    }
}

// =============================================================================
// Rule tables
// =============================================================================

/// Facts about the original path, computed once up front.
#[derive(Debug)]
struct Signals<'a> {
    seg0: &'a str,
    /// seg0 is a lang in canonical form.
    valid_lang: bool,
    /// seg0 named a supported lang, possibly in the wrong case or as an alias.
    lang_from_url: bool,
    /// seg0 differs from the resolved lang.
    lang_changed: bool,
    seg0_is_app: bool,
    seg0_locale_exception: bool,
    locale_exception: bool,
    valid_app: bool,
    app_exception: bool,
}

/// What happens to the first segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LangRule {
    /// seg1 is a locale exception, so these URLs have no lang at all and the
    /// client app belongs in seg0.
    AppInPlaceOfLang,
    /// seg0 is an aliased/miscased lang, or garbage in front of a valid app
    /// or clientApp exception.
    ReplaceLang,
    /// seg0 is a locale exception; prepend the client app.
    PrependApp,
    /// No usable lang at all; prepend one.
    PrependLang,
}

const LANG_RULES: &[(LangRule, fn(&Signals<'_>) -> bool)] = &[
    (LangRule::AppInPlaceOfLang, locale_exception_in_app_slot),
    (LangRule::ReplaceLang, lang_slot_needs_replacing),
    (LangRule::PrependApp, locale_exception_in_lang_slot),
    (LangRule::PrependLang, lang_missing),
];

fn locale_exception_in_app_slot(s: &Signals<'_>) -> bool {
    s.locale_exception
}

fn lang_slot_needs_replacing(s: &Signals<'_>) -> bool {
    (s.valid_lang && s.lang_changed) || s.valid_app || s.app_exception
}

fn locale_exception_in_lang_slot(s: &Signals<'_>) -> bool {
    s.seg0_locale_exception
}

fn lang_missing(s: &Signals<'_>) -> bool {
    !s.valid_lang
}

fn lang_rule(signals: &Signals<'_>) -> Option<LangRule> {
    LANG_RULES
        .iter()
        .find(|(_, applies)| applies(signals))
        .map(|(rule, _)| *rule)
}

/// Segments after the lang pass, plus what that pass learned.
#[derive(Debug)]
struct Placement {
    segments: Vec<String>,
    app_from_header: bool,
    /// The lang pass already put a client app where it belongs.
    app_placed: bool,
    /// clientApp exception in seg1, re-checked after a lang was prepended.
    app_exception: bool,
    unknown_leading: bool,
}

/// What happens to the second segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppRule {
    /// Prepending a lang shifted a valid app into seg1.
    AppAfterPrependedLang,
    /// The lang pass already placed the app.
    PlacedByLangRule,
    /// An exception occupies the app slot; check it is served here.
    ExceptionGate,
    /// No valid app; insert the sniffed one.
    PrependApp,
}

struct AppSignals<'a> {
    signals: &'a Signals<'a>,
    placement: &'a Placement,
    seg1_is_app: bool,
}

const APP_RULES: &[(AppRule, fn(&AppSignals<'_>) -> bool)] = &[
    (AppRule::AppAfterPrependedLang, app_shifted_into_place),
    (AppRule::PlacedByLangRule, app_placed_by_lang_rule),
    (AppRule::ExceptionGate, exception_in_app_slot),
    (AppRule::PrependApp, app_missing),
];

fn app_shifted_into_place(a: &AppSignals<'_>) -> bool {
    !a.signals.valid_app && a.seg1_is_app
}

fn app_placed_by_lang_rule(a: &AppSignals<'_>) -> bool {
    a.placement.app_placed
}

fn exception_in_app_slot(a: &AppSignals<'_>) -> bool {
    a.signals.locale_exception || a.placement.app_exception
}

fn app_missing(a: &AppSignals<'_>) -> bool {
    !a.signals.valid_app
}

fn app_rule(app_signals: &AppSignals<'_>) -> Option<AppRule> {
    APP_RULES
        .iter()
        .find(|(_, applies)| applies(app_signals))
        .map(|(rule, _)| *rule)
}

fn segment(segments: &[String], index: usize) -> &str {
    segments.get(index).map(String::as_str).unwrap_or_default()
}

fn with_replaced(segments: &[String], index: usize, value: &str) -> Vec<String> {
    let mut out = segments.to_vec();
    out[index] = value.to_string();
    out
}

fn with_inserted(segments: &[String], index: usize, value: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(segments.len() + 1);
    out.extend_from_slice(&segments[..index]);
    out.push(value.to_string());
    out.extend_from_slice(&segments[index..]);
    out
}

fn apply_lang_rule(
    rule: Option<LangRule>,
    segments: &[String],
    signals: &Signals<'_>,
    lang: &str,
    app: &str,
    allow_list: &AllowListConfiguration,
) -> Placement {
    let mut placement = Placement {
        segments: segments.to_vec(),
        app_from_header: false,
        app_placed: false,
        app_exception: signals.app_exception,
        unknown_leading: false,
    };

    match rule {
        Some(LangRule::AppInPlaceOfLang) => {
            if !signals.seg0_is_app {
                placement.segments = with_replaced(segments, 0, app);
                placement.app_from_header = true;
                placement.app_placed = true;
            }
        }
        Some(LangRule::ReplaceLang) => {
            placement.segments = with_replaced(segments, 0, lang);
            placement.unknown_leading = !signals.seg0.is_empty() && !signals.lang_from_url;
        }
        Some(LangRule::PrependApp) => {
            placement.segments = with_inserted(segments, 0, app);
            placement.app_from_header = true;
            placement.app_placed = true;
        }
        Some(LangRule::PrependLang) => {
            placement.segments = with_inserted(segments, 0, lang);
            // seg0 moved into the app slot; it may be an exception now.
            placement.app_exception =
                allow_list.is_valid_client_app_url_exception(segment(&placement.segments, 1));
            placement.unknown_leading = !signals.seg0.is_empty()
                && !signals.seg0_is_app
                && !placement.app_exception;
        }
        None => {}
    }

    placement
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve a request path against explicit configuration.
pub fn resolve_prefix(
    request: &PrefixRequest<'_>,
    allow_list: &AllowListConfiguration,
    locale: &LocaleConfig,
) -> Resolution {
    let (path, query) = match request.path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request.path, None),
    };
    let segments: Vec<String> = path
        .strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(str::to_string)
        .collect();

    let seg0 = segment(&segments, 0);
    let seg1 = segment(&segments, 1);

    let language: LanguageResolution =
        locale.resolve_language(Some(seg0), request.accept_language);
    let sniffed_app = client_app_from_user_agent(request.user_agent, allow_list);

    let signals = Signals {
        seg0,
        valid_lang: locale.is_valid_lang(seg0),
        lang_from_url: language.source == LangSource::Url,
        lang_changed: seg0 != language.lang,
        seg0_is_app: allow_list.is_valid_client_app(seg0),
        seg0_locale_exception: allow_list.is_valid_locale_url_exception(seg0),
        locale_exception: allow_list.is_valid_locale_url_exception(seg1),
        valid_app: allow_list.is_valid_client_app(seg1),
        app_exception: allow_list.is_valid_client_app_url_exception(seg1),
    };

    let lang_rule = lang_rule(&signals);
    let mut placement = apply_lang_rule(
        lang_rule,
        &segments,
        &signals,
        &language.lang,
        sniffed_app,
        allow_list,
    );
    tracing::debug!(
        path = %request.path,
        lang = %language.lang,
        lang_source = ?language.source,
        rule = ?lang_rule,
        segments = ?placement.segments,
        "Lang pass"
    );

    let app_rule = {
        let app_signals = AppSignals {
            signals: &signals,
            placement: &placement,
            seg1_is_app: allow_list.is_valid_client_app(segment(&placement.segments, 1)),
        };
        app_rule(&app_signals)
    };
    match app_rule {
        Some(AppRule::ExceptionGate) => {
            let served_here = allow_list.is_client_app_route(segment(&placement.segments, 1));
            if !served_here && (signals.valid_lang || signals.locale_exception) {
                tracing::info!(path = %request.path, "Exception in URL is not served here; handing off upstream");
                return Resolution::NotFound;
            }
        }
        Some(AppRule::PrependApp) => {
            placement.segments = with_inserted(&placement.segments, 1, sniffed_app);
            placement.app_from_header = true;
        }
        Some(AppRule::AppAfterPrependedLang) | Some(AppRule::PlacedByLangRule) | None => {}
    }
    tracing::debug!(rule = ?app_rule, segments = ?placement.segments, "App pass");

    // A lang the URL did not supply was negotiated, even when no header was
    // sent: the same path with `Accept-Language` lands elsewhere.
    let lang_placed = matches!(lang_rule, Some(LangRule::ReplaceLang) | Some(LangRule::PrependLang));
    let vary = Vary {
        accept_language: lang_placed && language.source != LangSource::Url,
        user_agent: placement.app_from_header,
    };

    let new_path = format!("/{}", placement.segments.join("/"));
    let location = match query {
        Some(query) => format!("{}?{}", new_path, query),
        None => new_path,
    };

    if location == request.path {
        return passthrough(&placement.segments, &language, sniffed_app, allow_list, locale);
    }

    let kind = if vary.is_empty() && !placement.unknown_leading {
        RedirectKind::Permanent
    } else {
        RedirectKind::Temporary
    };

    redirect_or_fallback(request.path, location, kind, vary, || Resolution::Passthrough {
        vary: Vary {
            accept_language: language.source != LangSource::Url,
            user_agent: true,
        },
        lang: language.lang,
        client_app: sniffed_app.to_string(),
    })
}

/// Redirect to `location` unless it is protocol-relative (`//host/...`), in
/// which case `fallback` is served in place.
fn redirect_or_fallback(
    path: &str,
    location: String,
    kind: RedirectKind,
    vary: Vary,
    fallback: impl FnOnce() -> Resolution,
) -> Resolution {
    if location.starts_with("//") {
        tracing::warn!(path = %path, location = %location, "Refusing protocol-relative redirect");
        return fallback();
    }

    tracing::info!(
        path = %path,
        location = %location,
        status = kind.status_code(),
        "Redirecting to canonical prefix"
    );
    Resolution::Redirect {
        kind,
        location,
        vary,
    }
}

/// Values for a path that is already canonical.
///
/// Locale-exception paths (`/firefox/downloads/...`) carry the app in seg0
/// and no lang, so the negotiated lang stands in for it.
fn passthrough(
    segments: &[String],
    language: &LanguageResolution,
    sniffed_app: &str,
    allow_list: &AllowListConfiguration,
    locale: &LocaleConfig,
) -> Resolution {
    let seg0 = segment(segments, 0);
    let seg1 = segment(segments, 1);
    let lang_in_url = locale.is_valid_lang(seg0);

    let (client_app, app_from_header) = if allow_list.is_valid_client_app(seg1) {
        (seg1, false)
    } else if allow_list.is_valid_client_app(seg0) {
        (seg0, false)
    } else {
        (sniffed_app, true)
    };

    Resolution::Passthrough {
        lang: if lang_in_url {
            seg0.to_string()
        } else {
            language.lang.clone()
        },
        client_app: client_app.to_string(),
        vary: Vary {
            accept_language: !lang_in_url,
            user_agent: app_from_header,
        },
    }
}
