use std::collections::{HashMap, HashSet};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub prefix: AllowListConfiguration,
    pub locale: LocaleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enable_cors: bool,
    pub enable_tracing: bool,
    pub enable_metrics: bool,
    pub enforce_trailing_slash: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enable_cors: false,
            enable_tracing: true,
            enable_metrics: true,
            enforce_trailing_slash: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json_logs: bool,
}

/// Allow-lists that drive `/{lang}/{clientApp}/` prefix resolution.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AllowListConfiguration {
    /// Client applications that may appear as the second path segment.
    pub valid_client_applications: Vec<String>,
    /// Path segments that never carry a locale (e.g. `downloads`).
    pub valid_locale_url_exceptions: Vec<String>,
    /// Path segments that never carry a client application (e.g. `developers`).
    pub valid_client_app_url_exceptions: Vec<String>,
    /// Templated paths (`/$lang/about`) allowed to omit the trailing slash.
    pub valid_trailing_slash_url_exceptions: Vec<String>,
    /// Exception segments this server renders itself. Any other exception is
    /// handed back upstream with a 404.
    pub client_app_routes: Vec<String>,
    /// Used when the User-Agent does not identify a client application.
    pub default_client_app: String,
}

impl Default for AllowListConfiguration {
    fn default() -> Self {
        Self {
            valid_client_applications: strings(&["android", "firefox"]),
            valid_locale_url_exceptions: strings(&["downloads"]),
            valid_client_app_url_exceptions: strings(&[
                "about",
                "blocked-addon",
                "developers",
                "review_guide",
            ]),
            valid_trailing_slash_url_exceptions: strings(&[
                "/$lang/about",
                "/$lang/review_guide",
                "/$lang/$clientApp/search",
            ]),
            client_app_routes: strings(&["about", "blocked-addon", "review_guide"]),
            default_client_app: "firefox".into(),
        }
    }
}

impl AllowListConfiguration {
    pub fn is_valid_client_app(&self, value: &str) -> bool {
        contains(&self.valid_client_applications, value)
    }

    pub fn is_valid_locale_url_exception(&self, value: &str) -> bool {
        contains(&self.valid_locale_url_exceptions, value)
    }

    pub fn is_valid_client_app_url_exception(&self, value: &str) -> bool {
        contains(&self.valid_client_app_url_exceptions, value)
    }

    pub fn is_valid_trailing_slash_url_exception(&self, value: &str) -> bool {
        contains(&self.valid_trailing_slash_url_exceptions, value)
    }

    pub fn is_client_app_route(&self, value: &str) -> bool {
        contains(&self.client_app_routes, value)
    }

    /// Reject allow-lists that would make resolution ambiguous. Runs once at
    /// startup; the resolver itself assumes a validated configuration.
    pub fn validate(&self) -> Result<()> {
        if self.valid_client_applications.is_empty() {
            return Err(Error::config("valid_client_applications must not be empty"));
        }
        if !self.is_valid_client_app(&self.default_client_app) {
            return Err(Error::config(format!(
                "default_client_app '{}' is not listed in valid_client_applications",
                self.default_client_app
            )));
        }

        // Segment lists hold single path segments; trailing-slash exceptions
        // hold whole templated paths.
        let segment_lists = [
            ("valid_client_applications", &self.valid_client_applications),
            ("valid_locale_url_exceptions", &self.valid_locale_url_exceptions),
            ("valid_client_app_url_exceptions", &self.valid_client_app_url_exceptions),
            ("client_app_routes", &self.client_app_routes),
        ];
        for (name, list) in segment_lists {
            if list.iter().any(|v| v.is_empty() || v.contains('/')) {
                return Err(Error::config(format!("{} contains an empty or malformed entry", name)));
            }
        }
        if self
            .valid_trailing_slash_url_exceptions
            .iter()
            .any(|v| !v.starts_with('/'))
        {
            return Err(Error::config(
                "valid_trailing_slash_url_exceptions entries must start with '/'",
            ));
        }

        let apps: HashSet<&str> = self.valid_client_applications.iter().map(String::as_str).collect();
        let locale_exceptions: HashSet<&str> =
            self.valid_locale_url_exceptions.iter().map(String::as_str).collect();

        for exception in &self.valid_client_app_url_exceptions {
            if locale_exceptions.contains(exception.as_str()) {
                return Err(Error::config(format!(
                    "'{}' is both a locale and a clientApp URL exception",
                    exception
                )));
            }
        }
        for exception in self
            .valid_locale_url_exceptions
            .iter()
            .chain(&self.valid_client_app_url_exceptions)
        {
            if apps.contains(exception.as_str()) {
                return Err(Error::config(format!(
                    "'{}' is both a client application and a URL exception",
                    exception
                )));
            }
        }

        Ok(())
    }
}

/// Language tables used for lang/locale negotiation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LocaleConfig {
    pub default_lang: String,
    /// Langs served as-is, in their canonical casing.
    pub langs: Vec<String>,
    /// Aliases mapped onto a canonical lang, e.g. `pt -> pt-PT`.
    pub lang_map: HashMap<String, String>,
    pub rtl_langs: Vec<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let lang_map = [
            ("en", "en-US"),
            ("ga", "ga-IE"),
            ("pt", "pt-PT"),
            ("sv", "sv-SE"),
            ("zh", "zh-CN"),
        ]
        .into_iter()
        .map(|(alias, lang)| (alias.to_string(), lang.to_string()))
        .collect();

        Self {
            default_lang: "en-US".into(),
            langs: strings(&[
                "af", "ar", "ast", "az", "bg", "bn", "bs", "ca", "cak", "cs", "cy", "da", "de",
                "dsb", "el", "en-CA", "en-GB", "en-US", "es", "eu", "fa", "fi", "fr", "fy-NL",
                "ga-IE", "he", "hsb", "hu", "ia", "id", "it", "ja", "ka", "kab", "ko", "mk",
                "mn", "ms", "nb-NO", "nl", "nn-NO", "pl", "pt-BR", "pt-PT", "ro", "ru", "sk",
                "sl", "sq", "sv-SE", "te", "th", "tr", "uk", "ur", "vi", "zh-CN", "zh-TW",
            ]),
            lang_map,
            rtl_langs: strings(&["ar", "dbr", "fa", "he", "ur"]),
        }
    }
}

impl LocaleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.langs.is_empty() {
            return Err(Error::config("locale.langs must not be empty"));
        }
        if !self.langs.contains(&self.default_lang) {
            return Err(Error::config(format!(
                "default_lang '{}' is not listed in locale.langs",
                self.default_lang
            )));
        }
        if let Some((alias, target)) = self.lang_map.iter().find(|(_, t)| !self.langs.contains(t)) {
            return Err(Error::config(format!(
                "lang_map alias '{}' points at unknown lang '{}'",
                alias, target
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Layered load: `config/default`, `config/{PREFIXGATE_ENV}`, `config/local`,
    /// then `APP__SECTION__KEY` environment overrides. All files are optional;
    /// missing keys fall back to `Default`.
    pub fn load() -> Result<Self> {
        let env = std::env::var("PREFIXGATE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // APP__PREFIX__CLIENT_APP_ROUTES=about,developers
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("prefix.valid_client_applications")
                    .with_list_parse_key("prefix.valid_locale_url_exceptions")
                    .with_list_parse_key("prefix.valid_client_app_url_exceptions")
                    .with_list_parse_key("prefix.valid_trailing_slash_url_exceptions")
                    .with_list_parse_key("prefix.client_app_routes")
                    .with_list_parse_key("locale.langs")
                    .with_list_parse_key("locale.rtl_langs"),
            )
            .build()?;

        let cfg: Self = s.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.prefix.validate()?;
        self.locale.validate()
    }
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v == value)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
