//! Lang/locale normalization and `Accept-Language` negotiation.
//!
//! Two spellings are in play: *langs* as they appear in URLs (`en-US`) and
//! *locales* as catalogs name them (`en_US`). Converting one way and back is
//! how user input gets its canonical casing.

use serde::Serialize;

use crate::config::LocaleConfig;

/// Convert a locale (`en_US`) into a lang (`en-US`).
///
/// Three-part locales drop the middle subtag (`sr_Latn_RS` -> `sr-RS`).
pub fn locale_to_lang(locale: &str) -> Option<String> {
    join_subtags(locale, '_', '-')
}

/// Convert a lang (`en-US`) into a locale (`en_US`).
pub fn lang_to_locale(lang: &str) -> Option<String> {
    join_subtags(lang, '-', '_')
}

/// Canonical casing for anything that looks like a lang or a locale:
/// `en-us`, `en_US` and `EN_us` all become `en-US`.
pub fn normalize_lang(lang: &str) -> Option<String> {
    lang_to_locale(lang).and_then(|locale| locale_to_lang(&locale))
}

fn join_subtags(value: &str, from: char, to: char) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let parts: Vec<&str> = value.split(from).collect();
    match parts.as_slice() {
        [language] => Some(language.to_lowercase()),
        [language, region] => Some(format!("{}{}{}", language.to_lowercase(), to, region_case(region))),
        [language, _, region] => Some(format!(
            "{}{}{}",
            language.to_lowercase(),
            to,
            region.to_uppercase()
        )),
        _ => {
            tracing::error!(value = %value, "Unable to map a lang/locale with more than three subtags");
            None
        }
    }
}

/// Two-letter regions are upper-cased; longer subtags (scripts, `mac`) are
/// title-cased.
fn region_case(subtag: &str) -> String {
    if subtag.chars().count() > 2 {
        let mut chars = subtag.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    } else {
        subtag.to_uppercase()
    }
}

/// One entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    pub lang: String,
    pub quality: f32,
}

/// Parse an `Accept-Language` header into preferences sorted by descending
/// quality. Entries with equal quality keep header order; a missing or
/// unparseable `q` counts as 1.
pub fn parse_accept_language(header: &str) -> Vec<LanguagePreference> {
    if header.is_empty() {
        return Vec::new();
    }

    let mut prefs: Vec<LanguagePreference> = header
        .split(',')
        .map(|raw| {
            let mut parts = raw.split(';');
            let lang = parts.next().unwrap_or_default().trim().to_string();
            let quality = parts
                .next()
                .map(str::trim)
                .and_then(|param| param.strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .filter(|q| !q.is_nan())
                .unwrap_or(1.0);
            LanguagePreference { lang, quality }
        })
        .collect();

    prefs.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    prefs
}

/// Where a resolved lang came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LangSource {
    /// The URL segment named a supported lang (possibly via an alias).
    Url,
    /// The URL did not help and `Accept-Language` was consulted.
    AcceptLanguage,
    /// Neither source helped; the configured default was used.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageResolution {
    pub lang: String,
    pub source: LangSource,
}

impl LanguageResolution {
    /// Responses built from this lang must vary on `accept-language`.
    pub fn is_from_header(&self) -> bool {
        self.source == LangSource::AcceptLanguage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

impl LocaleConfig {
    /// True only for langs served as-is, in canonical casing.
    pub fn is_valid_lang(&self, lang: &str) -> bool {
        self.langs.iter().any(|l| l == lang)
    }

    /// Valid langs plus aliases that map onto one.
    pub fn is_supported_lang(&self, lang: &str) -> bool {
        self.is_valid_lang(lang) || self.lang_map.contains_key(lang)
    }

    /// Normalize, then map aliases (`pt` -> `pt-PT`); anything unknown
    /// becomes the default lang.
    pub fn sanitize_language(&self, lang_or_locale: Option<&str>) -> String {
        let language = lang_or_locale.and_then(normalize_lang);
        match language {
            Some(lang) if self.is_valid_lang(&lang) => lang,
            Some(lang) => self
                .lang_map
                .get(&lang)
                .cloned()
                .unwrap_or_else(|| self.default_lang.clone()),
            None => self.default_lang.clone(),
        }
    }

    /// Best supported match from an `Accept-Language` header, normalized but
    /// not alias-mapped. A region we don't carry falls back to its primary
    /// subtag (`de-AT` -> `de`).
    pub fn lang_from_header(&self, accept_language: &str) -> Option<String> {
        let supported = |lang: &str| normalize_lang(lang).is_some_and(|l| self.is_supported_lang(&l));

        parse_accept_language(accept_language)
            .into_iter()
            .find_map(|pref| {
                if supported(&pref.lang) {
                    return Some(pref.lang);
                }
                let primary = pref.lang.split('-').next().unwrap_or_default();
                supported(primary).then(|| primary.to_string())
            })
            .and_then(|lang| normalize_lang(&lang))
    }

    /// Resolve the request lang from the first URL segment, falling back to
    /// `Accept-Language`, then to the default.
    pub fn resolve_language(
        &self,
        url_lang: Option<&str>,
        accept_language: Option<&str>,
    ) -> LanguageResolution {
        let from_url = url_lang
            .and_then(normalize_lang)
            .is_some_and(|lang| self.is_supported_lang(&lang));
        if from_url {
            return LanguageResolution {
                lang: self.sanitize_language(url_lang),
                source: LangSource::Url,
            };
        }

        match accept_language.filter(|h| !h.is_empty()) {
            Some(header) => LanguageResolution {
                lang: self.sanitize_language(self.lang_from_header(header).as_deref()),
                source: LangSource::AcceptLanguage,
            },
            None => LanguageResolution {
                lang: self.default_lang.clone(),
                source: LangSource::Default,
            },
        }
    }

    pub fn is_rtl_lang(&self, lang: &str) -> bool {
        let language = self.sanitize_language(Some(lang));
        self.rtl_langs.iter().any(|l| *l == language)
    }

    pub fn direction(&self, lang: &str) -> TextDirection {
        if self.is_rtl_lang(lang) {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales() -> LocaleConfig {
        LocaleConfig::default()
    }

    #[test]
    fn test_locale_to_lang() {
        assert_eq!(locale_to_lang("en_US").as_deref(), Some("en-US"));
        assert_eq!(locale_to_lang("EN_us").as_deref(), Some("en-US"));
        assert_eq!(locale_to_lang("de").as_deref(), Some("de"));
        assert_eq!(locale_to_lang("sr_Latn_RS").as_deref(), Some("sr-RS"));
        assert_eq!(locale_to_lang("ja_JP_mac").as_deref(), Some("ja-MAC"));
        assert_eq!(locale_to_lang("a_b_c_d"), None);
        assert_eq!(locale_to_lang(""), None);
    }

    #[test]
    fn test_lang_to_locale() {
        assert_eq!(lang_to_locale("en-US").as_deref(), Some("en_US"));
        assert_eq!(lang_to_locale("sr-Cyrl-RS").as_deref(), Some("sr_RS"));
        assert_eq!(lang_to_locale("ja-JP-mac").as_deref(), Some("ja_MAC"));
        assert_eq!(lang_to_locale("zh-hant").as_deref(), Some("zh_Hant"));
    }

    #[test]
    fn test_normalize_lang() {
        assert_eq!(normalize_lang("en-us").as_deref(), Some("en-US"));
        assert_eq!(normalize_lang("en_US").as_deref(), Some("en-US"));
        assert_eq!(normalize_lang("PT").as_deref(), Some("pt"));
        assert_eq!(normalize_lang(""), None);
    }

    #[test]
    fn test_valid_vs_supported() {
        let l = locales();
        assert!(l.is_valid_lang("en-US"));
        assert!(!l.is_valid_lang("en-us"));
        assert!(!l.is_valid_lang("en_US"));
        assert!(!l.is_valid_lang("awooga"));
        assert!(!l.is_valid_lang("pt"));
        assert!(l.is_supported_lang("pt"));
        assert!(!l.is_supported_lang("en-us"));
    }

    #[test]
    fn test_sanitize_language() {
        let l = locales();
        assert_eq!(l.sanitize_language(Some("en-us")), "en-US");
        assert_eq!(l.sanitize_language(Some("pt")), "pt-PT");
        assert_eq!(l.sanitize_language(Some("bogus")), "en-US");
        assert_eq!(l.sanitize_language(None), "en-US");
    }

    #[test]
    fn test_parse_accept_language_orders_by_quality() {
        let prefs = parse_accept_language("pl,fr-FR;q=0.3,en-US;q=0.1");
        let langs: Vec<&str> = prefs.iter().map(|p| p.lang.as_str()).collect();
        assert_eq!(langs, vec!["pl", "fr-FR", "en-US"]);
        assert_eq!(prefs[0].quality, 1.0);

        let prefs = parse_accept_language("en-US;q=0.1, de;q=0.9, fr");
        let langs: Vec<&str> = prefs.iter().map(|p| p.lang.as_str()).collect();
        assert_eq!(langs, vec!["fr", "de", "en-US"]);
    }

    #[test]
    fn test_parse_accept_language_bad_quality_counts_as_one() {
        let prefs = parse_accept_language("de;q=0.2,fr;q=wat");
        assert_eq!(prefs[0].lang, "fr");
        assert_eq!(prefs[0].quality, 1.0);
        assert!(parse_accept_language("").is_empty());
    }

    #[test]
    fn test_lang_from_header() {
        let l = locales();
        assert_eq!(
            l.lang_from_header("pt-br;q=0.5,en-us;q=0.3,en;q=0.2").as_deref(),
            Some("pt-BR")
        );
        // Region we don't carry falls back to the primary subtag.
        assert_eq!(l.lang_from_header("de-AT").as_deref(), Some("de"));
        assert_eq!(l.lang_from_header("awooga;q=0.5"), None);
    }

    #[test]
    fn test_resolve_language_from_url() {
        let l = locales();
        let res = l.resolve_language(Some("fr"), None);
        assert_eq!(res.lang, "fr");
        assert_eq!(res.source, LangSource::Url);
        assert!(!res.is_from_header());

        let res = l.resolve_language(Some("pt"), Some("de"));
        assert_eq!(res.lang, "pt-PT");
        assert_eq!(res.source, LangSource::Url);
    }

    #[test]
    fn test_resolve_language_defaults() {
        let l = locales();
        for lang in [None, Some(""), Some("bogus")] {
            let res = l.resolve_language(lang, None);
            assert_eq!(res.lang, "en-US");
            assert_eq!(res.source, LangSource::Default);
        }
    }

    #[test]
    fn test_resolve_language_from_header() {
        let l = locales();
        let res = l.resolve_language(Some("bogus"), Some("pt-br;q=0.5,en-us;q=0.3,en;q=0.2"));
        assert_eq!(res.lang, "pt-BR");
        assert!(res.is_from_header());

        let res = l.resolve_language(Some("wat"), Some("pt;q=0.5,en-us;q=0.3,en;q=0.2"));
        assert_eq!(res.lang, "pt-PT");
        assert!(res.is_from_header());

        // Header consulted but nothing matched: still varies on it.
        let res = l.resolve_language(Some("wat"), Some("awooga;q=0.5"));
        assert_eq!(res.lang, "en-US");
        assert!(res.is_from_header());
    }

    #[test]
    fn test_direction() {
        let l = locales();
        assert_eq!(l.direction("ar"), TextDirection::Rtl);
        assert_eq!(l.direction("he"), TextDirection::Rtl);
        assert_eq!(l.direction("en-US"), TextDirection::Ltr);
        assert_eq!(l.direction("bogus"), TextDirection::Ltr);
        assert_eq!(TextDirection::Rtl.as_str(), "rtl");
    }
}
