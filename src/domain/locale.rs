//! Site locales and their URL prefixes.
//!
//! English is served without a prefix; every other locale lives under
//! `/<code>`. The response cache strips the prefix so that one logical path
//! covers every language variant.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
    Ru,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Es, Locale::Ru];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Ru => "ru",
        }
    }

    /// Value for `<link rel="alternate" hreflang=…>`.
    pub fn hreflang(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es-ES",
            Locale::Ru => "ru",
        }
    }

    pub fn og_locale(self) -> &'static str {
        match self {
            Locale::En => "en_GB",
            Locale::Es => "es_ES",
            Locale::Ru => "ru_RU",
        }
    }

    fn prefix(self) -> Option<&'static str> {
        match self {
            Locale::En => None,
            Locale::Es => Some("/es"),
            Locale::Ru => Some("/ru"),
        }
    }

    /// Prefix a logical path (`/sale`) with this locale (`/es/sale`).
    pub fn localize_path(self, path: &str) -> String {
        match self.prefix() {
            None => path.to_string(),
            Some(prefix) if path == "/" => prefix.to_string(),
            Some(prefix) => format!("{prefix}{path}"),
        }
    }

    /// Split a request path into its locale and logical path.
    ///
    /// Paths without a known prefix belong to the default locale.
    pub fn split_path(path: &str) -> (Locale, &str) {
        for locale in Locale::ALL {
            let Some(prefix) = locale.prefix() else {
                continue;
            };
            if let Some(rest) = path.strip_prefix(prefix) {
                if rest.is_empty() {
                    return (locale, "/");
                }
                if rest.starts_with('/') {
                    return (locale, rest);
                }
            }
        }
        (Locale::default(), path)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            "ru" => Ok(Locale::Ru),
            other => Err(DomainError::unknown_locale(other)),
        }
    }
}
