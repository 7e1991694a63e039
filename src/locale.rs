//! UI text lookup in three languages.
//!
//! A [`LocaleProvider`] returns a flat key → text table for a language.
//! [`Translator`] holds the active table and falls back to the raw key when
//! a lookup misses, including when the table failed to load entirely, so a
//! broken locale file degrades to key names instead of an error.
//!
//! The active language is persisted under [`LANGUAGE_KEY`] in the same
//! key/value store as the avatar.

use crate::store::{KeyValueStore, LANGUAGE_KEY, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocaleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Locale JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown language '{0}' (expected one of: es, en, de)")]
    UnknownLanguage(String),
}

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    #[default]
    En,
    De,
}

impl Language {
    /// All languages in selector order.
    pub const ALL: [Language; 3] = [Language::Es, Language::En, Language::De];

    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::De => "de",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            other => Err(LocaleError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Flat key → text table.
pub type Translations = HashMap<String, String>;

/// Source of translation tables.
pub trait LocaleProvider {
    fn load(&self, language: Language) -> Result<Translations, LocaleError>;
}

/// Tables compiled into the binary from `locales/*.json`.
pub struct EmbeddedLocales;

impl LocaleProvider for EmbeddedLocales {
    fn load(&self, language: Language) -> Result<Translations, LocaleError> {
        let json = match language {
            Language::Es => include_str!("../locales/es.json"),
            Language::En => include_str!("../locales/en.json"),
            Language::De => include_str!("../locales/de.json"),
        };
        Ok(serde_json::from_str(json)?)
    }
}

/// Tables read from `<dir>/<code>.json` at runtime.
pub struct DirLocales {
    pub dir: PathBuf,
}

impl DirLocales {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LocaleProvider for DirLocales {
    fn load(&self, language: Language) -> Result<Translations, LocaleError> {
        let path = self.dir.join(format!("{}.json", language.code()));
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Active language plus its table.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    language: Language,
    table: Translations,
}

impl Translator {
    /// Use `language` without touching storage.
    pub fn with_language(provider: &dyn LocaleProvider, language: Language) -> Self {
        Self {
            language,
            table: load_table(provider, language),
        }
    }

    /// Start in the stored language, or `default` if none (or unreadable).
    pub fn load(provider: &dyn LocaleProvider, kv: &dyn KeyValueStore, default: Language) -> Self {
        let stored = match kv.get(LANGUAGE_KEY) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not read language preference: {}", e);
                None
            }
        };
        let language = stored
            .and_then(|code| match code.parse::<Language>() {
                Ok(language) => Some(language),
                Err(e) => {
                    log::warn!("Ignoring stored language: {}", e);
                    None
                }
            })
            .unwrap_or(default);
        Self::with_language(provider, language)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switch language and persist the choice.
    ///
    /// The in-memory switch happens even if persisting fails.
    pub fn set_language(
        &mut self,
        language: Language,
        provider: &dyn LocaleProvider,
        kv: &dyn KeyValueStore,
    ) -> Result<(), StoreError> {
        self.language = language;
        self.table = load_table(provider, language);
        kv.set(LANGUAGE_KEY, language.code())
    }

    /// Look up `key`, falling back to the key itself.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.table.get(key) {
            Some(text) if !text.is_empty() => text.as_str(),
            _ => key,
        }
    }
}

fn load_table(provider: &dyn LocaleProvider, language: Language) -> Translations {
    match provider.load(language) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("Error loading translations for '{}': {}", language, e);
            Translations::new()
        }
    }
}
