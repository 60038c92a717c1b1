//! Index configuration.

use crate::error::{Error, Result};
use rust_stemmers::Algorithm;
use serde::Deserialize;
use std::path::Path;

/// Stemmer languages accepted in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    Danish,
    Dutch,
    #[default]
    English,
    Finnish,
    French,
    German,
    Greek,
    Hungarian,
    Italian,
    Norwegian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Turkish,
}

impl From<Language> for Algorithm {
    fn from(language: Language) -> Self {
        match language {
            Language::Arabic => Self::Arabic,
            Language::Danish => Self::Danish,
            Language::Dutch => Self::Dutch,
            Language::English => Self::English,
            Language::Finnish => Self::Finnish,
            Language::French => Self::French,
            Language::German => Self::German,
            Language::Greek => Self::Greek,
            Language::Hungarian => Self::Hungarian,
            Language::Italian => Self::Italian,
            Language::Norwegian => Self::Norwegian,
            Language::Portuguese => Self::Portuguese,
            Language::Romanian => Self::Romanian,
            Language::Russian => Self::Russian,
            Language::Spanish => Self::Spanish,
            Language::Swedish => Self::Swedish,
            Language::Tamil => Self::Tamil,
            Language::Turkish => Self::Turkish,
        }
    }
}

/// Tunables for an [`Index`](crate::Index).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// language = "english"
/// stop_words = ["lorem", "ipsum"]
/// scan_page_size = 64
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Stemmer language for the default pipeline.
    pub language: Language,
    /// Extra stop words on top of the built-in English set.
    pub stop_words: Vec<String>,
    /// Drop tokens that are reserved identifiers of the host language.
    pub filter_reserved_words: bool,
    /// Field name used for values that are not objects.
    pub default_field: String,
    /// Capacity of each per-operation notification channel.
    pub event_capacity: usize,
    /// Entries fetched per store round trip by lazy range streams.
    pub scan_page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            language: Language::English,
            stop_words: Vec::new(),
            filter_reserved_words: true,
            default_field: "*".to_string(),
            event_capacity: 1024,
            scan_page_size: 256,
        }
    }
}

impl IndexConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()
    }

    /// Read and parse a TOML configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub(crate) fn validate(self) -> Result<Self> {
        if self.scan_page_size == 0 {
            return Err(Error::Config("scan_page_size must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        if self.default_field.is_empty() {
            return Err(Error::Config("default_field must not be empty".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = IndexConfig::from_toml_str("").unwrap();
        check!(config.language == Language::English);
        check!(config.filter_reserved_words);
        check!(config.default_field == "*");
        check!(config.scan_page_size == 256);
    }

    #[test]
    fn test_partial_override() {
        let config = IndexConfig::from_toml_str(
            r#"
            language = "german"
            stop_words = ["und"]
            scan_page_size = 8
            "#,
        )
        .unwrap();
        check!(config.language == Language::German);
        check!(config.stop_words == vec!["und".to_string()]);
        check!(config.scan_page_size == 8);
        check!(config.event_capacity == 1024);
    }

    #[rstest]
    #[case("scan_page_size = 0")]
    #[case("event_capacity = 0")]
    #[case("default_field = \"\"")]
    #[case("language = \"klingon\"")]
    #[case("unknown_key = true")]
    fn test_rejects_invalid(#[case] text: &str) {
        let_assert!(Err(Error::Config(_)) = IndexConfig::from_toml_str(text));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.toml");
        tokio::fs::write(&path, "filter_reserved_words = false\n")
            .await
            .unwrap();

        let config = IndexConfig::load(&path).await.unwrap();
        check!(!config.filter_reserved_words);
    }
}
