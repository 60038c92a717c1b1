//! Tokenization pipeline.
//!
//! A value is first reduced to lowercase alphanumeric words by a depth-first
//! extraction pass, then handed through an ordered list of [`Stage`]s. The
//! default stages are stemming followed by stop-word filtering, with the
//! stop words also dropped before stemming so that their roots never reach
//! the index. A root shared with a content word (`does` and `doe`) stays
//! searchable. Stages are
//! asynchronous and may suspend; extraction always completes before the
//! first stage runs, so no borrow of the value is held across a suspension.

pub mod extract;
mod stem;
mod stopword;

pub use stem::Stem;
pub use stopword::{ENGLISH_STOP_WORDS, RESERVED_WORDS, StopWords};

use crate::{config::IndexConfig, error::Result, fields::Fields, value::Value};
use futures::future::BoxFuture;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// One transformation of a token sequence.
pub trait Stage: Send + Sync + fmt::Debug {
    fn apply(&self, tokens: Vec<String>) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// Tokens grouped by field name.
pub type FieldTokens = BTreeMap<String, Vec<String>>;

/// An ordered chain of stages. Cloning shares the stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    default_field: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl Pipeline {
    /// Extraction only, no stages.
    pub fn bare() -> Self {
        Self {
            stages: Vec::new(),
            default_field: IndexConfig::default().default_field,
        }
    }

    /// Stop-word filtering on both sides of stemming, as configured.
    pub fn from_config(config: &IndexConfig) -> Self {
        let mut stop = StopWords::english().with_words(config.stop_words.iter().cloned());
        if config.filter_reserved_words {
            stop = stop.with_words(RESERVED_WORDS.iter().copied());
        }
        let stop: Arc<dyn Stage> = Arc::new(stop);

        Self {
            stages: vec![
                Arc::clone(&stop),
                Arc::new(Stem::new(config.language)),
                stop,
            ],
            default_field: config.default_field.clone(),
        }
    }

    /// Append a stage after the existing ones.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Field that non-object values are indexed under.
    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    pub fn stages(&self) -> usize {
        self.stages.len()
    }

    /// Tokenize `value`.
    pub async fn process(&self, value: &Value) -> Result<Vec<String>> {
        let words = extract::words(value)?;
        self.process_tokens(words).await
    }

    /// Run already-extracted tokens through every stage.
    pub async fn process_tokens(&self, mut tokens: Vec<String>) -> Result<Vec<String>> {
        for stage in &self.stages {
            tokens = stage.apply(tokens).await?;
        }
        Ok(tokens)
    }

    /// Tokenize `value` per field, honoring an index-time field filter.
    pub async fn process_fields(
        &self,
        value: &Value,
        filter: Option<&Fields>,
    ) -> Result<FieldTokens> {
        let extracted = extract::field_words(value, &self.default_field, filter)?;
        let mut fields = FieldTokens::new();
        for (field, words) in extracted {
            let tokens = self.process_tokens(words).await?;
            fields.entry(field).or_default().extend(tokens);
        }
        Ok(fields)
    }
}
