//! Query forms and their reduction to weighted terms.

use crate::{error::Result, pipeline::Pipeline, value::Value};
use std::collections::{BTreeMap, BTreeSet};

/// Something to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Free text, tokenized by the index pipeline.
    Text(String),
    /// Already-tokenized terms, matched verbatim.
    Tokens(Vec<String>),
    /// Pseudo-field name to free text. Each text is tokenized on its own and
    /// the matches of all groups add up into one score.
    Fields(BTreeMap<String, String>),
}

/// Query terms and how many times each counts toward a score.
pub(crate) type WeightedTerms = BTreeMap<String, f64>;

impl Query {
    /// Reduce the query to distinct terms with their multipliers.
    ///
    /// A term repeated inside one group counts once; a term appearing in
    /// several pseudo-field groups counts once per group.
    pub(crate) async fn terms(&self, pipeline: &Pipeline) -> Result<WeightedTerms> {
        let groups: Vec<BTreeSet<String>> = match self {
            Self::Text(text) => {
                let tokens = pipeline.process(&Value::from(text.as_str())).await?;
                vec![tokens.into_iter().collect()]
            }
            Self::Tokens(tokens) => vec![
                tokens
                    .iter()
                    .filter(|token| !token.is_empty())
                    .cloned()
                    .collect(),
            ],
            Self::Fields(groups) => {
                let mut out = Vec::with_capacity(groups.len());
                for text in groups.values() {
                    let tokens = pipeline.process(&Value::from(text.as_str())).await?;
                    out.push(tokens.into_iter().collect());
                }
                out
            }
        };

        let mut terms = WeightedTerms::new();
        for term in groups.into_iter().flatten() {
            *terms.entry(term).or_insert(0.0) += 1.0;
        }
        Ok(terms)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for Query {
    fn from(tokens: Vec<String>) -> Self {
        Self::Tokens(tokens)
    }
}

impl From<Vec<&str>> for Query {
    fn from(tokens: Vec<&str>) -> Self {
        Self::Tokens(tokens.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Query {
    fn from(tokens: [&str; N]) -> Self {
        Self::Tokens(tokens.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Query {
    fn from(groups: [(&str, &str); N]) -> Self {
        Self::Fields(
            groups
                .into_iter()
                .map(|(field, text)| (field.to_string(), text.to_string()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for Query {
    fn from(groups: BTreeMap<String, String>) -> Self {
        Self::Fields(groups)
    }
}
