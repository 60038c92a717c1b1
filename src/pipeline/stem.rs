use super::Stage;
use crate::{config::Language, error::Result};
use futures::{FutureExt, future::BoxFuture};
use rust_stemmers::Stemmer;
use std::fmt;

/// Upper bound on re-stemming; snowball stemmers settle within a pass or two.
const MAX_PASSES: usize = 4;

/// Reduces tokens to their snowball root form.
pub struct Stem {
    language: Language,
    stemmer: Stemmer,
}

impl Stem {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            stemmer: Stemmer::create(language.into()),
        }
    }

    /// Stem `token` until it stops changing, so stemming stemmed output is a
    /// no-op.
    pub fn stem(&self, token: &str) -> String {
        let mut current = token.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.stemmer.stem(&current);
            if next == current {
                break;
            }
            current = next.into_owned();
        }
        current
    }
}

impl Stage for Stem {
    fn apply(&self, tokens: Vec<String>) -> BoxFuture<'_, Result<Vec<String>>> {
        let stemmed: Vec<String> = tokens.iter().map(|token| self.stem(token)).collect();
        futures::future::ready(Ok(stemmed)).boxed()
    }
}

impl fmt::Debug for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stem")
            .field("language", &self.language)
            .finish()
    }
}
