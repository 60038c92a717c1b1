use super::Stage;
use crate::error::Result;
use ahash::AHashSet;
use futures::{FutureExt, future::BoxFuture};

/// Common English words that carry no search signal.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
    "should", "now",
];

/// Strict and reserved Rust keywords, lowercased.
pub const RESERVED_WORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait",
    "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Drops tokens found in a word set.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: AHashSet<String>,
}

impl StopWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in English list.
    pub fn english() -> Self {
        Self::new(ENGLISH_STOP_WORDS.iter().copied())
    }

    #[must_use]
    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Stage for StopWords {
    fn apply(&self, mut tokens: Vec<String>) -> BoxFuture<'_, Result<Vec<String>>> {
        tokens.retain(|token| !self.contains(token));
        futures::future::ready(Ok(tokens)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_filters_stop_and_reserved_words() {
        let stage = StopWords::english().with_words(RESERVED_WORDS.iter().copied());
        let tokens = strings(&["foo", "his", "self", "fn", "instanceof", "constructor", "the"]);
        check!(stage.apply(tokens).await.unwrap() == vec!["foo", "instanceof", "constructor"]);
    }

    #[test]
    fn test_extra_words() {
        let stage = StopWords::default().with_words(["lorem"]);
        check!(stage.len() == 1);
        check!(stage.contains("lorem"));
        check!(!StopWords::default().contains("lorem"));
    }
}
