//! Word extraction from document values.

use crate::{
    error::Result,
    fields::Fields,
    value::{Ancestors, Value},
};

/// Normalize one whitespace-delimited word: lowercase, alphanumerics only.
fn normalize(word: &str) -> Option<String> {
    let word: String = word
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect();
    (!word.is_empty()).then_some(word)
}

fn push_words(text: &str, out: &mut Vec<String>) {
    out.extend(text.split_whitespace().filter_map(normalize));
}

fn words_in(value: &Value, ancestors: &mut Ancestors) -> Result<Vec<String>> {
    let mut words = Vec::new();
    value.visit_text(ancestors, &mut |text: &str| push_words(text, &mut words))?;
    Ok(words)
}

/// Every word in `value`, depth-first in traversal order.
///
/// Fails with [`Error::Cycle`](crate::Error::Cycle) if the value contains
/// itself.
pub fn words(value: &Value) -> Result<Vec<String>> {
    words_in(value, &mut Ancestors::default())
}

/// Words grouped by field.
///
/// Each key of an object value is its own field, kept only when `filter`
/// selects it. Any other value is a single field named `default_field`, and
/// the filter does not apply.
pub fn field_words(
    value: &Value,
    default_field: &str,
    filter: Option<&Fields>,
) -> Result<Vec<(String, Vec<String>)>> {
    let mut ancestors = Ancestors::default();
    match value {
        Value::Object(node) => node.enter(&mut ancestors, |entries, ancestors| {
            entries
                .iter()
                .filter(|(field, _)| filter.is_none_or(|f| f.includes(field)))
                .map(|(field, item)| Ok((field.clone(), words_in(item, &mut *ancestors)?)))
                .collect()
        }),
        _ => Ok(vec![(
            default_field.to_string(),
            words_in(value, &mut ancestors)?,
        )]),
    }
}
