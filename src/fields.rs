//! Field selection shared by index-time and query-time options.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which fields take part, and with what weight.
///
/// Deserializes from either a list of names or a map. Map values may be
/// booleans (enabled/disabled) or numbers (weights); fields missing from the
/// map are disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum Fields {
    /// Every listed field, with weight 1.
    Only(BTreeSet<String>),
    /// Per-field weights; a weight of zero disables the field.
    Weighted(BTreeMap<String, f64>),
}

impl Fields {
    /// Weight of `field`, zero when it is not selected.
    pub fn weight(&self, field: &str) -> f64 {
        match self {
            Self::Only(names) => {
                if names.contains(field) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Weighted(weights) => weights.get(field).copied().unwrap_or(0.0),
        }
    }

    pub fn includes(&self, field: &str) -> bool {
        self.weight(field) > 0.0
    }
}

/// Weight of `field` under an optional selection; everything counts once
/// when nothing is selected.
pub(crate) fn weight_of(fields: Option<&Fields>, field: &str) -> f64 {
    fields.map_or(1.0, |fields| fields.weight(field))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Toggle {
    Enabled(bool),
    Weight(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFields {
    List(BTreeSet<String>),
    Map(BTreeMap<String, Toggle>),
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawFields::deserialize(deserializer)? {
            RawFields::List(names) => Self::Only(names),
            RawFields::Map(toggles) => Self::Weighted(
                toggles
                    .into_iter()
                    .map(|(name, toggle)| {
                        let weight = match toggle {
                            Toggle::Enabled(true) => 1.0,
                            Toggle::Enabled(false) => 0.0,
                            Toggle::Weight(weight) => weight,
                        };
                        (name, weight)
                    })
                    .collect(),
            ),
        })
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(names: [&str; N]) -> Self {
        Self::Only(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Fields {
    fn from(weights: [(&str, f64); N]) -> Self {
        Self::Weighted(
            weights
                .into_iter()
                .map(|(name, weight)| (name.to_string(), weight))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, bool); N]> for Fields {
    fn from(toggles: [(&str, bool); N]) -> Self {
        Self::Weighted(
            toggles
                .into_iter()
                .map(|(name, on)| (name.to_string(), if on { 1.0 } else { 0.0 }))
                .collect(),
        )
    }
}
