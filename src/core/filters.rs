//! Vocabulary-controlled attribute filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::TermId;

/// One of the four filterable vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    /// Site definitions (typology).
    Definizioni,
    /// Chronological periods.
    Cronologie,
    /// Archaeological indicators.
    Indicatori,
    /// Cultural contexts.
    Ambiti,
}

impl FilterCategory {
    /// Every category, in serialization order.
    pub const ALL: [FilterCategory; 4] = [
        FilterCategory::Definizioni,
        FilterCategory::Cronologie,
        FilterCategory::Indicatori,
        FilterCategory::Ambiti,
    ];

    /// Attribute/column name, also the tile query key.
    pub fn field_name(self) -> &'static str {
        match self {
            FilterCategory::Definizioni => "definizioni",
            FilterCategory::Cronologie => "cronologie",
            FilterCategory::Indicatori => "indicatori",
            FilterCategory::Ambiti => "ambiti",
        }
    }

    /// Short key used in view URLs.
    pub fn url_key(self) -> &'static str {
        match self {
            FilterCategory::Definizioni => "defs",
            FilterCategory::Cronologie => "cron",
            FilterCategory::Indicatori => "ind",
            FilterCategory::Ambiti => "amb",
        }
    }

    /// Inverse of [`FilterCategory::url_key`].
    pub fn from_url_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.url_key() == key)
    }

    /// Inverse of [`FilterCategory::field_name`].
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.field_name() == name)
    }
}

/// Accepts a term id if it is non-blank and free of list separators.
pub fn clean_term(raw: &str) -> Option<TermId> {
    let term = raw.trim();
    (!term.is_empty() && !term.contains(',')).then(|| term.to_string())
}

/// Four independent term sets. Empty sets never survive a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapFilters {
    /// Selected definition ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definizioni: Option<BTreeSet<TermId>>,
    /// Selected chronology ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cronologie: Option<BTreeSet<TermId>>,
    /// Selected indicator ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicatori: Option<BTreeSet<TermId>>,
    /// Selected cultural-context ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiti: Option<BTreeSet<TermId>>,
}

impl MapFilters {
    /// Empty filter set (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replaces `category` with `terms`.
    pub fn with<I, S>(mut self, category: FilterCategory, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(category, terms);
        self
    }

    /// Selected terms of `category`; `None` when unconstrained.
    pub fn get(&self, category: FilterCategory) -> Option<&BTreeSet<TermId>> {
        match category {
            FilterCategory::Definizioni => self.definizioni.as_ref(),
            FilterCategory::Cronologie => self.cronologie.as_ref(),
            FilterCategory::Indicatori => self.indicatori.as_ref(),
            FilterCategory::Ambiti => self.ambiti.as_ref(),
        }
    }

    fn slot(&mut self, category: FilterCategory) -> &mut Option<BTreeSet<TermId>> {
        match category {
            FilterCategory::Definizioni => &mut self.definizioni,
            FilterCategory::Cronologie => &mut self.cronologie,
            FilterCategory::Indicatori => &mut self.indicatori,
            FilterCategory::Ambiti => &mut self.ambiti,
        }
    }

    /// Adds `term` if absent, removes it otherwise. Returns true if now selected.
    pub fn toggle(&mut self, category: FilterCategory, term: &str) -> bool {
        let Some(term) = clean_term(term) else {
            return false;
        };
        let set = self.slot(category).get_or_insert_with(BTreeSet::new);
        let selected = if set.remove(&term) {
            false
        } else {
            set.insert(term);
            true
        };
        self.normalize();
        selected
    }

    /// Replaces the terms of `category`; invalid ids are dropped.
    pub fn set<I, S>(&mut self, category: FilterCategory, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<TermId> = terms
            .into_iter()
            .filter_map(|t| clean_term(t.as_ref()))
            .collect();
        *self.slot(category) = Some(set);
        self.normalize();
    }

    /// Removes every constraint on `category`.
    pub fn clear(&mut self, category: FilterCategory) {
        *self.slot(category) = None;
    }

    /// Removes every constraint.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    /// True when no category constrains the result.
    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Drops categories whose set is empty.
    pub fn normalize(&mut self) {
        for category in FilterCategory::ALL {
            let slot = self.slot(category);
            if slot.as_ref().is_some_and(BTreeSet::is_empty) {
                *slot = None;
            }
        }
    }

    /// Non-empty categories with their terms, in [`FilterCategory::ALL`] order.
    pub fn active(&self) -> impl Iterator<Item = (FilterCategory, &BTreeSet<TermId>)> {
        FilterCategory::ALL
            .into_iter()
            .filter_map(|c| self.get(c).filter(|s| !s.is_empty()).map(|s| (c, s)))
    }

    /// Builds filters from loosely-typed JSON, keeping only string (or
    /// numeric) ids under the four known keys.
    pub fn from_json(value: &Value) -> Self {
        let mut out = Self::default();
        let Some(obj) = value.as_object() else {
            return out;
        };
        for category in FilterCategory::ALL {
            let Some(items) = obj.get(category.field_name()).and_then(Value::as_array) else {
                continue;
            };
            let terms = items.iter().filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            out.set(category, terms);
        }
        out
    }
}

impl<'de> Deserialize<'de> for MapFilters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn toggling_last_term_removes_category() {
        let mut filters = MapFilters::new();
        assert!(filters.toggle(FilterCategory::Cronologie, "c1"));
        assert!(!filters.toggle(FilterCategory::Cronologie, "c1"));
        assert_eq!(filters.cronologie, None);
        assert_eq!(serde_json::to_value(&filters).expect("json"), json!({}));
    }

    #[test]
    fn json_boundary_drops_garbage() {
        let filters = MapFilters::from_json(&json!({
            "cronologie": ["c1", 7, null, " ", "a,b"],
            "ambiti": [],
            "unknown": ["x"],
            "indicatori": "not-an-array"
        }));
        assert_eq!(
            filters,
            MapFilters::new().with(FilterCategory::Cronologie, ["c1", "7"])
        );
    }
}
