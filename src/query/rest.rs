//! Geometry REST query: per-category array overlap, AND across categories.

use url::Url;

use crate::core::filters::MapFilters;

/// Default row limit of a geometry query.
pub const DEFAULT_LIMIT: usize = 1000;

/// `(column, "ov.{...}")` conditions, one per non-empty category.
pub fn overlap_conditions(filters: &MapFilters) -> Vec<(String, String)> {
    filters
        .active()
        .map(|(category, terms)| {
            let items: Vec<String> = terms.iter().map(|t| array_item(t)).collect();
            (category.field_name().to_string(), format!("ov.{{{}}}", items.join(",")))
        })
        .collect()
}

/// Quotes an array literal element when it contains syntax characters.
fn array_item(term: &str) -> String {
    if term.chars().any(|c| matches!(c, '{' | '}' | '"' | '\\' | ' ' | ',')) {
        let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        term.to_string()
    }
}

/// `GET /rest/<table>?select=*&<conditions>&limit=N`.
#[derive(Debug, Clone, PartialEq)]
pub struct RestQuery {
    /// Table or view name.
    pub table: String,
    /// Column selection.
    pub select: String,
    /// Overlap conditions.
    pub conditions: Vec<(String, String)>,
    /// Row limit.
    pub limit: usize,
}

impl RestQuery {
    /// Query over `table` constrained by `filters`.
    pub fn new(table: impl Into<String>, filters: &MapFilters) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            conditions: overlap_conditions(filters),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Ordered query pairs.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.conditions.iter().cloned());
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }

    /// Absolute URL below `base` (`{base}/rest/<table>?...`).
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let root = base.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{root}/rest/{}", self.table))?;
        url.query_pairs_mut().extend_pairs(self.pairs());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::filters::FilterCategory;

    use super::*;

    #[test]
    fn quotes_elements_with_syntax_characters() {
        assert_eq!(array_item("c1"), "c1");
        assert_eq!(array_item("età del ferro"), "\"età del ferro\"");
        assert_eq!(array_item("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn url_round_trips_conditions() {
        let filters = MapFilters::new()
            .with(FilterCategory::Cronologie, ["c1", "c2"])
            .with(FilterCategory::Indicatori, ["i9"]);
        let base = Url::parse("https://db.test").expect("url");
        let url = RestQuery::new("siti", &filters).limit(50).url(&base).expect("rest url");
        assert_eq!(url.path(), "/rest/siti");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("cronologie".to_string(), "ov.{c1,c2}".to_string()),
                ("indicatori".to_string(), "ov.{i9}".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }
}
