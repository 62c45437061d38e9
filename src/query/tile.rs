//! Tile endpoint URL templates carrying the filter state.

use url::form_urlencoded;

use crate::{core::filters::MapFilters, types::DataLayer};

/// Path of the vector tile endpoint below the backend base URL.
pub const TILE_PATH: &str = "tiles/{z}/{x}/{y}.mvt";

/// `category=id1,id2` pairs joined with `&`, one per non-empty category,
/// in a fixed category order. Empty when nothing is filtered.
pub fn tile_query(filters: &MapFilters) -> String {
    filters
        .active()
        .map(|(category, terms)| {
            let ids: Vec<String> = terms.iter().map(|t| escape(t)).collect();
            format!("{}={}", category.field_name(), ids.join(","))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `{base}/tiles/{z}/{x}/{y}.mvt?layer=<name>[&filters]`. The `{z}/{x}/{y}`
/// placeholders are left for the renderer to fill.
pub fn tile_url_template(base: &str, layer: DataLayer, filters: &MapFilters) -> String {
    let mut url = format!("{}/{TILE_PATH}?layer={}", base.trim_end_matches('/'), layer.name());
    let query = tile_query(filters);
    if !query.is_empty() {
        url.push('&');
        url.push_str(&query);
    }
    url
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use crate::core::filters::FilterCategory;

    use super::*;

    #[test]
    fn unfiltered_template_has_only_layer() {
        let url = tile_url_template("https://api.test/functions/v1/", DataLayer::Comuni, &MapFilters::new());
        assert_eq!(url, "https://api.test/functions/v1/tiles/{z}/{x}/{y}.mvt?layer=comuni");
    }

    #[test]
    fn categories_follow_fixed_order() {
        let filters = MapFilters::new()
            .with(FilterCategory::Ambiti, ["a 1"])
            .with(FilterCategory::Definizioni, ["d2", "d1"]);
        assert_eq!(tile_query(&filters), "definizioni=d1,d2&ambiti=a+1");
    }
}
