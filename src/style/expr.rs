//! Paint and layout expression builders.

use serde_json::{Value, json};

use crate::core::opacity::scaled;

/// Property carrying the location-confidence attribute.
pub const CONFIDENCE_PROPERTY: &str = "ubicazione_confidenza";
/// Sentinel value marking an uncertain location.
pub const UNCERTAIN: &str = "incerta";
/// Property carrying the cultural-context text.
pub const CONTEXT_PROPERTY: &str = "ambito";

/// Share of the nominal opacity kept by uncertain features.
pub const UNCERTAIN_FACTOR: f64 = 0.35;
/// Share of the nominal opacity used by certain site fills.
pub const SITE_FILL_FACTOR: f64 = 0.6;
/// Share of the nominal opacity used by boundary fills.
pub const BOUNDARY_FILL_FACTOR: f64 = 0.3;

/// Neutral color for features matching no cultural context.
pub const NEUTRAL_COLOR: &str = "#8c8c8c";

/// Cultural contexts in match priority order: color plus keywords.
pub const CONTEXT_PALETTE: &[(&str, &[&str])] = &[
    ("#8e44ad", &["cristian", "Cristiano", "christian", "paleocristian"]),
    ("#c0392b", &["roman", "Romano", "romana"]),
    ("#2471a3", &["messap", "Messapico", "messapian"]),
];

/// Feature-state width of the highlight outline when hovered.
pub const HOVER_WIDTH: f64 = 2.5;
/// Feature-state width of the highlight outline when selected.
pub const SELECTED_WIDTH: f64 = 3.0;

/// `visibility` layout value.
pub fn visibility(visible: bool) -> Value {
    Value::from(if visible { "visible" } else { "none" })
}

/// Filter matching one geometry type (`Point`, `Polygon`, ...).
pub fn geometry_is(kind: &str) -> Value {
    json!(["==", ["geometry-type"], kind])
}

/// Test for the uncertain-location sentinel.
pub fn is_uncertain() -> Value {
    json!(["==", ["get", CONFIDENCE_PROPERTY], UNCERTAIN])
}

/// `opacity × certain_factor`, or `opacity × 0.35` for uncertain features.
pub fn uncertainty_opacity(opacity: f64, certain_factor: f64) -> Value {
    json!([
        "case",
        is_uncertain(),
        scaled(opacity, UNCERTAIN_FACTOR),
        scaled(opacity, certain_factor)
    ])
}

/// Lower-cased, de-duplicated keywords; a keyword containing another one of
/// the same context is redundant for substring matching and is dropped.
pub fn context_keywords(raw: &[&str]) -> Vec<String> {
    let mut lowered: Vec<String> = raw.iter().map(|k| k.trim().to_lowercase()).collect();
    lowered.retain(|k| !k.is_empty());
    lowered.sort();
    lowered.dedup();
    let snapshot = lowered.clone();
    lowered.retain(|k| !snapshot.iter().any(|other| other != k && k.contains(other.as_str())));
    lowered
}

/// Categorical color by cultural context; first match wins.
pub fn context_color() -> Value {
    let haystack = json!(["downcase", ["to-string", ["coalesce", ["get", CONTEXT_PROPERTY], ""]]]);
    let mut expr = vec![Value::from("case")];
    for (color, raw) in CONTEXT_PALETTE {
        let tests: Vec<Value> = context_keywords(raw)
            .into_iter()
            .map(|k| json!(["in", k, haystack.clone()]))
            .collect();
        let test = if tests.len() == 1 {
            tests.into_iter().next().unwrap_or(Value::Bool(false))
        } else {
            let mut any = vec![Value::from("any")];
            any.extend(tests);
            Value::Array(any)
        };
        expr.push(test);
        expr.push(Value::from(*color));
    }
    expr.push(Value::from(NEUTRAL_COLOR));
    Value::Array(expr)
}

/// Outline width driven by the `hover` and `selected` feature states.
/// Hover is tested first, so a feature with both flags gets the hover width.
pub fn highlight_width() -> Value {
    json!([
        "case",
        ["boolean", ["feature-state", "hover"], false],
        HOVER_WIDTH,
        ["boolean", ["feature-state", "selected"], false],
        SELECTED_WIDTH,
        0
    ])
}

/// Evaluates a two-branch `case` built by [`uncertainty_opacity`] for a
/// feature with the given confidence value.
pub fn eval_uncertainty_case(expr: &Value, confidence: Option<&str>) -> Option<f64> {
    let items = expr.as_array()?;
    if items.len() != 4 || items[0] != "case" {
        return None;
    }
    let branch = if confidence == Some(UNCERTAIN) { 2 } else { 3 };
    items[branch].as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_deduplicated_case_insensitively() {
        assert_eq!(
            context_keywords(&["cristian", "Cristiano", "christian", "paleocristian"]),
            vec!["christian".to_string(), "cristian".to_string()]
        );
        assert_eq!(context_keywords(&["roman", "Romano", "romana"]), vec!["roman".to_string()]);
    }

    #[test]
    fn color_case_keeps_priority_order() {
        let expr = context_color();
        let items = expr.as_array().expect("case");
        assert_eq!(items[0], "case");
        assert_eq!(items[2], "#8e44ad");
        assert_eq!(items[4], "#c0392b");
        assert_eq!(items[6], "#2471a3");
        assert_eq!(items[7], NEUTRAL_COLOR);
    }

    #[test]
    fn uncertainty_case_evaluates_both_branches() {
        let expr = uncertainty_opacity(0.8, SITE_FILL_FACTOR);
        assert_eq!(eval_uncertainty_case(&expr, Some("incerta")), Some(0.28));
        assert_eq!(eval_uncertainty_case(&expr, Some("certa")), Some(0.48));
        assert_eq!(eval_uncertainty_case(&expr, None), Some(0.48));
    }
}
