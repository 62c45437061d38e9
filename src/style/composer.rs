//! Pure style composition from filters and fixed-layer controls.

use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    core::{
        filters::MapFilters,
        opacity::{LayerOpacity, LayerVisibility, scaled},
    },
    query::tile_url_template,
    types::DataLayer,
};

use super::{
    document::{LayerSpec, LayerType, STYLE_VERSION, SourceSpec, StyleDocument},
    expr,
};

/// Source and layer id of the always-present reference raster.
pub const BASE_REFERENCE_ID: &str = "base-reference";
/// Tiles of the reference raster and of the fallback style.
pub const BASE_REFERENCE_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
/// Attribution of the reference raster.
pub const BASE_REFERENCE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
/// Glyph endpoint for label layers added at runtime.
pub const DEFAULT_GLYPHS: &str = "https://demotiles.maplibre.org/font/{fontstack}/{range}.pbf";

/// Layer id for a data layer part (`sites-fill`, `province-line`, ...).
pub fn data_layer_id(layer: DataLayer, part: &str) -> String {
    format!("{}-{part}", layer.name())
}

/// Everything the composer reads.
#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    /// Backend base URL of the tile endpoint.
    pub tiles_base: &'a str,
    /// Active attribute filters.
    pub filters: &'a MapFilters,
    /// Fixed-layer visibility.
    pub visibility: LayerVisibility,
    /// Fixed-layer opacity.
    pub opacity: LayerOpacity,
}

/// Why a style document cannot be handed to the renderer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StyleIssue {
    /// Version absent or not understood.
    #[error("unsupported style version {0:?}")]
    Version(Option<u64>),
    /// No sources.
    #[error("style has no sources")]
    NoSources,
    /// No layers.
    #[error("style has no layers")]
    NoLayers,
    /// Two layers share an id.
    #[error("duplicate layer id {0}")]
    DuplicateLayer(String),
    /// A layer names a source that does not exist.
    #[error("layer {layer} references missing source {source_id}")]
    MissingSource {
        /// Offending layer.
        layer: String,
        /// Source it names.
        source_id: String,
    },
    /// The document does not deserialize.
    #[error("malformed style: {0}")]
    Malformed(String),
}

/// Composes the full style; falls back to [`fallback_style`] if the result
/// would not validate.
pub fn compose_style(input: &ComposeInput<'_>) -> StyleDocument {
    guard(build(input))
}

/// Returns `doc` if valid, the fallback otherwise.
pub fn guard(doc: StyleDocument) -> StyleDocument {
    match validate(&doc) {
        Ok(()) => doc,
        Err(issue) => {
            tracing::warn!(%issue, "style failed validation, using fallback");
            fallback_style()
        }
    }
}

/// Structural checks required before a style reaches the renderer.
pub fn validate(doc: &StyleDocument) -> Result<(), StyleIssue> {
    if doc.version != STYLE_VERSION {
        return Err(StyleIssue::Version(Some(u64::from(doc.version))));
    }
    if doc.sources.is_empty() {
        return Err(StyleIssue::NoSources);
    }
    if doc.layers.is_empty() {
        return Err(StyleIssue::NoLayers);
    }
    let mut seen = std::collections::BTreeSet::new();
    for layer in &doc.layers {
        if !seen.insert(layer.id.as_str()) {
            return Err(StyleIssue::DuplicateLayer(layer.id.clone()));
        }
        if let Some(source) = &layer.source {
            if !doc.sources.contains_key(source) {
                return Err(StyleIssue::MissingSource {
                    layer: layer.id.clone(),
                    source_id: source.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Checks an untyped document, e.g. one loaded from disk.
pub fn validate_value(value: &Value) -> Result<StyleDocument, StyleIssue> {
    match value.get("version").and_then(Value::as_u64) {
        Some(v) if v == u64::from(STYLE_VERSION) => {}
        other => return Err(StyleIssue::Version(other)),
    }
    if value.get("sources").and_then(Value::as_object).is_none_or(|s| s.is_empty()) {
        return Err(StyleIssue::NoSources);
    }
    if value.get("layers").and_then(Value::as_array).is_none_or(|l| l.is_empty()) {
        return Err(StyleIssue::NoLayers);
    }
    let doc: StyleDocument =
        serde_json::from_value(value.clone()).map_err(|err| StyleIssue::Malformed(err.to_string()))?;
    validate(&doc)?;
    Ok(doc)
}

/// Typed document for `value`, or the fallback when it is not renderable.
pub fn ensure_renderable(value: &Value) -> StyleDocument {
    match validate_value(value) {
        Ok(doc) => doc,
        Err(issue) => {
            tracing::warn!(%issue, "style failed validation, using fallback");
            fallback_style()
        }
    }
}

/// Minimal valid style: one raster source and one raster layer.
pub fn fallback_style() -> StyleDocument {
    let mut doc = StyleDocument::new();
    doc.name = Some("fallback".to_string());
    doc.sources.insert(BASE_REFERENCE_ID.to_string(), reference_source());
    doc.layers.push(LayerSpec::new(BASE_REFERENCE_ID, LayerType::Raster, BASE_REFERENCE_ID));
    doc
}

fn reference_source() -> SourceSpec {
    SourceSpec::Raster {
        tiles: vec![BASE_REFERENCE_TILES.to_string()],
        tile_size: 256,
        minzoom: Some(0),
        maxzoom: Some(19),
        attribution: Some(BASE_REFERENCE_ATTRIBUTION.to_string()),
    }
}

fn build(input: &ComposeInput<'_>) -> StyleDocument {
    let mut doc = StyleDocument::new();
    doc.name = Some("archeomap".to_string());
    doc.glyphs = Some(DEFAULT_GLYPHS.to_string());

    doc.sources.insert(BASE_REFERENCE_ID.to_string(), reference_source());
    doc.layers.push(
        LayerSpec::new(BASE_REFERENCE_ID, LayerType::Raster, BASE_REFERENCE_ID)
            .layout("visibility", expr::visibility(true)),
    );

    for layer in DataLayer::ALL {
        let url = tile_url_template(input.tiles_base, layer, input.filters);
        doc.sources.insert(
            layer.name().to_string(),
            SourceSpec::Vector {
                tiles: vec![url],
                minzoom: Some(0),
                maxzoom: Some(14),
                promote_id: Some("id".to_string()),
            },
        );
        let visible = input.visibility.get(layer);
        let opacity = input.opacity.get(layer);
        let layers = match layer {
            DataLayer::Sites => site_layers(opacity),
            DataLayer::Province | DataLayer::Comuni => boundary_layers(layer, opacity),
        };
        doc.layers.extend(
            layers
                .into_iter()
                .map(|l| l.source_layer(layer.name()).layout("visibility", expr::visibility(visible))),
        );
    }
    doc
}

fn boundary_layers(layer: DataLayer, opacity: f64) -> Vec<LayerSpec> {
    let (fill, line) = match layer {
        DataLayer::Province => ("#f4d03f", "#7d6608"),
        _ => ("#aed6f1", "#1b4f72"),
    };
    let source = layer.name();
    vec![
        LayerSpec::new(data_layer_id(layer, "fill"), LayerType::Fill, source)
            .paint("fill-color", json!(fill))
            .paint("fill-opacity", json!(scaled(opacity, expr::BOUNDARY_FILL_FACTOR))),
        LayerSpec::new(data_layer_id(layer, "line"), LayerType::Line, source)
            .paint("line-color", json!(line))
            .paint("line-width", json!(1.0))
            .paint("line-opacity", json!(scaled(opacity, 1.0))),
    ]
}

fn site_layers(opacity: f64) -> Vec<LayerSpec> {
    let source = DataLayer::Sites.name();
    let polygons = expr::geometry_is("Polygon");
    vec![
        LayerSpec::new(data_layer_id(DataLayer::Sites, "fill"), LayerType::Fill, source)
            .filter(polygons.clone())
            .paint("fill-color", expr::context_color())
            .paint("fill-opacity", expr::uncertainty_opacity(opacity, expr::SITE_FILL_FACTOR)),
        LayerSpec::new(data_layer_id(DataLayer::Sites, "outline"), LayerType::Line, source)
            .filter(polygons.clone())
            .paint("line-color", expr::context_color())
            .paint("line-width", json!(1.2))
            .paint("line-opacity", json!(opacity)),
        LayerSpec::new(data_layer_id(DataLayer::Sites, "circle"), LayerType::Circle, source)
            .filter(expr::geometry_is("Point"))
            .paint("circle-color", expr::context_color())
            .paint("circle-radius", json!(6))
            .paint("circle-stroke-color", json!("#ffffff"))
            .paint("circle-stroke-width", json!(1))
            .paint("circle-opacity", expr::uncertainty_opacity(opacity, 1.0)),
        LayerSpec::new(data_layer_id(DataLayer::Sites, "highlight"), LayerType::Line, source)
            .filter(polygons)
            .paint("line-color", json!("#f39c12"))
            .paint("line-width", expr::highlight_width()),
    ]
}
