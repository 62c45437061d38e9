//! Point-of-interest source and layers, re-asserted after style changes.

use serde_json::{Value, json};

use crate::style::{LayerSpec, LayerType, SourceSpec};

use super::traits::{MapRenderer, RenderError};

/// GeoJSON source id.
pub const POI_SOURCE: &str = "poi";
/// Circle layer id.
pub const POI_CIRCLES: &str = "poi-circles";
/// Label layer id.
pub const POI_LABELS: &str = "poi-labels";
/// POI layers, bottom first.
pub const POI_LAYERS: [&str; 2] = [POI_CIRCLES, POI_LABELS];

/// Empty `FeatureCollection`.
pub fn empty_collection() -> Value {
    json!({"type": "FeatureCollection", "features": []})
}

fn is_poi_layer(id: &str) -> bool {
    POI_LAYERS.contains(&id)
}

/// First symbol layer that is not a POI layer; POI layers go right below it.
fn label_anchor(map: &dyn MapRenderer) -> Option<String> {
    map.layer_stack()
        .into_iter()
        .find(|l| l.kind == LayerType::Symbol && !is_poi_layer(&l.id))
        .map(|l| l.id)
}

/// Creates the POI source if absent, otherwise replaces its data.
/// Returns true when the source was created.
pub fn ensure_poi_source(map: &mut dyn MapRenderer, data: Value) -> Result<bool, RenderError> {
    if map.has_source(POI_SOURCE) {
        map.set_geojson_data(POI_SOURCE, data)?;
        return Ok(false);
    }
    map.add_source(
        POI_SOURCE,
        SourceSpec::GeoJson {
            data,
            promote_id: Some("id".to_string()),
        },
    )?;
    Ok(true)
}

/// Creates whichever POI layer is missing. Returns how many were created.
pub fn ensure_poi_layers(map: &mut dyn MapRenderer) -> Result<usize, RenderError> {
    let mut created = 0;
    let anchor = label_anchor(map);
    if !map.has_layer(POI_CIRCLES) {
        let before = if map.has_layer(POI_LABELS) {
            Some(POI_LABELS.to_string())
        } else {
            anchor.clone()
        };
        map.add_layer(circle_layer(), before.as_deref())?;
        created += 1;
    }
    if !map.has_layer(POI_LABELS) {
        map.add_layer(label_layer(), anchor.as_deref())?;
        created += 1;
    }
    Ok(created)
}

/// Moves the POI layers to the end of the draw order, circles below labels.
/// Returns false, without touching the map, when they already are.
pub fn bring_poi_to_top(map: &mut dyn MapRenderer) -> Result<bool, RenderError> {
    let present: Vec<&str> = POI_LAYERS.into_iter().filter(|id| map.has_layer(id)).collect();
    let stack = map.layer_stack();
    let tail = stack.len().saturating_sub(present.len());
    if stack[tail..].iter().map(|l| l.id.as_str()).eq(present.iter().copied()) {
        return Ok(false);
    }
    for id in present {
        map.move_layer(id, None)?;
    }
    Ok(true)
}

fn circle_layer() -> LayerSpec {
    let hover = json!(["boolean", ["feature-state", "hover"], false]);
    let selected = json!(["boolean", ["feature-state", "selected"], false]);
    LayerSpec::new(POI_CIRCLES, LayerType::Circle, POI_SOURCE)
        .paint("circle-color", json!("#e67e22"))
        .paint("circle-radius", json!(["case", hover.clone(), 9, selected.clone(), 10, 7]))
        .paint("circle-stroke-color", json!("#ffffff"))
        .paint("circle-stroke-width", json!(["case", hover, 2.5, selected, 3.0, 1.5]))
}

fn label_layer() -> LayerSpec {
    LayerSpec::new(POI_LABELS, LayerType::Symbol, POI_SOURCE)
        .layout("text-field", json!(["get", "name"]))
        .layout("text-font", json!(["Open Sans Regular"]))
        .layout("text-size", json!(12))
        .layout("text-offset", json!([0, 1.2]))
        .layout("text-anchor", json!("top"))
        .paint("text-color", json!("#333333"))
        .paint("text-halo-color", json!("#ffffff"))
        .paint("text-halo-width", json!(1.2))
}

/// Owns the last POI data so the layers can be rebuilt after a style reset.
#[derive(Debug, Clone)]
pub struct PoiOverlay {
    data: Value,
}

impl Default for PoiOverlay {
    fn default() -> Self {
        Self {
            data: empty_collection(),
        }
    }
}

impl PoiOverlay {
    /// Overlay with no points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last data handed to the map.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// True when the source and both layers are on the map.
    pub fn is_present(map: &dyn MapRenderer) -> bool {
        map.has_source(POI_SOURCE) && POI_LAYERS.iter().all(|id| map.has_layer(id))
    }

    /// Replaces the POI data and makes sure source and layers exist.
    pub fn set_data(&mut self, map: &mut dyn MapRenderer, data: Value) {
        self.data = data;
        if let Err(err) = self.ensure(map) {
            tracing::warn!(error = %err, "failed to update poi layers");
        }
    }

    /// `styledata` handler. Returns true when something had to be rebuilt;
    /// an already-complete overlay is left untouched.
    pub fn on_style_data(&self, map: &mut dyn MapRenderer) -> bool {
        if Self::is_present(map) {
            return false;
        }
        match self.ensure(map) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to restore poi layers");
                false
            }
        }
    }

    fn ensure(&self, map: &mut dyn MapRenderer) -> Result<(), RenderError> {
        ensure_poi_source(map, self.data.clone())?;
        let created = ensure_poi_layers(map)?;
        if created > 0 {
            tracing::debug!(created, "poi layers created");
        }
        Ok(())
    }
}
