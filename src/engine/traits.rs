use serde_json::Value;
use thiserror::Error;

use crate::style::{LayerSpec, LayerType, SourceSpec, StyleDocument};

/// Failure reported by the rendering engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Adding a source whose id is taken.
    #[error("source {0} already exists")]
    SourceExists(String),
    /// Referencing a source that is not on the map.
    #[error("source {0} does not exist")]
    SourceMissing(String),
    /// Removing a source some layer still draws from.
    #[error("source {source_id} is still used by layer {layer}")]
    SourceInUse {
        /// Source being removed.
        source_id: String,
        /// First layer using it.
        layer: String,
    },
    /// Adding a layer whose id is taken.
    #[error("layer {0} already exists")]
    LayerExists(String),
    /// Referencing a layer that is not on the map.
    #[error("layer {0} does not exist")]
    LayerMissing(String),
    /// Replacing data of a non-GeoJSON source.
    #[error("source {0} is not a geojson source")]
    NotGeoJson(String),
    /// Any other engine failure.
    #[error("renderer: {0}")]
    Engine(String),
}

/// Position of one layer in the live draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    /// Layer id.
    pub id: String,
    /// Primitive.
    pub kind: LayerType,
    /// Source id, if any.
    pub source: Option<String>,
}

/// Imperative capability of a live map. Layers listed later paint on top;
/// `before` inserts or moves below the named layer, `None` means on top.
pub trait MapRenderer: Send {
    /// True when source `id` exists.
    fn has_source(&self, id: &str) -> bool;
    /// Adds a source; fails if the id is taken.
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), RenderError>;
    /// Removes a source no layer uses.
    fn remove_source(&mut self, id: &str) -> Result<(), RenderError>;
    /// Replaces the data of a GeoJSON source.
    fn set_geojson_data(&mut self, id: &str, data: Value) -> Result<(), RenderError>;

    /// True when layer `id` exists.
    fn has_layer(&self, id: &str) -> bool;
    /// Adds a layer below `before`, or on top.
    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), RenderError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), RenderError>;
    /// Moves a layer below `before`, or to the top.
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), RenderError>;

    /// Sets one paint property.
    fn set_paint_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), RenderError>;
    /// Sets one layout property.
    fn set_layout_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), RenderError>;

    /// Current layers, bottom first.
    fn layer_stack(&self) -> Vec<LayerRef>;

    /// Replaces the whole style; runtime additions are dropped.
    fn set_style(&mut self, style: StyleDocument) -> Result<(), RenderError>;
}
