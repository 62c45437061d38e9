//! Declarative style document consumed by the rendering engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Style specification version understood by the renderer.
pub const STYLE_VERSION: u8 = 8;

/// Complete style: sources plus an ordered layer list (later paints on top).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    /// Style specification version.
    pub version: u8,
    /// Optional style name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Glyph URL template, needed by symbol layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyphs: Option<String>,
    /// Sources keyed by id.
    pub sources: BTreeMap<String, SourceSpec>,
    /// Layers in paint order.
    pub layers: Vec<LayerSpec>,
}

impl StyleDocument {
    /// Empty style with the supported version.
    pub fn new() -> Self {
        Self {
            version: STYLE_VERSION,
            name: None,
            glyphs: None,
            sources: BTreeMap::new(),
            layers: Vec::new(),
        }
    }

    /// Layer by id.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Index of a layer in paint order.
    pub fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Layer ids in paint order.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }
}

impl Default for StyleDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Tile or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    /// Raster image tiles.
    Raster {
        /// Tile URL templates.
        tiles: Vec<String>,
        /// Tile edge in pixels.
        #[serde(rename = "tileSize")]
        tile_size: u32,
        /// Minimum zoom.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minzoom: Option<u8>,
        /// Maximum zoom with native tiles.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maxzoom: Option<u8>,
        /// HTML attribution.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    /// Vector tiles.
    Vector {
        /// Tile URL templates.
        tiles: Vec<String>,
        /// Minimum zoom.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minzoom: Option<u8>,
        /// Maximum zoom with native tiles.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maxzoom: Option<u8>,
        /// Feature property used as feature id (enables feature-state).
        #[serde(rename = "promoteId", default, skip_serializing_if = "Option::is_none")]
        promote_id: Option<String>,
    },
    /// Inline GeoJSON.
    #[serde(rename = "geojson")]
    GeoJson {
        /// GeoJSON object.
        data: Value,
        /// Feature property used as feature id.
        #[serde(rename = "promoteId", default, skip_serializing_if = "Option::is_none")]
        promote_id: Option<String>,
    },
}

/// Layer rendering primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Solid background.
    Background,
    /// Raster imagery.
    Raster,
    /// Polygon fill.
    Fill,
    /// Lines and outlines.
    Line,
    /// Points as circles.
    Circle,
    /// Labels and icons.
    Symbol,
}

/// One style layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer id.
    pub id: String,
    /// Primitive.
    #[serde(rename = "type")]
    pub kind: LayerType,
    /// Source id (absent for background layers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Layer inside a vector source.
    #[serde(rename = "source-layer", default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Feature filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Minimum zoom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
    /// Layout properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    /// Paint properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
}

impl LayerSpec {
    /// Layer of `kind` drawing from `source`.
    pub fn new(id: impl Into<String>, kind: LayerType, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: Some(source.into()),
            source_layer: None,
            filter: None,
            minzoom: None,
            maxzoom: None,
            layout: Map::new(),
            paint: Map::new(),
        }
    }

    /// Sets the vector source layer.
    pub fn source_layer(mut self, name: impl Into<String>) -> Self {
        self.source_layer = Some(name.into());
        self
    }

    /// Sets the filter expression.
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Adds a layout property.
    pub fn layout(mut self, name: &str, value: Value) -> Self {
        self.layout.insert(name.to_string(), value);
        self
    }

    /// Adds a paint property.
    pub fn paint(mut self, name: &str, value: Value) -> Self {
        self.paint.insert(name.to_string(), value);
        self
    }

    /// Current `visibility` layout value, `visible` when unset.
    pub fn is_visible(&self) -> bool {
        self.layout.get("visibility").and_then(Value::as_str) != Some("none")
    }
}
