//! Headless renderer that keeps the live style in memory.

use serde_json::Value;

use crate::style::{LayerSpec, SourceSpec, StyleDocument};

use super::traits::{LayerRef, MapRenderer, RenderError};

/// In-memory [`MapRenderer`]. Counts `styledata` events (every structural
/// change) and can be switched into a failing mode.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMap {
    style: StyleDocument,
    style_events: u64,
    failing: bool,
}

impl InMemoryMap {
    /// Map showing `style`.
    pub fn new(style: StyleDocument) -> Self {
        Self {
            style,
            style_events: 1,
            failing: false,
        }
    }

    /// Current style, including runtime additions.
    pub fn style(&self) -> &StyleDocument {
        &self.style
    }

    /// Layer by id.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.style.layer(id)
    }

    /// Source by id.
    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.style.sources.get(id)
    }

    /// Paint property of a layer.
    pub fn paint(&self, layer: &str, name: &str) -> Option<&Value> {
        self.layer(layer).and_then(|l| l.paint.get(name))
    }

    /// Layer ids in draw order.
    pub fn layer_ids(&self) -> Vec<String> {
        self.style.layers.iter().map(|l| l.id.clone()).collect()
    }

    /// Number of `styledata` events fired so far.
    pub fn style_events(&self) -> u64 {
        self.style_events
    }

    /// Makes every mutating call fail with [`RenderError::Engine`].
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    fn check(&self) -> Result<(), RenderError> {
        if self.failing {
            return Err(RenderError::Engine("renderer unavailable".to_string()));
        }
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize, RenderError> {
        self.style
            .layer_index(id)
            .ok_or_else(|| RenderError::LayerMissing(id.to_string()))
    }

    fn insert_position(&self, before: Option<&str>) -> Result<usize, RenderError> {
        match before {
            Some(id) => self.index_of(id),
            None => Ok(self.style.layers.len()),
        }
    }

    fn changed(&mut self) {
        self.style_events += 1;
    }
}

impl MapRenderer for InMemoryMap {
    fn has_source(&self, id: &str) -> bool {
        self.style.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), RenderError> {
        self.check()?;
        if self.has_source(id) {
            return Err(RenderError::SourceExists(id.to_string()));
        }
        self.style.sources.insert(id.to_string(), spec);
        self.changed();
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), RenderError> {
        self.check()?;
        if !self.has_source(id) {
            return Err(RenderError::SourceMissing(id.to_string()));
        }
        if let Some(layer) = self.style.layers.iter().find(|l| l.source.as_deref() == Some(id)) {
            return Err(RenderError::SourceInUse {
                source_id: id.to_string(),
                layer: layer.id.clone(),
            });
        }
        self.style.sources.remove(id);
        self.changed();
        Ok(())
    }

    fn set_geojson_data(&mut self, id: &str, data: Value) -> Result<(), RenderError> {
        self.check()?;
        match self.style.sources.get_mut(id) {
            Some(SourceSpec::GeoJson { data: current, .. }) => {
                *current = data;
                Ok(())
            }
            Some(_) => Err(RenderError::NotGeoJson(id.to_string())),
            None => Err(RenderError::SourceMissing(id.to_string())),
        }
    }

    fn has_layer(&self, id: &str) -> bool {
        self.style.layer_index(id).is_some()
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), RenderError> {
        self.check()?;
        if self.has_layer(&layer.id) {
            return Err(RenderError::LayerExists(layer.id));
        }
        if let Some(source) = &layer.source {
            if !self.has_source(source) {
                return Err(RenderError::SourceMissing(source.clone()));
            }
        }
        let at = self.insert_position(before)?;
        self.style.layers.insert(at, layer);
        self.changed();
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), RenderError> {
        self.check()?;
        let at = self.index_of(id)?;
        self.style.layers.remove(at);
        self.changed();
        Ok(())
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), RenderError> {
        self.check()?;
        if before == Some(id) {
            return Ok(());
        }
        let from = self.index_of(id)?;
        if let Some(target) = before {
            self.index_of(target)?;
        }
        let layer = self.style.layers.remove(from);
        let at = self.insert_position(before)?;
        self.style.layers.insert(at, layer);
        self.changed();
        Ok(())
    }

    fn set_paint_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), RenderError> {
        self.check()?;
        let at = self.index_of(layer)?;
        self.style.layers[at].paint.insert(name.to_string(), value);
        Ok(())
    }

    fn set_layout_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), RenderError> {
        self.check()?;
        let at = self.index_of(layer)?;
        self.style.layers[at].layout.insert(name.to_string(), value);
        Ok(())
    }

    fn layer_stack(&self) -> Vec<LayerRef> {
        self.style
            .layers
            .iter()
            .map(|l| LayerRef {
                id: l.id.clone(),
                kind: l.kind,
                source: l.source.clone(),
            })
            .collect()
    }

    fn set_style(&mut self, style: StyleDocument) -> Result<(), RenderError> {
        self.check()?;
        self.style = style;
        self.changed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::style::{LayerType, fallback_style};

    use super::*;

    #[test]
    fn source_in_use_cannot_be_removed() {
        let mut map = InMemoryMap::new(fallback_style());
        let err = map.remove_source("base-reference").expect_err("in use");
        assert!(matches!(err, RenderError::SourceInUse { .. }));
    }

    #[test]
    fn move_layer_below_target() {
        let mut map = InMemoryMap::new(fallback_style());
        map.add_layer(LayerSpec::new("a", LayerType::Raster, "base-reference"), None)
            .expect("add a");
        map.add_layer(LayerSpec::new("b", LayerType::Raster, "base-reference"), None)
            .expect("add b");
        map.move_layer("b", Some("a")).expect("move");
        assert_eq!(map.layer_ids(), vec!["base-reference", "b", "a"]);
        map.move_layer("base-reference", None).expect("move to top");
        assert_eq!(map.layer_ids(), vec!["b", "a", "base-reference"]);
    }
}
