//! Basemap and overlay swapping on a live map.
//!
//! Providers are materialized as a raster source `src-{id}` plus a raster
//! layer `lyr-{id}`. Renderer failures are logged and absorbed here; no
//! operation returns an error.

use std::sync::Arc;

use crate::{
    core::{
        opacity::{self, DEFAULT_PROVIDER_OPACITY},
        state::LayerState,
    },
    providers::{ProviderRegistry, TileProvider},
    style::{LayerSpec, LayerType, SourceSpec},
    types::{ProviderId, ProviderKind, TileFormat},
};

use super::{
    poi,
    traits::{MapRenderer, RenderError},
};

const SOURCE_PREFIX: &str = "src-";
const LAYER_PREFIX: &str = "lyr-";

/// Source id of a materialized provider.
pub fn provider_source_id(id: &str) -> String {
    format!("{SOURCE_PREFIX}{id}")
}

/// Layer id of a materialized provider.
pub fn provider_layer_id(id: &str) -> String {
    format!("{LAYER_PREFIX}{id}")
}

/// Provider id behind a `lyr-{id}` layer.
pub fn provider_of_layer(layer_id: &str) -> Option<&str> {
    layer_id.strip_prefix(LAYER_PREFIX)
}

/// Result of [`LayerMutator::set_basemap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasemapOutcome {
    /// The basemap is now the only materialized one.
    Applied,
    /// Unknown, disabled, not a basemap, or unsupported format; map untouched.
    Rejected,
    /// The renderer failed midway; the error was logged.
    Failed,
}

fn absorb(result: Result<(), RenderError>, action: &str, id: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%action, provider = %id, error = %err, "renderer call failed");
            false
        }
    }
}

/// Applies provider changes through a [`MapRenderer`].
#[derive(Debug, Clone)]
pub struct LayerMutator {
    registry: Arc<ProviderRegistry>,
}

impl LayerMutator {
    /// Mutator validating against `registry`.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Registry in use.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Providers of `kind` currently on the map, bottom first.
    pub fn materialized(&self, map: &dyn MapRenderer, kind: ProviderKind) -> Vec<ProviderId> {
        map.layer_stack()
            .into_iter()
            .filter_map(|l| provider_of_layer(&l.id).map(str::to_string))
            .filter(|id| self.registry.lookup(id).is_some_and(|p| p.kind == kind))
            .collect()
    }

    /// Makes `id` the only basemap. Invalid ids leave the map untouched.
    pub fn set_basemap(&self, map: &mut dyn MapRenderer, id: &str, opacity: f64) -> BasemapOutcome {
        let Some(provider) = self.usable(id, ProviderKind::Basemap) else {
            tracing::debug!(provider = %id, "basemap rejected");
            return BasemapOutcome::Rejected;
        };

        let mut ok = true;
        let mut swapped = false;
        for other in self.materialized(map, ProviderKind::Basemap) {
            if other != id {
                ok &= self.dematerialize(map, &other);
                swapped = true;
            }
        }

        let layer_id = provider_layer_id(id);
        if map.has_layer(&layer_id) {
            ok &= self.update_opacity(map, id, opacity);
        } else {
            let anchor = self.basemap_anchor(map);
            ok &= self.materialize(map, provider, opacity, anchor.as_deref());
            swapped = true;
        }

        if swapped {
            ok &= absorb(poi::bring_poi_to_top(map).map(|_| ()), "raise poi", id);
        }
        tracing::debug!(provider = %id, ok, "basemap set");
        if ok {
            BasemapOutcome::Applied
        } else {
            BasemapOutcome::Failed
        }
    }

    /// [`LayerMutator::set_basemap`], falling back to the registry default
    /// when `id` is rejected.
    pub fn set_basemap_or_default(&self, map: &mut dyn MapRenderer, id: &str, opacity: f64) -> BasemapOutcome {
        match self.set_basemap(map, id, opacity) {
            BasemapOutcome::Rejected => {
                let fallback = self.registry.default_basemap().to_string();
                self.set_basemap(map, &fallback, DEFAULT_PROVIDER_OPACITY)
            }
            outcome => outcome,
        }
    }

    /// Flips overlay `id`, or forces it to `enable`. Returns whether the
    /// overlay is on the map afterwards.
    pub fn toggle_overlay(&self, map: &mut dyn MapRenderer, id: &str, enable: Option<bool>, opacity: f64) -> bool {
        let layer_id = provider_layer_id(id);
        let present = map.has_layer(&layer_id);
        let Some(provider) = self.usable(id, ProviderKind::Overlay) else {
            tracing::debug!(provider = %id, "overlay rejected");
            return present;
        };

        match (enable.unwrap_or(!present), present) {
            (true, false) => {
                let anchor = first_non_raster(map);
                self.materialize(map, provider, opacity, anchor.as_deref());
            }
            (true, true) => {
                self.update_opacity(map, id, opacity);
            }
            (false, true) => {
                self.dematerialize(map, id);
            }
            (false, false) => {}
        }
        map.has_layer(&layer_id)
    }

    /// Sets `raster-opacity` on a materialized provider. Returns false when
    /// the provider is not on the map or the value is not a number.
    pub fn update_opacity(&self, map: &mut dyn MapRenderer, id: &str, value: f64) -> bool {
        let layer_id = provider_layer_id(id);
        if !map.has_layer(&layer_id) {
            return false;
        }
        let Some(value) = opacity::normalize(value) else {
            return false;
        };
        absorb(
            map.set_paint_property(&layer_id, "raster-opacity", value.into()),
            "set opacity",
            id,
        )
    }

    /// Converges the map onto `layers`: basemap, overlay set, opacities.
    pub fn sync(&self, map: &mut dyn MapRenderer, layers: &LayerState) {
        let opacity_of = |id: &str| layers.opacities.get_or_default(id);
        self.set_basemap_or_default(map, &layers.basemap, opacity_of(&layers.basemap));
        for id in self.materialized(map, ProviderKind::Overlay) {
            if !layers.overlays.contains(&id) {
                self.toggle_overlay(map, &id, Some(false), DEFAULT_PROVIDER_OPACITY);
            }
        }
        for id in &layers.overlays {
            self.toggle_overlay(map, id, Some(true), opacity_of(id));
        }
    }

    fn usable(&self, id: &str, kind: ProviderKind) -> Option<&TileProvider> {
        let provider = self.registry.lookup(id).filter(|p| p.enabled && p.kind == kind)?;
        if provider.format != TileFormat::Raster {
            tracing::warn!(provider = %id, "only raster providers can be materialized");
            return None;
        }
        Some(provider)
    }

    /// Basemaps sit below every overlay and every non-raster layer.
    fn basemap_anchor(&self, map: &dyn MapRenderer) -> Option<String> {
        map.layer_stack()
            .into_iter()
            .find(|l| {
                l.kind != LayerType::Raster
                    || provider_of_layer(&l.id)
                        .and_then(|id| self.registry.lookup(id))
                        .is_some_and(|p| p.kind == ProviderKind::Overlay)
            })
            .map(|l| l.id)
    }

    fn materialize(&self, map: &mut dyn MapRenderer, provider: &TileProvider, opacity: f64, before: Option<&str>) -> bool {
        let source_id = provider_source_id(&provider.id);
        if !map.has_source(&source_id) {
            let spec = SourceSpec::Raster {
                tiles: provider.tile_urls(),
                tile_size: 256,
                minzoom: Some(provider.minzoom),
                maxzoom: Some(provider.source_maxzoom()),
                attribution: Some(provider.attribution.clone()),
            };
            if !absorb(map.add_source(&source_id, spec), "add source", &provider.id) {
                return false;
            }
        }
        let value = opacity::normalize(opacity).unwrap_or(DEFAULT_PROVIDER_OPACITY);
        let layer = LayerSpec::new(provider_layer_id(&provider.id), LayerType::Raster, source_id)
            .paint("raster-opacity", value.into());
        absorb(map.add_layer(layer, before), "add layer", &provider.id)
    }

    fn dematerialize(&self, map: &mut dyn MapRenderer, id: &str) -> bool {
        let layer_id = provider_layer_id(id);
        let source_id = provider_source_id(id);
        let mut ok = true;
        if map.has_layer(&layer_id) {
            ok &= absorb(map.remove_layer(&layer_id), "remove layer", id);
        }
        if map.has_source(&source_id) {
            ok &= absorb(map.remove_source(&source_id), "remove source", id);
        }
        ok
    }
}

fn first_non_raster(map: &dyn MapRenderer) -> Option<String> {
    map.layer_stack()
        .into_iter()
        .find(|l| l.kind != LayerType::Raster)
        .map(|l| l.id)
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::memory::InMemoryMap,
        style::fallback_style,
    };

    use super::*;

    fn mutator() -> LayerMutator {
        LayerMutator::new(Arc::new(ProviderRegistry::default()))
    }

    #[test]
    fn overlay_goes_below_vector_layers() {
        let mut style = fallback_style();
        style.sources.insert(
            "sites".to_string(),
            SourceSpec::Vector {
                tiles: vec!["https://t/{z}/{x}/{y}.mvt".to_string()],
                minzoom: None,
                maxzoom: None,
                promote_id: None,
            },
        );
        style.layers.push(LayerSpec::new("sites-fill", LayerType::Fill, "sites"));
        let mut map = InMemoryMap::new(style);
        let m = mutator();

        assert!(m.toggle_overlay(&mut map, "openrailwaymap", None, 0.5));
        assert_eq!(map.layer_ids(), vec!["base-reference", "lyr-openrailwaymap", "sites-fill"]);

        assert_eq!(m.set_basemap(&mut map, "opentopomap", 1.0), BasemapOutcome::Applied);
        assert_eq!(
            map.layer_ids(),
            vec!["base-reference", "lyr-opentopomap", "lyr-openrailwaymap", "sites-fill"]
        );

        assert!(!m.toggle_overlay(&mut map, "openrailwaymap", None, 0.5));
        assert!(!map.has_source("src-openrailwaymap"));
    }

    #[test]
    fn renderer_failures_are_absorbed() {
        let mut map = InMemoryMap::new(fallback_style());
        map.set_failing(true);
        let m = mutator();
        assert_eq!(m.set_basemap(&mut map, "osm-hot", 1.0), BasemapOutcome::Failed);
        assert!(!m.toggle_overlay(&mut map, "hillshade", Some(true), 1.0));
        assert!(!m.update_opacity(&mut map, "osm-hot", 0.3));
    }

    #[test]
    fn opacity_needs_materialized_provider() {
        let mut map = InMemoryMap::new(fallback_style());
        let m = mutator();
        assert!(!m.update_opacity(&mut map, "osm-hot", 0.3));
        m.set_basemap(&mut map, "osm-hot", 1.0);
        assert!(m.update_opacity(&mut map, "osm-hot", 0.333));
        assert_eq!(map.paint("lyr-osm-hot", "raster-opacity"), Some(&0.33.into()));
    }
}
