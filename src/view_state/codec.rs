//! Combines URL and storage into a validated view state, and back.

use std::sync::Arc;

use url::Url;

use crate::{
    core::state::{FixedLayers, LayerState, ViewState},
    persist::{HistorySink, KeyValueStore, PersistResult},
    providers::ProviderRegistry,
};

use super::{
    storage::{self, StorageKeys},
    params::{self as query, PartialLayers},
};

/// Default storage namespace.
pub const DEFAULT_NAMESPACE: &str = "archeomap.layers";

/// View-state codec bound to a registry and a storage namespace.
#[derive(Debug, Clone)]
pub struct ViewStateCodec {
    registry: Arc<ProviderRegistry>,
    keys: StorageKeys,
}

impl ViewStateCodec {
    /// Codec using [`DEFAULT_NAMESPACE`].
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self::with_namespace(registry, DEFAULT_NAMESPACE)
    }

    /// Codec using a custom storage namespace.
    pub fn with_namespace(registry: Arc<ProviderRegistry>, namespace: &str) -> Self {
        Self {
            registry,
            keys: StorageKeys::new(namespace),
        }
    }

    /// Registry used for validation.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Storage keys in use.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Decodes the full view state: each layer field independently from
    /// URL, then storage, then the default; the rest from the URL only.
    /// The result is validated against the registry.
    pub fn decode(&self, query_string: &str, store: &dyn KeyValueStore) -> ViewState {
        let from_url = query::decode_query(query_string);
        let stored = storage::load_layers(store, &self.keys);
        let layers = self.combine(from_url.layers, stored);
        ViewState {
            layers,
            filters: from_url.filters,
            camera: from_url.camera,
            fixed: from_url.fixed.unwrap_or_else(FixedLayers::default),
            terrain_3d: from_url.terrain_3d.unwrap_or(false),
            focus: from_url.focus,
        }
        .normalized(&self.registry)
    }

    /// Decodes only the storage-mirrored layer state.
    pub fn decode_layers(&self, query_string: &str, store: &dyn KeyValueStore) -> LayerState {
        let from_url = query::decode_query(query_string).layers;
        let stored = storage::load_layers(store, &self.keys);
        self.combine(from_url, stored)
    }

    /// Query string for `state` (no leading `?`).
    pub fn encode_query(&self, state: &ViewState) -> String {
        query::encode_query(state)
    }

    /// Share link for `state` rooted at `base`.
    pub fn share_url(&self, base: &Url, state: &ViewState) -> Url {
        query::share_url(base, state)
    }

    /// Writes `state` to storage and replaces the history query. A failed
    /// write rolls the storage batch back so no partial state is committed.
    pub fn persist(
        &self,
        state: &ViewState,
        store: &mut dyn KeyValueStore,
        history: &mut dyn HistorySink,
    ) -> PersistResult<()> {
        if let Err(err) = storage::save_layers(store, &self.keys, &state.layers) {
            if let Err(rollback) = store.rollback() {
                tracing::warn!(error = %rollback, "storage rollback failed");
            }
            return Err(err);
        }
        store.flush()?;
        history.replace_query(&query::encode_query(state))?;
        Ok(())
    }

    /// A URL overlay list naming no known overlay counts as absent.
    fn combine(&self, url: PartialLayers, stored: PartialLayers) -> LayerState {
        let default = LayerState::default_for(&self.registry);
        let url_overlays = url
            .overlays
            .filter(|ids| ids.iter().any(|id| self.registry.is_valid_overlay(id)));
        LayerState {
            basemap: url.basemap.or(stored.basemap).unwrap_or(default.basemap),
            overlays: url_overlays.or(stored.overlays).unwrap_or(default.overlays),
            opacities: url.opacities.or(stored.opacities).unwrap_or(default.opacities),
        }
        .normalized(&self.registry)
    }
}
