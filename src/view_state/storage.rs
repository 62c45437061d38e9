//! Persistent-storage encoding of the layer state.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::{
    core::{filters::clean_term, opacity::ProviderOpacities, state::LayerState},
    persist::{KeyValueStore, PersistResult},
};

use super::params::PartialLayers;

/// Version written next to the layer keys; other versions are ignored on load.
pub const STORAGE_FORMAT_VERSION: &str = "1";

/// Namespaced storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Format version key.
    pub version: String,
    /// Basemap id (plain string).
    pub basemap: String,
    /// Overlay ids (JSON array).
    pub overlays: String,
    /// Provider opacities (JSON object).
    pub opacities: String,
}

impl StorageKeys {
    /// Keys under `namespace` (e.g. `archeomap.layers`).
    pub fn new(namespace: &str) -> Self {
        Self {
            version: format!("{namespace}.version"),
            basemap: format!("{namespace}.basemap"),
            overlays: format!("{namespace}.overlays"),
            opacities: format!("{namespace}.opacities"),
        }
    }
}

/// Reads whatever layer fields are present and well-formed. Storage errors
/// and malformed values are logged and treated as absent.
pub fn load_layers(store: &dyn KeyValueStore, keys: &StorageKeys) -> PartialLayers {
    let read = |key: &str| match store.get(key) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%key, error = %err, "storage read failed");
            None
        }
    };

    if let Some(version) = read(&keys.version) {
        if version != STORAGE_FORMAT_VERSION {
            tracing::debug!(%version, "ignoring stored layer state with unsupported version");
            return PartialLayers::default();
        }
    }

    PartialLayers {
        basemap: read(&keys.basemap).and_then(|v| clean_term(&v)),
        overlays: read(&keys.overlays).and_then(|v| parse_overlays(&v)),
        opacities: read(&keys.opacities).and_then(|v| parse_opacities(&v)),
    }
}

/// Writes `layers`, removing keys for empty collections.
pub fn save_layers(store: &mut dyn KeyValueStore, keys: &StorageKeys, layers: &LayerState) -> PersistResult<()> {
    store.set(&keys.version, STORAGE_FORMAT_VERSION)?;
    store.set(&keys.basemap, &layers.basemap)?;
    if layers.overlays.is_empty() {
        store.remove(&keys.overlays)?;
    } else {
        store.set(&keys.overlays, &serde_json::to_string(&layers.overlays)?)?;
    }
    if layers.opacities.is_empty() {
        store.remove(&keys.opacities)?;
    } else {
        store.set(&keys.opacities, &serde_json::to_string(&layers.opacities)?)?;
    }
    Ok(())
}

fn parse_overlays(raw: &str) -> Option<BTreeSet<String>> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(clean_term)
            .collect(),
    )
}

fn parse_opacities(raw: &str) -> Option<ProviderOpacities> {
    let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    Some(collect_opacities(&entries))
}

fn collect_opacities(entries: &Map<String, Value>) -> ProviderOpacities {
    let mut out = ProviderOpacities::new();
    for (id, value) in entries {
        if let (Some(id), Some(v)) = (clean_term(id), value.as_f64()) {
            out.set(id, v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::persist::MemoryStore;

    use super::*;

    #[test]
    fn malformed_entries_are_dropped_individually() {
        let keys = StorageKeys::new("t");
        let mut store = MemoryStore::new();
        store.set(&keys.basemap, "osm-hot").expect("set");
        store.set(&keys.overlays, "{not json").expect("set");
        store
            .set(&keys.opacities, r#"{"osm-hot": 1.5, "bad": "x"}"#)
            .expect("set");

        let partial = load_layers(&store, &keys);
        assert_eq!(partial.basemap.as_deref(), Some("osm-hot"));
        assert_eq!(partial.overlays, None);
        let opacities = partial.opacities.expect("opacities");
        assert_eq!(opacities.get("osm-hot"), Some(1.0));
        assert_eq!(opacities.len(), 1);
    }

    #[test]
    fn unsupported_version_hides_everything() {
        let keys = StorageKeys::new("t");
        let mut store = MemoryStore::new();
        store.set(&keys.version, "99").expect("set");
        store.set(&keys.basemap, "osm-hot").expect("set");
        assert_eq!(load_layers(&store, &keys), PartialLayers::default());
    }
}
