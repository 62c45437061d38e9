//! Read-only provider registry with key-gated availability.

use hashbrown::HashMap;
use serde::Serialize;

use crate::types::{ProviderId, ProviderKind, TileFormat};

use super::catalog::{BUILTIN_PROVIDERS, DEFAULT_BASEMAP, ProviderDef};

/// Resolves API keys for providers that require one.
pub trait KeySource {
    /// Returns the key stored under `env`, if any.
    fn key(&self, env: &str) -> Option<String>;
}

/// Reads keys from the process environment; empty values count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeys;

impl KeySource for EnvKeys {
    fn key(&self, env: &str) -> Option<String> {
        std::env::var(env).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed key table, mainly for tests and embedded configurations.
#[derive(Debug, Clone, Default)]
pub struct StaticKeys {
    keys: HashMap<String, String>,
}

impl StaticKeys {
    /// Creates an empty key table (every keyed provider disabled).
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a key, builder style.
    pub fn with(mut self, env: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(env.into(), key.into());
        self
    }
}

impl KeySource for StaticKeys {
    fn key(&self, env: &str) -> Option<String> {
        self.keys.get(env).filter(|v| !v.is_empty()).cloned()
    }
}

/// Materializable tile provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileProvider {
    /// Unique provider id.
    pub id: ProviderId,
    /// Human-readable label.
    pub name: String,
    /// Basemap or overlay.
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// Tile payload format.
    pub format: TileFormat,
    /// URL template as declared.
    pub url: String,
    /// Minimum zoom served.
    pub minzoom: u8,
    /// Maximum zoom allowed.
    pub maxzoom: u8,
    /// Highest zoom with native tiles.
    #[serde(rename = "effectiveMaxZoom", skip_serializing_if = "Option::is_none")]
    pub effective_max_zoom: Option<u8>,
    /// HTML-safe attribution.
    pub attribution: String,
    /// Environment variable naming the key, when one is required.
    #[serde(rename = "keyEnv", skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
    /// False when a required key is absent.
    pub enabled: bool,
    /// Hosts substituted for `{s}`.
    pub subdomains: Vec<String>,
    #[serde(skip)]
    api_key: Option<String>,
}

impl TileProvider {
    fn from_def(def: &ProviderDef, keys: &dyn KeySource) -> Self {
        let api_key = def.key_env.and_then(|env| keys.key(env));
        let enabled = def.key_env.is_none() || api_key.is_some();
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            kind: def.kind,
            format: def.format,
            url: def.url.to_string(),
            minzoom: def.minzoom,
            maxzoom: def.maxzoom,
            effective_max_zoom: def.effective_max_zoom,
            attribution: def.attribution.to_string(),
            key_env: def.key_env.map(str::to_string),
            enabled,
            subdomains: def.subdomains.iter().map(|s| (*s).to_string()).collect(),
            api_key,
        }
    }

    /// Returns true when the provider needs an API key.
    pub fn requires_key(&self) -> bool {
        self.key_env.is_some()
    }

    /// Highest zoom the tile source should request before overzooming.
    pub fn source_maxzoom(&self) -> u8 {
        self.effective_max_zoom.unwrap_or(self.maxzoom).min(self.maxzoom)
    }

    /// Concrete tile URLs: one per subdomain, with the API key filled in.
    pub fn tile_urls(&self) -> Vec<String> {
        let keyed = match &self.api_key {
            Some(key) => self.url.replace("{key}", key),
            None => self.url.clone(),
        };
        if !keyed.contains("{s}") {
            return vec![keyed];
        }
        if self.subdomains.is_empty() {
            return vec![keyed.replace("{s}.", "").replace("{s}", "")];
        }
        self.subdomains
            .iter()
            .map(|s| keyed.replace("{s}", s))
            .collect()
    }
}

/// Static provider catalog, evaluated once against the available keys.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<TileProvider>,
    index: HashMap<ProviderId, usize>,
    default_basemap: ProviderId,
}

impl ProviderRegistry {
    /// Builds the built-in catalog, reading keys from the environment.
    pub fn from_env() -> Self {
        Self::builtin(&EnvKeys)
    }

    /// Builds the built-in catalog against `keys`.
    pub fn builtin(keys: &dyn KeySource) -> Self {
        Self::from_defs(BUILTIN_PROVIDERS, keys, DEFAULT_BASEMAP)
    }

    /// Builds a registry from arbitrary definitions.
    ///
    /// `default_basemap` is kept only if it names an enabled basemap;
    /// otherwise the first enabled basemap is used, then [`DEFAULT_BASEMAP`].
    /// Duplicate ids keep the first definition.
    pub fn from_defs(defs: &[ProviderDef], keys: &dyn KeySource, default_basemap: &str) -> Self {
        let mut providers = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            if index.contains_key(def.id) {
                continue;
            }
            index.insert(def.id.to_string(), providers.len());
            providers.push(TileProvider::from_def(def, keys));
        }

        let mut registry = Self {
            providers,
            index,
            default_basemap: DEFAULT_BASEMAP.to_string(),
        };
        registry.default_basemap = if registry.is_valid_basemap(default_basemap) {
            default_basemap.to_string()
        } else {
            registry
                .list_basemaps()
                .first()
                .map(|p| p.id.clone())
                .unwrap_or_else(|| DEFAULT_BASEMAP.to_string())
        };
        registry
    }

    /// Enabled basemaps in catalog order.
    pub fn list_basemaps(&self) -> Vec<&TileProvider> {
        self.list(ProviderKind::Basemap)
    }

    /// Enabled overlays in catalog order.
    pub fn list_overlays(&self) -> Vec<&TileProvider> {
        self.list(ProviderKind::Overlay)
    }

    /// Looks up any provider, enabled or not.
    pub fn lookup(&self, id: &str) -> Option<&TileProvider> {
        self.index.get(id).map(|idx| &self.providers[*idx])
    }

    /// Every provider, including disabled ones.
    pub fn all(&self) -> &[TileProvider] {
        &self.providers
    }

    /// Basemap used whenever a requested one is invalid.
    pub fn default_basemap(&self) -> &str {
        &self.default_basemap
    }

    /// True when `id` names an enabled basemap.
    pub fn is_valid_basemap(&self, id: &str) -> bool {
        self.is_enabled_kind(id, ProviderKind::Basemap)
    }

    /// True when `id` names an enabled overlay.
    pub fn is_valid_overlay(&self, id: &str) -> bool {
        self.is_enabled_kind(id, ProviderKind::Overlay)
    }

    /// Returns `id` when it is a valid basemap, the default otherwise.
    pub fn resolve_basemap<'a>(&'a self, id: &'a str) -> &'a str {
        if self.is_valid_basemap(id) {
            id
        } else {
            &self.default_basemap
        }
    }

    fn is_enabled_kind(&self, id: &str, kind: ProviderKind) -> bool {
        self.lookup(id).is_some_and(|p| p.enabled && p.kind == kind)
    }

    fn list(&self, kind: ProviderKind) -> Vec<&TileProvider> {
        self.providers
            .iter()
            .filter(|p| p.enabled && p.kind == kind)
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin(&StaticKeys::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_providers_hidden_without_key() {
        let registry = ProviderRegistry::builtin(&StaticKeys::none());
        let ids: Vec<_> = registry.list_basemaps().iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&"osm-standard"));
        assert!(!ids.contains(&"stadia-terrain"));
        assert!(registry.lookup("stadia-terrain").is_some_and(|p| !p.enabled));
        assert!(!registry.is_valid_basemap("stadia-terrain"));
    }

    #[test]
    fn key_enables_provider_and_fills_template() {
        let keys = StaticKeys::none().with("STADIA_API_KEY", "secret");
        let registry = ProviderRegistry::builtin(&keys);
        let stadia = registry.lookup("stadia-terrain").expect("stadia");
        assert!(stadia.enabled);
        assert_eq!(
            stadia.tile_urls(),
            vec!["https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png?api_key=secret".to_string()]
        );
    }

    #[test]
    fn subdomains_expand_into_one_url_each() {
        let registry = ProviderRegistry::default();
        let hot = registry.lookup("osm-hot").expect("osm-hot");
        assert_eq!(hot.tile_urls().len(), 3);
        assert!(hot.tile_urls()[1].starts_with("https://b.tile.openstreetmap.fr/"));
        assert_eq!(hot.source_maxzoom(), 19);
    }

    #[test]
    fn unknown_lookup_is_none_and_resolves_to_default() {
        let registry = ProviderRegistry::default();
        assert!(registry.lookup("unknown-id").is_none());
        assert_eq!(registry.resolve_basemap("unknown-id"), "osm-standard");
        assert_eq!(registry.resolve_basemap("osm-data-overlay"), "osm-standard");
    }
}
