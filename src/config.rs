//! Viewer configuration loaded from TOML.

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{
    backend::{BackendConfig, Timeouts},
    providers::{BUILTIN_PROVIDERS, DEFAULT_BASEMAP, KeySource, ProviderRegistry},
    runtime::handle::RuntimeConfig,
    search::DEFAULT_SEARCH_LIMIT,
    types::Bbox,
    view_state::DEFAULT_NAMESPACE,
};

/// Configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Cause.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[backend]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    /// Base URL of the data backend.
    pub base_url: String,
    /// Base URL of the tile endpoint; `{base_url}/functions/v1` when unset.
    pub tiles_base: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Table holding the sites.
    pub sites_table: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            tiles_base: None,
            api_key_env: "ARCHEOMAP_API_KEY".to_string(),
            sites_table: "siti".to_string(),
        }
    }
}

/// `[view]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewSection {
    /// Basemap used when none (or an invalid one) is requested.
    pub default_basemap: String,
    /// Storage key namespace.
    pub storage_namespace: String,
    /// Quiet window before persisting, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            default_basemap: DEFAULT_BASEMAP.to_string(),
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            debounce_ms: 200,
        }
    }
}

/// `[timeouts]` table, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSection {
    /// Geocoding budget.
    pub geocode_ms: u64,
    /// Search budget.
    pub search_ms: u64,
    /// Export budget.
    pub export_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            geocode_ms: 5_000,
            search_ms: 10_000,
            export_ms: 30_000,
        }
    }
}

/// Complete viewer configuration. Every field has a default, so an empty
/// file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Backend endpoints.
    pub backend: BackendSection,
    /// View-state defaults.
    pub view: ViewSection,
    /// Network budgets.
    pub timeouts: TimeoutSection,
    /// Maximum search results.
    pub search_limit: Option<usize>,
    /// Region of interest for geocoding.
    pub region: Option<Bbox>,
}

impl ViewerConfig {
    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if let Some(tiles) = &self.backend.tiles_base {
            Url::parse(tiles).map_err(|err| ConfigError::Invalid(format!("backend.tiles_base: {err}")))?;
        }
        if self.timeouts.geocode_ms == 0 || self.timeouts.search_ms == 0 || self.timeouts.export_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if self.search_limit == Some(0) {
            return Err(ConfigError::Invalid("search_limit must be positive".to_string()));
        }
        if let Some(r) = &self.region {
            if !(r.west < r.east && r.south < r.north) {
                return Err(ConfigError::Invalid("region must have west < east and south < north".to_string()));
            }
        }
        Ok(())
    }

    /// Parsed backend base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the URL does not parse.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.backend.base_url).map_err(|err| ConfigError::Invalid(format!("backend.base_url: {err}")))
    }

    /// Tile endpoint base.
    pub fn tiles_base(&self) -> String {
        match &self.backend.tiles_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}/functions/v1", self.backend.base_url.trim_end_matches('/')),
        }
    }

    /// Maximum search results.
    pub fn search_limit(&self) -> usize {
        self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    /// Network budgets.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            geocode: Duration::from_millis(self.timeouts.geocode_ms),
            search: Duration::from_millis(self.timeouts.search_ms),
            export: Duration::from_millis(self.timeouts.export_ms),
        }
    }

    /// Runtime settings with this config's debounce window.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            debounce_ms: self.view.debounce_ms,
            ..RuntimeConfig::default()
        }
    }

    /// Provider registry with this config's default basemap.
    pub fn registry(&self, keys: &dyn KeySource) -> ProviderRegistry {
        ProviderRegistry::from_defs(BUILTIN_PROVIDERS, keys, &self.view.default_basemap)
    }

    /// Backend client settings; the key is read through `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the base URL does not parse.
    pub fn backend_config(&self, keys: &dyn KeySource) -> Result<BackendConfig, ConfigError> {
        Ok(BackendConfig {
            base_url: self.base_url()?,
            api_key: keys.key(&self.backend.api_key_env),
            sites_table: self.backend.sites_table.clone(),
            timeouts: self.timeouts(),
            region: self.region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").expect("defaults");
        assert_eq!(config.view.debounce_ms, 200);
        assert_eq!(config.search_limit(), 10);
        assert_eq!(config.tiles_base(), "http://localhost:54321/functions/v1");
        assert_eq!(config.timeouts(), Timeouts::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ViewerConfig::from_toml_str(
            r#"
search_limit = 25

[backend]
base_url = "https://db.example.org/"
tiles_base = "https://tiles.example.org/"

[view]
default_basemap = "opentopomap"

[region]
west = 14.9
south = 39.7
east = 18.6
north = 42.0
"#,
        )
        .expect("config");
        assert_eq!(config.tiles_base(), "https://tiles.example.org");
        assert_eq!(config.search_limit(), 25);
        let registry = config.registry(&crate::providers::StaticKeys::none());
        assert_eq!(registry.default_basemap(), "opentopomap");
        assert!(config.region.is_some());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(ViewerConfig::from_toml_str("[timeouts]\ngeocode_ms = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(ViewerConfig::from_toml_str("unknown = 1"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            ViewerConfig::from_toml_str("[backend]\nbase_url = \"not a url\""),
            Err(ConfigError::Invalid(_))
        ));
    }
}
