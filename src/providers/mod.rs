//! Basemap and overlay tile providers.

/// Built-in provider definitions.
pub mod catalog;
/// Registry with key-gated availability.
pub mod registry;

pub use catalog::{BUILTIN_PROVIDERS, DEFAULT_BASEMAP, ProviderDef};
pub use registry::{EnvKeys, KeySource, ProviderRegistry, StaticKeys, TileProvider};
