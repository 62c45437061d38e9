//! Imperative layer management against a live map.

/// Headless in-memory renderer.
pub mod memory;
/// Basemap/overlay provider swapping.
pub mod mutator;
/// Point-of-interest overlay.
pub mod poi;
/// Renderer capability trait.
pub mod traits;

pub use memory::InMemoryMap;
pub use mutator::{BasemapOutcome, LayerMutator};
pub use poi::PoiOverlay;
pub use traits::{LayerRef, MapRenderer, RenderError};
