use std::sync::Arc;

use crate::{
    core::state::{Camera, ViewState},
    op::ViewOp,
    providers::ProviderRegistry,
    types::{Generation, ProviderId},
};

/// Rejected view mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Basemap id is unknown, an overlay, or disabled.
    #[error("unknown or disabled basemap `{0}`")]
    InvalidBasemap(ProviderId),
    /// Overlay id is unknown, a basemap, or disabled.
    #[error("unknown or disabled overlay `{0}`")]
    InvalidOverlay(ProviderId),
    /// No provider with this id.
    #[error("unknown provider `{0}`")]
    UnknownProvider(ProviderId),
    /// NaN or infinite opacity.
    #[error("opacity must be a finite number")]
    InvalidOpacity,
    /// NaN or infinite camera component.
    #[error("camera must have finite coordinates")]
    InvalidCamera,
}

/// Authoritative view state. Every mutation goes through [`ViewStore::apply`],
/// which keeps the registry and normalization invariants.
#[derive(Debug)]
pub struct ViewStore {
    state: ViewState,
    registry: Arc<ProviderRegistry>,
    generation: Generation,
    dirty: bool,
}

impl ViewStore {
    /// Creates a store, normalizing `initial` against `registry`.
    pub fn new(registry: Arc<ProviderRegistry>, initial: ViewState) -> Self {
        let state = initial.normalized(&registry);
        Self {
            state,
            registry,
            generation: 0,
            dirty: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> ViewState {
        self.state.clone()
    }

    /// Registry used for validation.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Number of effective mutations so far.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Applies `op`; the generation advances only when the state changed.
    pub fn apply(&mut self, op: ViewOp) -> Result<Generation, StateError> {
        let mut next = self.state.clone();
        self.mutate(&mut next, op)?;
        if next != self.state {
            self.state = next;
            self.generation += 1;
            self.dirty = true;
        }
        Ok(self.generation)
    }

    /// Returns and resets the "changed since last persisted" flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn mutate(&self, next: &mut ViewState, op: ViewOp) -> Result<(), StateError> {
        match op {
            ViewOp::SetBasemap { id } => {
                if !self.registry.is_valid_basemap(&id) {
                    return Err(StateError::InvalidBasemap(id));
                }
                next.layers.basemap = id;
            }
            ViewOp::ToggleOverlay { id, enable } => {
                if !self.registry.is_valid_overlay(&id) {
                    return Err(StateError::InvalidOverlay(id));
                }
                let on = enable.unwrap_or(!next.layers.overlays.contains(&id));
                if on {
                    next.layers.overlays.insert(id);
                } else {
                    next.layers.overlays.remove(&id);
                }
            }
            ViewOp::SetProviderOpacity { id, value } => {
                if self.registry.lookup(&id).is_none() {
                    return Err(StateError::UnknownProvider(id));
                }
                if !next.layers.opacities.set(id, value) {
                    return Err(StateError::InvalidOpacity);
                }
            }
            ViewOp::ToggleFilter { category, term } => {
                next.filters.toggle(category, &term);
            }
            ViewOp::SetFilter { category, terms } => {
                next.filters.set(category, terms);
            }
            ViewOp::ClearFilters => next.filters.clear_all(),
            ViewOp::SetLayerVisibility { layer, visible } => {
                next.fixed.visibility.set(layer, visible);
            }
            ViewOp::SetLayerOpacity { layer, value } => {
                if !next.fixed.opacity.set(layer, value) {
                    return Err(StateError::InvalidOpacity);
                }
            }
            ViewOp::SetCamera { camera } => {
                let camera = Camera::new(camera.center.lng, camera.center.lat, camera.zoom)
                    .ok_or(StateError::InvalidCamera)?;
                next.camera = Some(camera);
            }
            ViewOp::SetTerrain { enabled } => next.terrain_3d = enabled,
            ViewOp::SetFocus { id } => {
                next.focus = id.filter(|s| !s.trim().is_empty());
            }
        }
        Ok(())
    }
}
