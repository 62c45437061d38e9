//! View-state mutation model.

use serde::{Deserialize, Serialize};

use crate::{
    core::{filters::FilterCategory, state::Camera},
    types::{DataLayer, ProviderId, RecordId, TermId},
};

/// One user interaction with the layer, filter or camera controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewOp {
    /// Switch the exclusive basemap.
    SetBasemap {
        /// Target basemap id.
        id: ProviderId,
    },
    /// Flip an overlay, or force it on/off when `enable` is set.
    ToggleOverlay {
        /// Overlay id.
        id: ProviderId,
        /// Forced state; `None` flips.
        enable: Option<bool>,
    },
    /// Set a provider's raster opacity.
    SetProviderOpacity {
        /// Provider id.
        id: ProviderId,
        /// Opacity in `[0, 1]` (clamped).
        value: f64,
    },
    /// Flip one vocabulary term.
    ToggleFilter {
        /// Vocabulary.
        category: FilterCategory,
        /// Term id.
        term: TermId,
    },
    /// Replace one vocabulary's selection.
    SetFilter {
        /// Vocabulary.
        category: FilterCategory,
        /// Term ids; empty removes the constraint.
        terms: Vec<TermId>,
    },
    /// Drop every filter.
    ClearFilters,
    /// Show or hide a fixed data layer.
    SetLayerVisibility {
        /// Layer.
        layer: DataLayer,
        /// Visibility.
        visible: bool,
    },
    /// Set a fixed data layer's nominal opacity.
    SetLayerOpacity {
        /// Layer.
        layer: DataLayer,
        /// Opacity in `[0, 1]` (clamped).
        value: f64,
    },
    /// Record the camera after a move.
    SetCamera {
        /// New camera.
        camera: Camera,
    },
    /// Toggle 3D terrain.
    SetTerrain {
        /// Enabled flag.
        enabled: bool,
    },
    /// Set or clear the focused record.
    SetFocus {
        /// Record id.
        id: Option<RecordId>,
    },
}

