//! View-state records shared by the codec, the store and the runtime.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    core::{
        filters::MapFilters,
        opacity::{LayerOpacity, LayerVisibility, ProviderOpacities},
    },
    providers::ProviderRegistry,
    types::{LngLat, ProviderId, RecordId},
};

/// Basemap, overlays and provider opacities; the part mirrored to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    /// Active basemap provider.
    pub basemap: ProviderId,
    /// Active overlay providers.
    #[serde(default)]
    pub overlays: BTreeSet<ProviderId>,
    /// Explicit provider opacities.
    #[serde(default)]
    pub opacities: ProviderOpacities,
}

impl LayerState {
    /// State with `basemap`, no overlays and default opacities.
    pub fn with_basemap(basemap: impl Into<ProviderId>) -> Self {
        Self {
            basemap: basemap.into(),
            overlays: BTreeSet::new(),
            opacities: ProviderOpacities::new(),
        }
    }

    /// Default state for `registry`.
    pub fn default_for(registry: &ProviderRegistry) -> Self {
        Self::with_basemap(registry.default_basemap())
    }

    /// Enforces registry validity: invalid basemap replaced by the default,
    /// unknown or disabled overlays dropped, opacities for unknown providers
    /// dropped.
    pub fn normalized(mut self, registry: &ProviderRegistry) -> Self {
        if !registry.is_valid_basemap(&self.basemap) {
            tracing::debug!(basemap = %self.basemap, "invalid basemap replaced by default");
            self.basemap = registry.default_basemap().to_string();
        }
        self.overlays.retain(|id| registry.is_valid_overlay(id));
        self.opacities.retain(|id| registry.lookup(id).is_some());
        self
    }
}

/// Map camera encoded as `cx`/`cy`/`xz`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Map center.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
}

/// Web-mercator latitude limit.
pub const MAX_LATITUDE: f64 = 85.051_129;
/// Highest zoom accepted from a URL.
pub const MAX_ZOOM: f64 = 22.0;

impl Camera {
    /// Validates and clamps a camera, quantizing to the serialized precision
    /// (5 decimals for coordinates, 2 for zoom). Non-finite input is rejected.
    pub fn new(lng: f64, lat: f64, zoom: f64) -> Option<Self> {
        if !(lng.is_finite() && lat.is_finite() && zoom.is_finite()) {
            return None;
        }
        Some(Self {
            center: LngLat {
                lng: round_to(lng.clamp(-180.0, 180.0), 5),
                lat: round_to(lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), 5),
            },
            zoom: round_to(zoom.clamp(0.0, MAX_ZOOM), 2),
        })
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Visibility and opacity of the fixed data layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedLayers {
    /// Per-layer visibility.
    pub visibility: LayerVisibility,
    /// Per-layer nominal opacity.
    pub opacity: LayerOpacity,
}

/// Everything a shareable view URL carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Basemap/overlay selection.
    pub layers: LayerState,
    /// Attribute filters.
    #[serde(default)]
    pub filters: MapFilters,
    /// Camera, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    /// Fixed data-layer controls.
    #[serde(default)]
    pub fixed: FixedLayers,
    /// 3D terrain toggle.
    #[serde(default)]
    pub terrain_3d: bool,
    /// Record to fly to on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<RecordId>,
}

impl ViewState {
    /// Default view for `registry`.
    pub fn default_for(registry: &ProviderRegistry) -> Self {
        Self::from_layers(LayerState::default_for(registry))
    }

    /// View with `layers` and defaults elsewhere.
    pub fn from_layers(layers: LayerState) -> Self {
        Self {
            layers,
            filters: MapFilters::default(),
            camera: None,
            fixed: FixedLayers::default(),
            terrain_3d: false,
            focus: None,
        }
    }

    /// Applies [`LayerState::normalized`] and filter normalization.
    pub fn normalized(mut self, registry: &ProviderRegistry) -> Self {
        self.layers = self.layers.normalized(registry);
        self.filters.normalize();
        self
    }
}
