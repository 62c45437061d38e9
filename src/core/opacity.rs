//! Opacity domains: fixed data layers vs dynamically materialized providers.
//!
//! The two are separate types so that the paint-expression scaling used for
//! data layers is never applied to a provider's flat `raster-opacity`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DataLayer, ProviderId};

/// Opacity given to a provider that has no explicit value.
pub const DEFAULT_PROVIDER_OPACITY: f64 = 1.0;

/// Clamps to `[0, 1]`, rejecting NaN and infinities.
pub fn clamp_unit(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// Rounds to the two decimals used by every serialized form.
pub fn quantize(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp then quantize; the canonical in-memory form of an opacity.
pub fn normalize(value: f64) -> Option<f64> {
    clamp_unit(value).map(quantize)
}

/// Multiplies `value` by `factor`, trimming float noise from the product.
pub fn scaled(value: f64, factor: f64) -> f64 {
    (value * factor * 10_000.0).round() / 10_000.0
}

/// Nominal opacity of each fixed data layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerOpacity {
    /// Archaeological sites.
    pub sites: f64,
    /// Province boundaries.
    pub province: f64,
    /// Municipality boundaries.
    pub comuni: f64,
}

impl Default for LayerOpacity {
    fn default() -> Self {
        Self {
            sites: 1.0,
            province: 0.8,
            comuni: 0.6,
        }
    }
}

impl LayerOpacity {
    /// Opacity of `layer`.
    pub fn get(&self, layer: DataLayer) -> f64 {
        match layer {
            DataLayer::Sites => self.sites,
            DataLayer::Province => self.province,
            DataLayer::Comuni => self.comuni,
        }
    }

    /// Sets a normalized opacity; non-finite input is ignored.
    pub fn set(&mut self, layer: DataLayer, value: f64) -> bool {
        let Some(value) = normalize(value) else {
            return false;
        };
        let slot = match layer {
            DataLayer::Sites => &mut self.sites,
            DataLayer::Province => &mut self.province,
            DataLayer::Comuni => &mut self.comuni,
        };
        *slot = value;
        true
    }
}

/// Visibility flag of each fixed data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerVisibility {
    /// Archaeological sites.
    pub sites: bool,
    /// Province boundaries.
    pub province: bool,
    /// Municipality boundaries.
    pub comuni: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            sites: true,
            province: true,
            comuni: false,
        }
    }
}

impl LayerVisibility {
    /// Visibility of `layer`.
    pub fn get(&self, layer: DataLayer) -> bool {
        match layer {
            DataLayer::Sites => self.sites,
            DataLayer::Province => self.province,
            DataLayer::Comuni => self.comuni,
        }
    }

    /// Sets the visibility of `layer`.
    pub fn set(&mut self, layer: DataLayer, visible: bool) {
        match layer {
            DataLayer::Sites => self.sites = visible,
            DataLayer::Province => self.province = visible,
            DataLayer::Comuni => self.comuni = visible,
        }
    }
}

/// Per-provider `raster-opacity`, keyed by provider id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderOpacities(BTreeMap<ProviderId, f64>);

impl ProviderOpacities {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit opacity for `id`, if any.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    /// Opacity for `id`, or [`DEFAULT_PROVIDER_OPACITY`].
    pub fn get_or_default(&self, id: &str) -> f64 {
        self.get(id).unwrap_or(DEFAULT_PROVIDER_OPACITY)
    }

    /// Stores a normalized opacity; returns false for non-finite input.
    pub fn set(&mut self, id: impl Into<ProviderId>, value: f64) -> bool {
        match normalize(value) {
            Some(v) => {
                self.0.insert(id.into(), v);
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `id`.
    pub fn remove(&mut self, id: &str) -> Option<f64> {
        self.0.remove(id)
    }

    /// Keeps only entries accepted by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|id, _| keep(id));
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no provider has an explicit opacity.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ProviderId, f64)> for ProviderOpacities {
    fn from_iter<T: IntoIterator<Item = (ProviderId, f64)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (id, value) in iter {
            out.set(id, value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_and_rounds() {
        assert_eq!(normalize(1.7), Some(1.0));
        assert_eq!(normalize(-0.2), Some(0.0));
        assert_eq!(normalize(0.456), Some(0.46));
        assert_eq!(normalize(f64::NAN), None);
    }

    #[test]
    fn scaled_products_are_exact_decimals() {
        assert_eq!(scaled(0.8, 0.35), 0.28);
        assert_eq!(scaled(0.8, 0.6), 0.48);
        assert_eq!(scaled(0.6, 0.35), 0.21);
    }

    #[test]
    fn provider_opacities_reject_nan() {
        let mut ops = ProviderOpacities::new();
        assert!(!ops.set("osm-hot", f64::NAN));
        assert!(ops.is_empty());
        assert!(ops.set("osm-hot", 0.404));
        assert_eq!(ops.get("osm-hot"), Some(0.4));
        assert_eq!(ops.get_or_default("other"), DEFAULT_PROVIDER_OPACITY);
    }
}
