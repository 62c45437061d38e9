//! URL query encoding of the view state.
//!
//! Parameters: `basemap`, `overlays` (comma list), `opacity.<providerId>`,
//! `cx`/`cy`/`xz`, `defs`/`cron`/`ind`/`amb`, `layers`
//! (`name:0|1:opacity`, comma-joined), `3d` and `focus`. Decoding never
//! fails: malformed parameters are dropped one by one.

use std::collections::BTreeSet;

use url::{Url, form_urlencoded};

use crate::{
    core::{
        filters::{FilterCategory, MapFilters, clean_term},
        opacity::{self, ProviderOpacities},
        state::{Camera, FixedLayers, ViewState},
    },
    types::{DataLayer, ProviderId, RecordId},
};

/// Basemap parameter.
pub const KEY_BASEMAP: &str = "basemap";
/// Overlay list parameter.
pub const KEY_OVERLAYS: &str = "overlays";
/// Prefix of per-provider opacity parameters.
pub const OPACITY_PREFIX: &str = "opacity.";
/// Center longitude.
pub const KEY_CENTER_X: &str = "cx";
/// Center latitude.
pub const KEY_CENTER_Y: &str = "cy";
/// Zoom.
pub const KEY_ZOOM: &str = "xz";
/// Fixed data-layer codec.
pub const KEY_LAYERS: &str = "layers";
/// 3D terrain flag.
pub const KEY_TERRAIN: &str = "3d";
/// Record to fly to.
pub const KEY_FOCUS: &str = "focus";

/// Draw order used by the `layers` codec.
const LAYERS_CODEC_ORDER: [DataLayer; 3] = [DataLayer::Sites, DataLayer::Province, DataLayer::Comuni];

/// Layer-state fields found in one source (URL or storage).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialLayers {
    /// Basemap id, unvalidated.
    pub basemap: Option<ProviderId>,
    /// Overlay ids, unvalidated.
    pub overlays: Option<BTreeSet<ProviderId>>,
    /// Provider opacities, already clamped.
    pub opacities: Option<ProviderOpacities>,
}

/// Everything recognizable in a view query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlView {
    /// Layer-state fields.
    pub layers: PartialLayers,
    /// Filters (URL is their only source).
    pub filters: MapFilters,
    /// Camera, when all three components are valid.
    pub camera: Option<Camera>,
    /// Fixed-layer controls, when at least one entry parsed.
    pub fixed: Option<FixedLayers>,
    /// 3D flag.
    pub terrain_3d: Option<bool>,
    /// Focused record.
    pub focus: Option<RecordId>,
}

/// True for parameters owned by the view codec.
pub fn is_view_key(key: &str) -> bool {
    key.starts_with(OPACITY_PREFIX)
        || FilterCategory::from_url_key(key).is_some()
        || matches!(
            key,
            KEY_BASEMAP | KEY_OVERLAYS | KEY_CENTER_X | KEY_CENTER_Y | KEY_ZOOM | KEY_LAYERS | KEY_TERRAIN | KEY_FOCUS
        )
}

/// Parses a query string (with or without the leading `?`).
pub fn decode_query(query: &str) -> UrlView {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut out = UrlView::default();
    let (mut cx, mut cy, mut xz) = (None, None, None);
    let mut opacities = ProviderOpacities::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim();
        match key.as_ref() {
            KEY_BASEMAP => {
                if let Some(id) = clean_term(value) {
                    out.layers.basemap = Some(id);
                }
            }
            KEY_OVERLAYS => {
                let ids: BTreeSet<String> = split_list(value).collect();
                if !ids.is_empty() {
                    out.layers.overlays = Some(ids);
                }
            }
            KEY_CENTER_X => cx = parse_f64(value),
            KEY_CENTER_Y => cy = parse_f64(value),
            KEY_ZOOM => xz = parse_f64(value),
            KEY_LAYERS => out.fixed = decode_fixed_layers(value),
            KEY_TERRAIN => out.terrain_3d = parse_flag(value),
            KEY_FOCUS => out.focus = (!value.is_empty()).then(|| value.to_string()),
            other => {
                if let Some(id) = other.strip_prefix(OPACITY_PREFIX) {
                    if let (Some(id), Some(v)) = (clean_term(id), parse_f64(value)) {
                        opacities.set(id, v);
                    }
                } else if let Some(category) = FilterCategory::from_url_key(other) {
                    out.filters.set(category, split_list(value));
                }
            }
        }
    }

    if !opacities.is_empty() {
        out.layers.opacities = Some(opacities);
    }
    if let (Some(x), Some(y), Some(z)) = (cx, cy, xz) {
        out.camera = Camera::new(x, y, z);
    }
    out
}

/// Encodes the complete view state. Empty collections are omitted, default
/// fixed-layer controls are omitted, opacities use two decimals.
pub fn encode_query(state: &ViewState) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |key: &str, value: String| parts.push(format!("{}={value}", escape(key)));

    push(KEY_BASEMAP, escape(&state.layers.basemap));
    if !state.layers.overlays.is_empty() {
        push(KEY_OVERLAYS, join_escaped(state.layers.overlays.iter()));
    }
    for (id, value) in state.layers.opacities.iter() {
        push(&format!("{OPACITY_PREFIX}{id}"), format!("{value:.2}"));
    }
    if let Some(camera) = &state.camera {
        push(KEY_CENTER_X, format!("{:.5}", camera.center.lng));
        push(KEY_CENTER_Y, format!("{:.5}", camera.center.lat));
        push(KEY_ZOOM, format!("{:.2}", camera.zoom));
    }
    for (category, terms) in state.filters.active() {
        push(category.url_key(), join_escaped(terms.iter()));
    }
    if state.fixed != FixedLayers::default() {
        push(KEY_LAYERS, encode_fixed_layers(&state.fixed));
    }
    if state.terrain_3d {
        push(KEY_TERRAIN, "1".to_string());
    }
    if let Some(focus) = &state.focus {
        push(KEY_FOCUS, escape(focus));
    }
    parts.join("&")
}

/// Rewrites `current` for a history replace: view parameters are replaced,
/// foreign parameters and the fragment are kept.
pub fn apply_to_url(current: &Url, state: &ViewState) -> Url {
    let foreign: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(k, _)| !is_view_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut query = encode_query(state);
    if !foreign.is_empty() {
        let extra = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(foreign)
            .finish();
        query = format!("{query}&{extra}");
    }
    let mut url = current.clone();
    url.set_query(Some(&query));
    url
}

/// Fully-qualified share link for `state`, ignoring whatever query or
/// fragment `base` carries.
pub fn share_url(base: &Url, state: &ViewState) -> Url {
    let mut url = base.clone();
    url.set_fragment(None);
    url.set_query(Some(&encode_query(state)));
    url
}

/// `name:0|1:opacity` entries; unknown names and malformed parts dropped.
pub fn decode_fixed_layers(value: &str) -> Option<FixedLayers> {
    let mut fixed = FixedLayers::default();
    let mut any = false;
    for entry in value.split(',') {
        let mut parts = entry.trim().split(':');
        let Some(layer) = parts.next().and_then(DataLayer::from_name) else {
            continue;
        };
        if let Some(visible) = parts.next().and_then(parse_flag) {
            fixed.visibility.set(layer, visible);
            any = true;
        }
        if let Some(op) = parts.next().and_then(parse_f64) {
            any |= fixed.opacity.set(layer, op);
        }
    }
    any.then_some(fixed)
}

/// Inverse of [`decode_fixed_layers`].
pub fn encode_fixed_layers(fixed: &FixedLayers) -> String {
    LAYERS_CODEC_ORDER
        .iter()
        .map(|layer| {
            format!(
                "{}:{}:{:.2}",
                layer.name(),
                u8::from(fixed.visibility.get(*layer)),
                opacity::quantize(fixed.opacity.get(*layer))
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split(',').filter_map(clean_term)
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn join_escaped<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(|s| escape(s)).collect::<Vec<_>>().join(",")
}
