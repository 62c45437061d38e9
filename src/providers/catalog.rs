//! Built-in basemap and overlay provider table.

use crate::types::{ProviderKind, TileFormat};

/// Documented fallback basemap; keyless, so it is always enabled.
pub const DEFAULT_BASEMAP: &str = "osm-standard";

/// Static provider definition compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDef {
    /// Unique provider id.
    pub id: &'static str,
    /// Human-readable label.
    pub name: &'static str,
    /// Basemap or overlay.
    pub kind: ProviderKind,
    /// Tile payload format.
    pub format: TileFormat,
    /// URL template with `{z}`, `{x}`, `{y}` and optional `{s}` / `{key}`.
    pub url: &'static str,
    /// Minimum zoom served.
    pub minzoom: u8,
    /// Maximum zoom the map may reach with this provider.
    pub maxzoom: u8,
    /// Highest zoom with native tiles; the renderer overzooms above it.
    pub effective_max_zoom: Option<u8>,
    /// HTML-safe attribution text.
    pub attribution: &'static str,
    /// Environment variable holding the API key, when one is required.
    pub key_env: Option<&'static str>,
    /// Hosts substituted for `{s}`.
    pub subdomains: &'static [&'static str],
}

const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// Providers shipped with the viewer.
pub const BUILTIN_PROVIDERS: &[ProviderDef] = &[
    ProviderDef {
        id: DEFAULT_BASEMAP,
        name: "OpenStreetMap",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 19,
        effective_max_zoom: None,
        attribution: OSM_ATTRIBUTION,
        key_env: None,
        subdomains: &[],
    },
    ProviderDef {
        id: "osm-hot",
        name: "OpenStreetMap Humanitarian",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 20,
        effective_max_zoom: Some(19),
        attribution: "&copy; OpenStreetMap contributors, tiles by <a href=\"https://www.hotosm.org/\">HOT</a>",
        key_env: None,
        subdomains: &["a", "b", "c"],
    },
    ProviderDef {
        id: "opentopomap",
        name: "OpenTopoMap",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 19,
        effective_max_zoom: Some(17),
        attribution: "&copy; OpenStreetMap contributors, SRTM | style &copy; <a href=\"https://opentopomap.org\">OpenTopoMap</a>",
        key_env: None,
        subdomains: &["a", "b", "c"],
    },
    ProviderDef {
        id: "carto-positron",
        name: "CARTO Positron",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 20,
        effective_max_zoom: None,
        attribution: "&copy; OpenStreetMap contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>",
        key_env: None,
        subdomains: &["a", "b", "c", "d"],
    },
    ProviderDef {
        id: "esri-world-imagery",
        name: "Esri World Imagery",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        minzoom: 0,
        maxzoom: 20,
        effective_max_zoom: Some(18),
        attribution: "Tiles &copy; Esri, Maxar, Earthstar Geographics",
        key_env: None,
        subdomains: &[],
    },
    ProviderDef {
        id: "stadia-terrain",
        name: "Stadia Stamen Terrain",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png?api_key={key}",
        minzoom: 0,
        maxzoom: 18,
        effective_max_zoom: None,
        attribution: "&copy; <a href=\"https://stadiamaps.com/\">Stadia Maps</a> &copy; Stamen Design &copy; OpenStreetMap contributors",
        key_env: Some("STADIA_API_KEY"),
        subdomains: &[],
    },
    ProviderDef {
        id: "thunderforest-landscape",
        name: "Thunderforest Landscape",
        kind: ProviderKind::Basemap,
        format: TileFormat::Raster,
        url: "https://{s}.tile.thunderforest.com/landscape/{z}/{x}/{y}.png?apikey={key}",
        minzoom: 0,
        maxzoom: 22,
        effective_max_zoom: None,
        attribution: "Maps &copy; <a href=\"https://www.thunderforest.com\">Thunderforest</a>, data &copy; OpenStreetMap contributors",
        key_env: Some("THUNDERFOREST_API_KEY"),
        subdomains: &["a", "b", "c"],
    },
    ProviderDef {
        id: "osm-data-overlay",
        name: "Hiking trails",
        kind: ProviderKind::Overlay,
        format: TileFormat::Raster,
        url: "https://tile.waymarkedtrails.org/hiking/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 18,
        effective_max_zoom: None,
        attribution: "&copy; <a href=\"https://waymarkedtrails.org\">waymarkedtrails.org</a>",
        key_env: None,
        subdomains: &[],
    },
    ProviderDef {
        id: "openrailwaymap",
        name: "OpenRailwayMap",
        kind: ProviderKind::Overlay,
        format: TileFormat::Raster,
        url: "https://{s}.tiles.openrailwaymap.org/standard/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 19,
        effective_max_zoom: None,
        attribution: "&copy; <a href=\"https://www.openrailwaymap.org/\">OpenRailwayMap</a>",
        key_env: None,
        subdomains: &["a", "b", "c"],
    },
    ProviderDef {
        id: "hillshade",
        name: "Hillshade",
        kind: ProviderKind::Overlay,
        format: TileFormat::Raster,
        url: "https://tiles.wmflabs.org/hillshading/{z}/{x}/{y}.png",
        minzoom: 0,
        maxzoom: 18,
        effective_max_zoom: Some(16),
        attribution: "Hillshading: SRTM3 v2 (NASA)",
        key_env: None,
        subdomains: &[],
    },
    ProviderDef {
        id: "thunderforest-transport",
        name: "Thunderforest Transport",
        kind: ProviderKind::Overlay,
        format: TileFormat::Raster,
        url: "https://{s}.tile.thunderforest.com/transport/{z}/{x}/{y}.png?apikey={key}",
        minzoom: 0,
        maxzoom: 22,
        effective_max_zoom: None,
        attribution: "Maps &copy; <a href=\"https://www.thunderforest.com\">Thunderforest</a>",
        key_env: Some("THUNDERFOREST_API_KEY"),
        subdomains: &["a", "b", "c"],
    },
];
