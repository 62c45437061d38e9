//! Shared primitive IDs and map-related enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tile provider identifier (`osm-standard`, `osm-data-overlay`, ...).
pub type ProviderId = String;
/// Vocabulary term identifier used by attribute filters.
pub type TermId = String;
/// Backend record identifier.
pub type RecordId = String;

/// Whether a provider is an exclusive basemap or an additive overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// At most one may be materialized at a time.
    Basemap,
    /// Any number may be materialized together.
    Overlay,
}

/// Tile payload format served by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    /// Image tiles.
    Raster,
    /// Mapbox vector tiles.
    Vector,
}

/// Fixed application data layers backed by the vector tile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLayer {
    /// Archaeological sites (points and polygons).
    Sites,
    /// Province boundaries.
    Province,
    /// Municipality boundaries.
    Comuni,
}

impl DataLayer {
    /// All data layers in draw order (bottom first).
    pub const ALL: [DataLayer; 3] = [DataLayer::Province, DataLayer::Comuni, DataLayer::Sites];

    /// Layer name as used by the tile endpoint and the URL codec.
    pub fn name(self) -> &'static str {
        match self {
            DataLayer::Sites => "sites",
            DataLayer::Province => "province",
            DataLayer::Comuni => "comuni",
        }
    }

    /// Parses a layer name, returning `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sites" => Some(DataLayer::Sites),
            "province" => Some(DataLayer::Province),
            "comuni" => Some(DataLayer::Comuni),
            _ => None,
        }
    }
}

impl fmt::Display for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// Geographic bounding box `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    /// Minimum longitude.
    pub west: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Maximum latitude.
    pub north: f64,
}

impl Bbox {
    /// Returns true when `p` lies inside the box (edges included).
    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }
}

/// Monotonic view-state revision number.
pub type Generation = u64;
