//! Site records returned by the geometry REST endpoint.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{
    style::expr::{CONFIDENCE_PROPERTY, CONTEXT_PROPERTY},
    types::{LngLat, RecordId},
};

/// Point used when a record's geometry cannot be parsed.
pub const DEFAULT_POINT: LngLat = LngLat { lng: 16.6, lat: 40.9 };

const GEOMETRY_TYPES: [&str; 6] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
];

/// One archaeological site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    /// Backend id.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Cultural-context text.
    pub ambito: Option<String>,
    /// Location confidence (`incerta` marks uncertain locations).
    pub confidence: Option<String>,
    /// GeoJSON geometry (always valid).
    pub geometry: Value,
    /// True when `geometry` is the fallback point.
    pub geometry_fallback: bool,
    /// Remaining scalar attributes.
    pub properties: Map<String, Value>,
}

impl SiteRecord {
    /// Parses one row. Rows without an id are rejected; a bad geometry is
    /// replaced by [`DEFAULT_POINT`].
    pub fn from_row(row: &Value) -> Option<Self> {
        let obj = row.as_object()?;
        let id = match obj.get("id")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };

        let raw_geometry = obj.get("geometry").or_else(|| obj.get("geom"));
        let (geometry, geometry_fallback) = match raw_geometry.and_then(parse_geometry) {
            Some(g) => (g, false),
            None => {
                tracing::warn!(record = %id, "unparseable geometry, using default point");
                (default_point(), true)
            }
        };

        let known = [
            "id",
            "geometry",
            "geom",
            "nome",
            "name",
            "descrizione",
            "description",
            CONTEXT_PROPERTY,
            CONFIDENCE_PROPERTY,
        ];
        let properties = obj
            .iter()
            .filter(|(k, v)| !known.contains(&k.as_str()) && !v.is_object())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            name: text(&["nome", "name"]).unwrap_or_else(|| id.clone()),
            description: text(&["descrizione", "description"]),
            ambito: text(&[CONTEXT_PROPERTY]),
            confidence: text(&[CONFIDENCE_PROPERTY]),
            id,
            geometry,
            geometry_fallback,
            properties,
        })
    }

    /// GeoJSON feature with the styling attributes as properties.
    pub fn to_feature(&self) -> Value {
        let mut props = self.properties.clone();
        props.insert("id".to_string(), json!(self.id));
        props.insert("name".to_string(), json!(self.name));
        if let Some(d) = &self.description {
            props.insert("description".to_string(), json!(d));
        }
        if let Some(a) = &self.ambito {
            props.insert(CONTEXT_PROPERTY.to_string(), json!(a));
        }
        if let Some(c) = &self.confidence {
            props.insert(CONFIDENCE_PROPERTY.to_string(), json!(c));
        }
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": self.geometry,
            "properties": props,
        })
    }

    /// Case-insensitive substring match over name and description.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle_lower))
    }
}

/// Parses every row; rows without an id are skipped, the rest never fail.
pub fn parse_rows(rows: &[Value]) -> Vec<SiteRecord> {
    rows.iter()
        .filter_map(|row| {
            let record = SiteRecord::from_row(row);
            if record.is_none() {
                tracing::warn!("skipping row without id");
            }
            record
        })
        .collect()
}

/// `FeatureCollection` of `records`, in order.
pub fn feature_collection(records: &[SiteRecord]) -> Value {
    let features: Vec<Value> = records.iter().map(SiteRecord::to_feature).collect();
    json!({"type": "FeatureCollection", "features": features})
}

/// Geometry given as an object or as stringified JSON. Returns `None` when
/// the type is unknown or the coordinates are not numeric.
pub fn parse_geometry(raw: &Value) -> Option<Value> {
    let value = match raw {
        Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
        Value::Object(_) => raw.clone(),
        _ => return None,
    };
    let kind = value.get("type")?.as_str()?;
    if !GEOMETRY_TYPES.contains(&kind) {
        return None;
    }
    let coordinates = value.get("coordinates")?;
    let depth = match kind {
        "Point" => 0,
        "MultiPoint" | "LineString" => 1,
        "MultiLineString" | "Polygon" => 2,
        _ => 3,
    };
    valid_coordinates(coordinates, depth).then_some(value)
}

fn valid_coordinates(value: &Value, depth: usize) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };
    if depth == 0 {
        return items.len() >= 2 && items.iter().all(|c| c.as_f64().is_some_and(f64::is_finite));
    }
    !items.is_empty() && items.iter().all(|c| valid_coordinates(c, depth - 1))
}

fn default_point() -> Value {
    json!({"type": "Point", "coordinates": [DEFAULT_POINT.lng, DEFAULT_POINT.lat]})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringified_geometry_is_accepted() {
        let row = json!({
            "id": 7,
            "nome": "Egnazia",
            "geometry": "{\"type\":\"Point\",\"coordinates\":[17.39,40.88]}",
            "ubicazione_confidenza": "certa",
            "comune": "Fasano"
        });
        let record = SiteRecord::from_row(&row).expect("record");
        assert_eq!(record.id, "7");
        assert!(!record.geometry_fallback);
        assert_eq!(record.geometry["coordinates"][0], 17.39);
        assert_eq!(record.properties.get("comune"), Some(&json!("Fasano")));
    }

    #[test]
    fn bad_geometry_falls_back_without_failing_batch() {
        let rows = vec![
            json!({"id": "a", "geometry": "{broken"}),
            json!({"nome": "no id"}),
            json!({"id": "b", "geometry": {"type": "Polygon", "coordinates": [[["x", 1]]]}}),
            json!({"id": "c", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}),
        ];
        let records = parse_rows(&rows);
        assert_eq!(records.len(), 3);
        assert!(records[0].geometry_fallback);
        assert!(records[1].geometry_fallback);
        assert!(!records[2].geometry_fallback);
        assert_eq!(records[0].geometry, default_point());
    }

    #[test]
    fn features_carry_styling_properties() {
        let record = SiteRecord::from_row(&json!({
            "id": "s1",
            "name": "Vaste",
            "ambito": "Messapico",
            "ubicazione_confidenza": "incerta"
        }))
        .expect("record");
        let fc = feature_collection(&[record]);
        let props = &fc["features"][0]["properties"];
        assert_eq!(props["ambito"], "Messapico");
        assert_eq!(props["ubicazione_confidenza"], "incerta");
        assert_eq!(fc["features"][0]["id"], "s1");
    }
}
