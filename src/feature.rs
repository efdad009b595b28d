//! Feature factory: raw records to map-renderable geometry.
//!
//! Geometry lives in normalized Web Mercator coordinates: x in [0, 1] from
//! 180°W to 180°E, y in [0, 1] from south to north. Tiles and features share
//! this space, so the plot needs no further projection.

use crate::record::Record;
use serde_json::Value;
use std::f64::consts::PI;

/// Latitudes beyond this are clamped (standard Web Mercator cutoff).
pub const MERCATOR_MAX_LAT: f64 = 85.05112878;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeatureKind {
    Observer,
    Station,
    Satellite,
    Orbit,
    Unknown,
}

impl FeatureKind {
    pub fn from_type_str(s: &str) -> FeatureKind {
        match s {
            "observer" => FeatureKind::Observer,
            "station" | "ground_station" => FeatureKind::Station,
            "satellite" => FeatureKind::Satellite,
            "orbit" => FeatureKind::Orbit,
            _ => FeatureKind::Unknown,
        }
    }

    /// Fallback used when no explicit type is attached: lines are orbits,
    /// a point named "Observer" is the observer, anything else is unknown.
    pub fn resolve(explicit: Option<&str>, geometry: &Geometry, name: &str) -> FeatureKind {
        if let Some(s) = explicit {
            return Self::from_type_str(s);
        }
        match geometry {
            Geometry::Line(_) => FeatureKind::Orbit,
            Geometry::Point(_) if name == "Observer" => FeatureKind::Observer,
            Geometry::Point(_) => FeatureKind::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureKind::Observer => "Observer",
            FeatureKind::Station => "Ground station",
            FeatureKind::Satellite => "Satellite",
            FeatureKind::Orbit => "Orbit",
            FeatureKind::Unknown => "Feature",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Geometry {
    Point([f64; 2]),
    Line(Vec<[f64; 2]>),
}

/// A renderable map object. `raw` keeps the original untouched JSON for
/// the detail panels.
#[derive(Clone, Debug)]
pub struct MapFeature {
    pub kind: FeatureKind,
    pub geometry: Geometry,
    pub record: Record,
    pub raw: Value,
}

impl MapFeature {
    /// First vertex of a line feature, for the orbit start marker.
    pub fn line_start(&self) -> Option<[f64; 2]> {
        match &self.geometry {
            Geometry::Line(pts) => pts.first().copied(),
            Geometry::Point(_) => None,
        }
    }
}

pub fn project(lon: f64, lat: f64) -> [f64; 2] {
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = (lon + 180.0) / 360.0;
    let y = (1.0 + lat.to_radians().tan().asinh() / PI) / 2.0;
    [x, y]
}

pub fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (2.0 * y - 1.0)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Point feature from a record, or `None` when neither latitude nor
/// longitude resolves under any alias. Dropping is silent; a feed full of
/// junk rows renders as an empty layer, not an error.
pub fn point_feature(kind: FeatureKind, raw: &Value) -> Option<MapFeature> {
    let record = Record::normalize(raw);
    let (lat, lon) = (record.lat?, record.lon?);
    // An explicit type field on the record wins over the caller's default.
    let kind = match raw.get("type").and_then(Value::as_str) {
        Some(s) => FeatureKind::from_type_str(s),
        None => kind,
    };
    Some(MapFeature {
        kind,
        geometry: Geometry::Point(project(lon, lat)),
        record,
        raw: raw.clone(),
    })
}

/// Line feature from an orbit record; a track with zero valid pairs
/// produces nothing.
pub fn orbit_feature(raw: &Value) -> Option<MapFeature> {
    let record = Record::normalize(raw);
    if record.track.is_empty() {
        return None;
    }
    let pts: Vec<[f64; 2]> = record.track.iter().map(|&(lat, lon)| project(lon, lat)).collect();
    let geometry = Geometry::Line(pts);
    let kind = FeatureKind::resolve(
        raw.get("type").and_then(Value::as_str),
        &geometry,
        record.display_name(),
    );
    Some(MapFeature { kind, geometry, record, raw: raw.clone() })
}

// Observer marker comes from configuration, not a feed.
pub fn observer_feature(lat: f64, lon: f64) -> MapFeature {
    let raw = serde_json::json!({"name": "Observer", "lat": lat, "lon": lon});
    MapFeature {
        kind: FeatureKind::Observer,
        geometry: Geometry::Point(project(lon, lat)),
        record: Record::normalize(&raw),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_round_trips() {
        let [x, y] = project(20.0, 10.0);
        let (lon, lat) = unproject(x, y);
        assert!((lon - 20.0).abs() < 1e-9);
        assert!((lat - 10.0).abs() < 1e-9);
        // Equator/meridian center of the unit square.
        assert_eq!(project(0.0, 0.0), [0.5, 0.5]);
    }

    #[test]
    fn station_record_becomes_marker() {
        let f = point_feature(FeatureKind::Station, &json!({"name": "X", "lat": 10, "lon": 20}))
            .expect("valid record");
        let p = match f.geometry {
            Geometry::Point(p) => p,
            _ => panic!("expected point"),
        };
        assert_eq!(p, project(20.0, 10.0));
        assert_eq!(f.record.display_name(), "X");
        assert_eq!(f.raw["name"], "X");
    }

    #[test]
    fn bad_latitude_yields_no_marker() {
        assert!(point_feature(FeatureKind::Station, &json!({"name": "Y", "lat": "bad", "lon": 20})).is_none());
        assert!(point_feature(FeatureKind::Satellite, &json!({"name": "Z"})).is_none());
    }

    #[test]
    fn orbit_with_one_valid_pair_yields_line() {
        let f = orbit_feature(&json!({"name": "O", "track": [[1.0], [10.0, 20.0]]})).unwrap();
        match f.geometry {
            Geometry::Line(ref pts) => assert_eq!(pts.len(), 1),
            _ => panic!("expected line"),
        }
        assert_eq!(f.line_start().unwrap(), project(20.0, 10.0));
    }

    #[test]
    fn all_malformed_track_yields_nothing() {
        assert!(orbit_feature(&json!({"track": [[1.0], ["a", "b"]]})).is_none());
        assert!(orbit_feature(&json!({"name": "no track"})).is_none());
    }

    #[test]
    fn explicit_type_field_overrides_caller_kind() {
        let f = point_feature(FeatureKind::Unknown, &json!({"type": "station", "lat": 1, "lon": 2}))
            .unwrap();
        assert_eq!(f.kind, FeatureKind::Station);
    }

    #[test]
    fn kind_fallback_from_geometry() {
        let line = Geometry::Line(vec![[0.0, 0.0]]);
        let pt = Geometry::Point([0.5, 0.5]);
        assert_eq!(FeatureKind::resolve(None, &line, ""), FeatureKind::Orbit);
        assert_eq!(FeatureKind::resolve(None, &pt, "Observer"), FeatureKind::Observer);
        assert_eq!(FeatureKind::resolve(None, &pt, "thing"), FeatureKind::Unknown);
        assert_eq!(FeatureKind::resolve(Some("ground_station"), &pt, ""), FeatureKind::Station);
    }
}
