//! Canonical record normalization.
//!
//! Upstream feeds disagree on field names (`lat` vs `latitude`, `lon` vs
//! `lng` vs `long`, ...), so every record passes through one normalization
//! step before feature construction or panel rendering. Field lookup walks
//! an ordered alias chain; the first candidate that resolves to a finite
//! number (or non-empty string) wins.

use serde_json::Value;

pub const LAT_KEYS: &[&str] = &["lat", "latitude", "Lat"];
pub const LON_KEYS: &[&str] = &["lon", "lng", "long", "longitude", "Lon"];
pub const ID_KEYS: &[&str] = &["id", "norad_id", "norad", "sat_id"];
pub const NAME_KEYS: &[&str] = &["name", "callsign", "station_name", "title"];
pub const ALT_KEYS: &[&str] = &["alt", "altitude", "alt_km"];
pub const ELEV_KEYS: &[&str] = &["elevation", "elev", "height_m"];
pub const TLE1_KEYS: &[&str] = &["tle1", "tle_line1", "line1"];
pub const TLE2_KEYS: &[&str] = &["tle2", "tle_line2", "line2"];
pub const TRACK_KEYS: &[&str] = &["track", "path"];
pub const PERIOD_KEYS: &[&str] = &["period", "period_min", "period_minutes"];

/// Normalized view over one raw JSON record. Absent or malformed fields
/// stay `None`; nothing here is an error.
#[derive(Clone, Debug, Default)]
pub struct Record {
    pub id: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude_km: Option<f64>,
    pub elevation_m: Option<f64>,
    pub country: Option<String>,
    pub tle1: Option<String>,
    pub tle2: Option<String>,
    pub period_min: Option<f64>,
    /// Valid (lat, lon) pairs of an orbit track; malformed entries skipped.
    pub track: Vec<(f64, f64)>,
}

impl Record {
    pub fn normalize(value: &Value) -> Record {
        Record {
            id: id_field(value),
            name: str_field(value, NAME_KEYS),
            lat: num_field(value, LAT_KEYS),
            lon: num_field(value, LON_KEYS),
            altitude_km: num_field(value, ALT_KEYS),
            elevation_m: num_field(value, ELEV_KEYS),
            country: str_field(value, &["country", "country_code"]),
            tle1: str_field(value, TLE1_KEYS),
            tle2: str_field(value, TLE2_KEYS),
            period_min: num_field(value, PERIOD_KEYS),
            track: track_field(value),
        }
    }

    pub fn live_key(&self) -> Option<String> {
        self.id.clone().or_else(|| self.name.clone())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// First alias that is a finite number. String values are coerced, so
/// `"10.5"` resolves and `"bad"` falls through to the next alias.
pub fn num_field(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let v = match value.get(key) {
            Some(v) => v,
            None => continue,
        };
        let n = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(n) = n {
            if n.is_finite() {
                return Some(n);
            }
        }
    }
    None
}

pub fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// Identifiers arrive as numbers or strings depending on the feed.
fn id_field(value: &Value) -> Option<String> {
    for key in ID_KEYS {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn track_field(value: &Value) -> Vec<(f64, f64)> {
    for key in TRACK_KEYS {
        if let Some(points) = value.get(key).and_then(Value::as_array) {
            return points
                .iter()
                .filter_map(|p| {
                    let pair = p.as_array()?;
                    let lat = pair.first()?.as_f64().filter(|v| v.is_finite())?;
                    let lon = pair.get(1)?.as_f64().filter(|v| v.is_finite())?;
                    Some((lat, lon))
                })
                .collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_chain_first_finite_wins() {
        let v = json!({"lat": "bad", "latitude": 10.0, "lng": 20.0});
        let r = Record::normalize(&v);
        assert_eq!(r.lat, Some(10.0));
        assert_eq!(r.lon, Some(20.0));
    }

    #[test]
    fn string_coordinates_are_coerced() {
        let v = json!({"lat": "10.5", "lon": "-3.25"});
        let r = Record::normalize(&v);
        assert_eq!(r.lat, Some(10.5));
        assert_eq!(r.lon, Some(-3.25));
    }

    #[test]
    fn missing_coordinates_stay_none() {
        let v = json!({"name": "X", "lat": "bad", "altitude": null});
        let r = Record::normalize(&v);
        assert_eq!(r.lat, None);
        assert_eq!(r.lon, None);
        assert_eq!(r.altitude_km, None);
    }

    #[test]
    fn numeric_id_is_stringified() {
        let v = json!({"norad_id": 25544, "name": "ISS"});
        let r = Record::normalize(&v);
        assert_eq!(r.id.as_deref(), Some("25544"));
        assert_eq!(r.live_key().as_deref(), Some("25544"));
    }

    #[test]
    fn live_key_falls_back_to_name() {
        let v = json!({"name": "NOAA 19"});
        let r = Record::normalize(&v);
        assert_eq!(r.live_key().as_deref(), Some("NOAA 19"));
        assert_eq!(Record::normalize(&json!({})).live_key(), None);
    }

    #[test]
    fn track_skips_malformed_pairs() {
        let v = json!({"track": [[10.0, 20.0], [1.0], "junk", [null, 5.0], [11.0, 21.0]]});
        let r = Record::normalize(&v);
        assert_eq!(r.track, vec![(10.0, 20.0), (11.0, 21.0)]);
    }

    #[test]
    fn path_is_a_track_alias() {
        let v = json!({"path": [[0.0, 0.0]]});
        assert_eq!(Record::normalize(&v).track.len(), 1);
    }
}
