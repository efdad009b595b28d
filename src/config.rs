//! Application configuration: dataset endpoints, poll interval, observer.
//!
//! An optional `trackmap.json` in the working directory overrides the
//! defaults; a missing or unreadable file just means defaults (logged, not
//! fatal).

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub stations: String,
    pub satellites: String,
    pub orbits: String,
    pub live: String,
    pub ndvi: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            stations: "data/ground_stations.json".to_string(),
            satellites: "data/visible_satellites.json".to_string(),
            orbits: "data/orbits.json".to_string(),
            live: "data/live_satellites.json".to_string(),
            ndvi: "data/ndvi.json".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ObserverConfig {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoints: Endpoints,
    pub poll_interval_secs: f64,
    pub observer: Option<ObserverConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoints: Endpoints::default(),
            poll_interval_secs: crate::live::POLL_INTERVAL_SECS,
            observer: None,
        }
    }
}

impl AppConfig {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> AppConfig {
        match std::fs::read_to_string("trackmap.json") {
            Ok(body) => match serde_json::from_str(&body) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("trackmap.json is invalid, using defaults: {}", e);
                    AppConfig::default()
                }
            },
            Err(_) => AppConfig::default(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load() -> AppConfig {
        AppConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_endpoints() {
        let c = AppConfig::default();
        assert!(!c.endpoints.stations.is_empty());
        assert!(!c.endpoints.live.is_empty());
        assert_eq!(c.poll_interval_secs, 5.0);
        assert!(c.observer.is_none());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let c: AppConfig = serde_json::from_str(
            r#"{"endpoints": {"live": "http://example/live.json"}, "observer": {"lat": 59.3, "lon": 18.1}}"#,
        )
        .unwrap();
        assert_eq!(c.endpoints.live, "http://example/live.json");
        assert_eq!(c.endpoints.stations, Endpoints::default().stations);
        assert!(c.observer.is_some());
    }
}
