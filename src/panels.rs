//! Feature detail panels.
//!
//! A click on the map selects at most one feature; exactly one panel
//! (satellite / station / orbit / observer / unknown) renders for it in the
//! right-hand side panel. All display values come from the normalized
//! record; the original JSON is available in a collapsible raw viewer.

use crate::feature::{FeatureKind, Geometry, MapFeature};
use crate::layer::LayerKind;
use eframe::egui;

const EARTH_RADIUS_KM: f64 = 6371.0;
const EARTH_MU: f64 = 398_600.4418;
const MINUTES_PER_DAY: f64 = 1440.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Selection {
    pub layer: LayerKind,
    pub index: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PanelKind {
    Satellite,
    Station,
    Orbit,
    Observer,
    Unknown,
}

pub fn panel_for(feature: &MapFeature) -> PanelKind {
    match feature.kind {
        FeatureKind::Satellite => PanelKind::Satellite,
        FeatureKind::Station => PanelKind::Station,
        FeatureKind::Orbit => PanelKind::Orbit,
        FeatureKind::Observer => PanelKind::Observer,
        FeatureKind::Unknown => PanelKind::Unknown,
    }
}

pub fn show(ui: &mut egui::Ui, feature: &MapFeature) {
    match panel_for(feature) {
        PanelKind::Satellite => satellite_panel(ui, feature),
        PanelKind::Station => station_panel(ui, feature),
        PanelKind::Orbit => orbit_panel(ui, feature),
        PanelKind::Observer => observer_panel(ui),
        PanelKind::Unknown => unknown_panel(ui, feature),
    }
    ui.add_space(8.0);
    raw_viewer(ui, feature);
}

fn header(ui: &mut egui::Ui, feature: &MapFeature) {
    ui.heading(feature.record.display_name());
    ui.label(egui::RichText::new(feature.kind.label()).weak());
    ui.separator();
}

fn row(ui: &mut egui::Ui, label: &str, value: String) {
    ui.label(label);
    ui.label(value);
    ui.end_row();
}

fn opt_row(ui: &mut egui::Ui, label: &str, value: Option<String>) {
    if let Some(v) = value {
        row(ui, label, v);
    }
}

fn station_panel(ui: &mut egui::Ui, feature: &MapFeature) {
    header(ui, feature);
    let r = &feature.record;
    egui::Grid::new("station_panel").num_columns(2).show(ui, |ui| {
        opt_row(ui, "ID:", r.id.clone());
        opt_row(ui, "Country:", r.country.clone());
        opt_row(ui, "Latitude:", r.lat.map(|v| format!("{:.4}°", v)));
        opt_row(ui, "Longitude:", r.lon.map(|v| format!("{:.4}°", v)));
        opt_row(ui, "Elevation:", r.elevation_m.map(|v| format!("{:.0} m", v)));
    });
}

fn satellite_panel(ui: &mut egui::Ui, feature: &MapFeature) {
    header(ui, feature);
    let r = &feature.record;
    egui::Grid::new("satellite_panel").num_columns(2).show(ui, |ui| {
        opt_row(ui, "NORAD ID:", r.id.clone());
        opt_row(ui, "Latitude:", r.lat.map(|v| format!("{:.4}°", v)));
        opt_row(ui, "Longitude:", r.lon.map(|v| format!("{:.4}°", v)));
        opt_row(ui, "Altitude:", r.altitude_km.map(|v| format!("{:.0} km", v)));
    });

    if let (Some(tle1), Some(tle2)) = (&r.tle1, &r.tle2) {
        ui.add_space(6.0);
        ui.label(egui::RichText::new("Orbital elements").strong());
        match tle_orbit_facts(r.display_name(), tle1, tle2) {
            Some(facts) => {
                egui::Grid::new("tle_facts").num_columns(2).show(ui, |ui| {
                    row(ui, "Inclination:", format!("{:.2}°", facts.inclination_deg));
                    row(ui, "Period:", format!("{:.1} min", facts.period_min));
                    row(ui, "Mean altitude:", format!("{:.0} km", facts.altitude_km));
                    row(ui, "Eccentricity:", format!("{:.5}", facts.eccentricity));
                });
            }
            None => {
                // TLE lines that do not parse are still shown verbatim.
                ui.label(egui::RichText::new(tle1).monospace().size(10.0));
                ui.label(egui::RichText::new(tle2).monospace().size(10.0));
            }
        }
    }
}

fn orbit_panel(ui: &mut egui::Ui, feature: &MapFeature) {
    header(ui, feature);
    let r = &feature.record;
    let points = match &feature.geometry {
        Geometry::Line(pts) => pts.len(),
        Geometry::Point(_) => 0,
    };
    egui::Grid::new("orbit_panel").num_columns(2).show(ui, |ui| {
        opt_row(ui, "Period:", r.period_min.map(|v| format!("{:.1} min", v)));
        row(ui, "Track points:", points.to_string());
        if let Some((lat, lon)) = r.track.first() {
            row(ui, "Start:", format!("{:.2}°, {:.2}°", lat, lon));
        }
        if let Some((lat, lon)) = r.track.last() {
            row(ui, "End:", format!("{:.2}°, {:.2}°", lat, lon));
        }
    });
}

fn observer_panel(ui: &mut egui::Ui) {
    ui.heading("Observer");
    ui.separator();
    ui.label("Your configured observing position. Pass predictions and \
              look angles are computed relative to this point.");
}

fn unknown_panel(ui: &mut egui::Ui, feature: &MapFeature) {
    ui.heading("Unknown feature");
    ui.separator();
    let dump = serde_json::to_string_pretty(&feature.raw)
        .unwrap_or_else(|_| "<unprintable>".to_string());
    ui.label(egui::RichText::new(dump).monospace().size(10.0));
}

fn raw_viewer(ui: &mut egui::Ui, feature: &MapFeature) {
    egui::CollapsingHeader::new("Raw record").show(ui, |ui| {
        let dump = serde_json::to_string_pretty(&feature.raw)
            .unwrap_or_else(|_| "<unprintable>".to_string());
        egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
            ui.label(egui::RichText::new(dump).monospace().size(10.0));
        });
    });
}

pub struct TleOrbitFacts {
    pub inclination_deg: f64,
    pub period_min: f64,
    pub altitude_km: f64,
    pub eccentricity: f64,
}

/// Orbit facts derived from a TLE pair, or `None` when the lines do not
/// parse as elements.
pub fn tle_orbit_facts(name: &str, line1: &str, line2: &str) -> Option<TleOrbitFacts> {
    let elements =
        sgp4::Elements::from_tle(Some(name.to_string()), line1.as_bytes(), line2.as_bytes()).ok()?;
    let mean_motion = elements.mean_motion;
    if !(mean_motion.is_finite() && mean_motion > 0.0) {
        return None;
    }
    Some(TleOrbitFacts {
        inclination_deg: elements.inclination,
        period_min: MINUTES_PER_DAY / mean_motion,
        altitude_km: mean_motion_to_altitude_km(mean_motion),
        eccentricity: elements.eccentricity,
    })
}

fn mean_motion_to_altitude_km(n_revs_per_day: f64) -> f64 {
    let n_rad_s = n_revs_per_day * 2.0 * std::f64::consts::PI / 86400.0;
    let a = (EARTH_MU / (n_rad_s * n_rad_s)).powf(1.0 / 3.0);
    a - EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{orbit_feature, point_feature, observer_feature};
    use serde_json::json;

    #[test]
    fn station_feature_gets_exactly_the_station_panel() {
        let f = point_feature(FeatureKind::Station, &json!({"name": "X", "lat": 1.0, "lon": 2.0}))
            .unwrap();
        assert_eq!(panel_for(&f), PanelKind::Station);
        assert_ne!(panel_for(&f), PanelKind::Satellite);
    }

    #[test]
    fn every_kind_maps_to_one_panel() {
        let sat = point_feature(FeatureKind::Satellite, &json!({"lat": 0.0, "lon": 0.0})).unwrap();
        let orbit = orbit_feature(&json!({"track": [[0.0, 0.0]]})).unwrap();
        let obs = observer_feature(10.0, 20.0);
        let unknown = point_feature(FeatureKind::Unknown, &json!({"lat": 0.0, "lon": 0.0})).unwrap();
        assert_eq!(panel_for(&sat), PanelKind::Satellite);
        assert_eq!(panel_for(&orbit), PanelKind::Orbit);
        assert_eq!(panel_for(&obs), PanelKind::Observer);
        assert_eq!(panel_for(&unknown), PanelKind::Unknown);
    }

    #[test]
    fn iss_tle_yields_plausible_orbit_facts() {
        let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
        let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
        let facts = tle_orbit_facts("ISS (ZARYA)", line1, line2).expect("valid TLE");
        assert!((facts.inclination_deg - 51.64).abs() < 0.01);
        assert!(facts.period_min > 85.0 && facts.period_min < 95.0);
        assert!(facts.altitude_km > 300.0 && facts.altitude_km < 450.0);
    }

    #[test]
    fn garbage_tle_yields_nothing() {
        assert!(tle_orbit_facts("X", "not a tle", "also not").is_none());
    }
}
