//! Live-satellite feed reconciliation.
//!
//! Every poll re-reads the live feed and reconciles it against the live
//! layer by stable key (record id, falling back to name). Known keys move
//! their marker in place and replace the raw payload; unknown keys append a
//! new marker; keys absent from a response leave their marker where it was.
//! Records with no usable key or coordinates are skipped.

use crate::feature::{point_feature, project, FeatureKind, Geometry};
use crate::layer::Layer;
use crate::record::Record;
use serde_json::Value;
use std::collections::HashMap;

pub const POLL_INTERVAL_SECS: f64 = 5.0;

#[derive(Default)]
pub struct LiveState {
    /// Reconciliation key -> index into the live layer's feature list.
    keys: HashMap<String, usize>,
    /// Set while a poll is outstanding so ticks never overlap and a slow
    /// response cannot apply after a newer one.
    pub in_flight: bool,
    pub last_poll: Option<f64>,
    pub updates_applied: u64,
}

impl LiveState {
    pub fn due(&self, now: f64, interval: f64) -> bool {
        if self.in_flight {
            return false;
        }
        match self.last_poll {
            None => true,
            Some(t) => now - t >= interval,
        }
    }

    pub fn tracked(&self) -> usize {
        self.keys.len()
    }

    pub fn reconcile(&mut self, layer: &mut Layer, records: &[Value]) {
        for raw in records {
            let record = Record::normalize(raw);
            let key = match record.live_key() {
                Some(k) => k,
                None => continue,
            };
            match self.keys.get(&key) {
                Some(&idx) => {
                    // Move only when both new coordinates are finite.
                    if let (Some(lat), Some(lon)) = (record.lat, record.lon) {
                        if let Some(feature) = layer.features.get_mut(idx) {
                            feature.geometry = Geometry::Point(project(lon, lat));
                            feature.record = record;
                            feature.raw = raw.clone();
                            self.updates_applied += 1;
                        }
                    }
                }
                None => {
                    if let Some(feature) = point_feature(FeatureKind::Satellite, raw) {
                        self.keys.insert(key, layer.features.len());
                        layer.features.push(feature);
                    }
                }
            }
        }
    }
}
