//! Layer management: independently toggleable feature groups over a
//! swappable basemap.
//!
//! Overlay stacking order is fixed by `LayerKind` rank regardless of which
//! dataset finishes loading first; swapping the basemap touches only the
//! base tile source and never the overlays.

use crate::feature::MapFeature;
use crate::tile::Basemap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerKind {
    Orbits,
    Stations,
    Satellites,
    Live,
}

impl LayerKind {
    /// Bottom-to-top drawing order.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Orbits,
        LayerKind::Stations,
        LayerKind::Satellites,
        LayerKind::Live,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Orbits => "Orbits",
            LayerKind::Stations => "Ground stations",
            LayerKind::Satellites => "Satellites",
            LayerKind::Live => "Live satellites",
        }
    }
}

pub struct Layer {
    pub kind: LayerKind,
    pub features: Vec<MapFeature>,
    pub visible: bool,
}

pub struct LayerStack {
    pub basemap: Basemap,
    pub layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        LayerStack {
            basemap: Basemap::Imagery,
            layers: LayerKind::ALL
                .iter()
                .map(|&kind| Layer { kind, features: Vec::new(), visible: true })
                .collect(),
        }
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        self.layers.iter().find(|l| l.kind == kind).expect("all kinds present")
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        self.layers.iter_mut().find(|l| l.kind == kind).expect("all kinds present")
    }

    pub fn set_visible(&mut self, kind: LayerKind, visible: bool) {
        self.layer_mut(kind).visible = visible;
    }

    /// Returns true when the basemap actually changed, so the caller can
    /// invalidate the tile cache.
    pub fn set_basemap(&mut self, basemap: Basemap) -> bool {
        if self.basemap == basemap {
            return false;
        }
        self.basemap = basemap;
        true
    }

    pub fn feature(&self, kind: LayerKind, index: usize) -> Option<&MapFeature> {
        self.layer(kind).features.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{point_feature, FeatureKind};
    use serde_json::json;

    fn stack_with_features() -> LayerStack {
        let mut stack = LayerStack::new();
        let f = point_feature(FeatureKind::Station, &json!({"lat": 1.0, "lon": 2.0})).unwrap();
        stack.layer_mut(LayerKind::Stations).features.push(f.clone());
        stack.layer_mut(LayerKind::Satellites).features.push(f);
        stack
    }

    #[test]
    fn visibility_toggles_are_independent() {
        let mut stack = stack_with_features();
        stack.set_visible(LayerKind::Stations, false);
        assert!(!stack.layer(LayerKind::Stations).visible);
        assert!(stack.layer(LayerKind::Satellites).visible);
        assert!(stack.layer(LayerKind::Orbits).visible);
        stack.set_visible(LayerKind::Stations, true);
        assert!(stack.layer(LayerKind::Stations).visible);
    }

    #[test]
    fn basemap_swap_preserves_overlays() {
        let mut stack = stack_with_features();
        let kinds_before: Vec<_> = stack.layers.iter().map(|l| l.kind).collect();
        let counts_before: Vec<_> = stack.layers.iter().map(|l| l.features.len()).collect();

        assert!(stack.set_basemap(Basemap::Streets));
        assert_eq!(stack.basemap, Basemap::Streets);
        assert!(!stack.set_basemap(Basemap::Streets));

        let kinds_after: Vec<_> = stack.layers.iter().map(|l| l.kind).collect();
        let counts_after: Vec<_> = stack.layers.iter().map(|l| l.features.len()).collect();
        assert_eq!(kinds_before, kinds_after);
        assert_eq!(counts_before, counts_after);
    }

    #[test]
    fn stacking_order_is_fixed() {
        let stack = LayerStack::new();
        let kinds: Vec<_> = stack.layers.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, LayerKind::ALL.to_vec());
    }
}
