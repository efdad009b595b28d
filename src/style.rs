//! Visual styles per feature kind, with a hover-emphasis variant.

use crate::feature::FeatureKind;
use eframe::egui::Color32;

pub const HOVER_SCALE: f32 = 1.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStyle {
    pub color: Color32,
    // Both in pixels.
    pub radius: f32,
    pub stroke_width: f32,
}

pub fn style_for(kind: FeatureKind, hover: bool) -> FeatureStyle {
    let base = match kind {
        FeatureKind::Observer => FeatureStyle {
            color: Color32::from_rgb(255, 215, 0),
            radius: 6.0,
            stroke_width: 1.5,
        },
        FeatureKind::Station => FeatureStyle {
            color: Color32::from_rgb(50, 205, 50),
            radius: 5.0,
            stroke_width: 1.5,
        },
        FeatureKind::Satellite => FeatureStyle {
            color: Color32::from_rgb(30, 144, 255),
            radius: 4.5,
            stroke_width: 1.5,
        },
        FeatureKind::Orbit => FeatureStyle {
            color: Color32::from_rgb(238, 130, 238),
            radius: 4.0,
            stroke_width: 1.5,
        },
        FeatureKind::Unknown => FeatureStyle {
            color: Color32::from_rgb(200, 200, 200),
            radius: 4.0,
            stroke_width: 1.0,
        },
    };
    if hover {
        FeatureStyle {
            color: brighten(base.color),
            radius: base.radius * HOVER_SCALE,
            stroke_width: base.stroke_width + 1.0,
        }
    } else {
        base
    }
}

// Orbit tracks get a satellite-style marker at their first valid coordinate.
pub fn orbit_start_style(hover: bool) -> FeatureStyle {
    style_for(FeatureKind::Satellite, hover)
}

fn brighten(color: Color32) -> Color32 {
    Color32::from_rgb(
        color.r().saturating_add(60),
        color.g().saturating_add(60),
        color.b().saturating_add(60),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_scales_markers() {
        for kind in [
            FeatureKind::Observer,
            FeatureKind::Station,
            FeatureKind::Satellite,
            FeatureKind::Orbit,
            FeatureKind::Unknown,
        ] {
            let base = style_for(kind, false);
            let hover = style_for(kind, true);
            assert_eq!(hover.radius, base.radius * HOVER_SCALE);
            assert!(hover.stroke_width > base.stroke_width);
        }
    }

    #[test]
    fn hover_brightens_orbit_stroke() {
        let base = style_for(FeatureKind::Orbit, false);
        let hover = style_for(FeatureKind::Orbit, true);
        assert!(hover.color.r() >= base.color.r());
        assert!(hover.color.g() > base.color.g());
        assert_ne!(hover.color, base.color);
    }
}
