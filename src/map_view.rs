//! The map itself: tile basemap, NDVI overlay, and feature layers drawn in
//! an egui_plot plot over normalized Web Mercator coordinates.
//!
//! Hit-testing happens in screen space: while drawing, every visible
//! feature records its screen position (points) or polyline (orbits); after
//! the plot closes, the pointer position is resolved against those, points
//! before lines, topmost layer first.

use crate::feature::{project, Geometry};
use crate::layer::LayerStack;
use crate::ndvi::NdviState;
use crate::panels::Selection;
use crate::style::{orbit_start_style, style_for};
use crate::tile::{visible_tiles, zoom_for_view, BasemapTiles, TileCoord};
use eframe::egui;
use egui_plot::{Line, Plot, PlotImage, PlotPoint, PlotPoints, Points};

const POINT_HIT_RADIUS_PX: f32 = 10.0;
const LINE_HIT_RADIUS_PX: f32 = 6.0;
/// How many zoom levels to climb looking for an already-loaded stand-in
/// while the exact tile is in flight.
const TILE_FALLBACK_LEVELS: u8 = 4;

pub struct MapResponse {
    /// `Some(selection)` when a feature was clicked, `Some(None)` when the
    /// click hit empty map, `None` when there was no click.
    pub clicked: Option<Option<Selection>>,
    pub hovered: Option<Selection>,
}

pub fn show_map(
    ui: &mut egui::Ui,
    stack: &LayerStack,
    tiles: &mut BasemapTiles,
    ndvi: &NdviState,
    ndvi_visible: bool,
    hovered: Option<Selection>,
) -> MapResponse {
    let width_px = ui.available_width();

    let mut point_hits: Vec<(Selection, egui::Pos2)> = Vec::new();
    let mut line_hits: Vec<(Selection, Vec<egui::Pos2>)> = Vec::new();

    let plot = Plot::new("tracking_map")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .include_x(-0.02)
        .include_x(1.02)
        .include_y(-0.02)
        .include_y(1.02)
        .cursor_color(egui::Color32::TRANSPARENT);

    let response = plot.show(ui, |plot_ui| {
        let bounds = plot_ui.plot_bounds();
        let (x0, x1) = (bounds.min()[0], bounds.max()[0]);
        let (y0, y1) = (bounds.min()[1], bounds.max()[1]);

        // Basemap tiles: request what the viewport needs, draw the best
        // already-loaded tile for each slot (coarser stand-ins first so
        // sharper tiles paint over them).
        let z = zoom_for_view(x1 - x0, width_px);
        let needed = visible_tiles(x0, x1, y0, y1, z);
        let mut drawable: Vec<(TileCoord, egui::TextureId)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for coord in needed {
            tiles.request(coord, stack.basemap);
            let mut candidate = Some(coord);
            let mut hops = 0u8;
            while let Some(c) = candidate {
                if let Some(id) = tiles.texture_id(&c) {
                    if seen.insert(c) {
                        drawable.push((c, id));
                    }
                    break;
                }
                if hops >= TILE_FALLBACK_LEVELS {
                    break;
                }
                candidate = c.parent();
                hops += 1;
            }
        }
        drawable.sort_by_key(|(c, _)| c.z);
        for (c, id) in drawable {
            let n = (1u32 << c.z) as f64;
            let center = PlotPoint::new((c.x as f64 + 0.5) / n, 1.0 - (c.y as f64 + 0.5) / n);
            let size = egui::Vec2::splat((1.0 / n) as f32);
            plot_ui.image(PlotImage::new(id, center, size));
        }

        if ndvi_visible {
            if let NdviState::Loaded { texture, bounds } = ndvi {
                let [min_lon, min_lat, max_lon, max_lat] = *bounds;
                let p0 = project(min_lon, min_lat);
                let p1 = project(max_lon, max_lat);
                let center = PlotPoint::new((p0[0] + p1[0]) / 2.0, (p0[1] + p1[1]) / 2.0);
                let size = egui::vec2((p1[0] - p0[0]) as f32, (p1[1] - p0[1]) as f32);
                plot_ui.image(PlotImage::new(texture, center, size));
            }
        }

        for layer in &stack.layers {
            if !layer.visible {
                continue;
            }
            for (index, feature) in layer.features.iter().enumerate() {
                let selection = Selection { layer: layer.kind, index };
                let hover = hovered == Some(selection);
                let style = style_for(feature.kind, hover);
                match &feature.geometry {
                    Geometry::Point(p) => {
                        plot_ui.points(
                            Points::new(PlotPoints::new(vec![*p]))
                                .color(style.color)
                                .radius(style.radius)
                                .filled(true),
                        );
                        let screen = plot_ui.screen_from_plot(PlotPoint::new(p[0], p[1]));
                        point_hits.push((selection, screen));
                    }
                    Geometry::Line(pts) => {
                        plot_ui.line(
                            Line::new(PlotPoints::new(pts.clone()))
                                .color(style.color)
                                .width(style.stroke_width),
                        );
                        // Satellite marker at the track start.
                        if let Some(start) = feature.line_start() {
                            let marker = orbit_start_style(hover);
                            plot_ui.points(
                                Points::new(PlotPoints::new(vec![start]))
                                    .color(marker.color)
                                    .radius(marker.radius)
                                    .filled(true),
                            );
                            let screen = plot_ui.screen_from_plot(PlotPoint::new(start[0], start[1]));
                            point_hits.push((selection, screen));
                        }
                        let screen_line: Vec<egui::Pos2> = pts
                            .iter()
                            .map(|p| plot_ui.screen_from_plot(PlotPoint::new(p[0], p[1])))
                            .collect();
                        line_hits.push((selection, screen_line));
                    }
                }
            }
        }
    });

    let hovered = response
        .response
        .hover_pos()
        .and_then(|pos| resolve_hit(pos, &point_hits, &line_hits));

    let clicked = if response.response.clicked() {
        let hit = response
            .response
            .interact_pointer_pos()
            .and_then(|pos| resolve_hit(pos, &point_hits, &line_hits));
        Some(hit)
    } else {
        None
    };

    MapResponse { clicked, hovered }
}

/// Topmost feature under the cursor: nearest point within range wins over
/// any line; among equals, later-drawn (higher layer, later feature) wins.
fn resolve_hit(
    pos: egui::Pos2,
    point_hits: &[(Selection, egui::Pos2)],
    line_hits: &[(Selection, Vec<egui::Pos2>)],
) -> Option<Selection> {
    let mut best: Option<(f32, Selection)> = None;
    for (selection, p) in point_hits.iter().rev() {
        let d = pos.distance(*p);
        if d <= POINT_HIT_RADIUS_PX && best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, *selection));
        }
    }
    if let Some((_, s)) = best {
        return Some(s);
    }
    for (selection, line) in line_hits.iter().rev() {
        for seg in line.windows(2) {
            let d = dist_to_segment(pos, seg[0], seg[1]);
            if d <= LINE_HIT_RADIUS_PX && best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, *selection));
            }
        }
    }
    best.map(|(_, s)| s)
}

fn dist_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use eframe::egui::pos2;

    fn sel(layer: LayerKind, index: usize) -> Selection {
        Selection { layer, index }
    }

    #[test]
    fn segment_distance() {
        let a = pos2(0.0, 0.0);
        let b = pos2(10.0, 0.0);
        assert_eq!(dist_to_segment(pos2(5.0, 3.0), a, b), 3.0);
        assert_eq!(dist_to_segment(pos2(-4.0, 0.0), a, b), 4.0);
        assert_eq!(dist_to_segment(pos2(13.0, 4.0), a, b), 5.0);
        assert_eq!(dist_to_segment(pos2(1.0, 1.0), a, a), pos2(1.0, 1.0).distance(a));
    }

    #[test]
    fn points_win_over_lines() {
        let points = vec![(sel(LayerKind::Stations, 0), pos2(100.0, 100.0))];
        let lines = vec![(sel(LayerKind::Orbits, 0), vec![pos2(90.0, 100.0), pos2(110.0, 100.0)])];
        let hit = resolve_hit(pos2(101.0, 101.0), &points, &lines).unwrap();
        assert_eq!(hit.layer, LayerKind::Stations);
    }

    #[test]
    fn nearest_point_wins() {
        let points = vec![
            (sel(LayerKind::Stations, 0), pos2(100.0, 100.0)),
            (sel(LayerKind::Satellites, 0), pos2(104.0, 100.0)),
        ];
        let hit = resolve_hit(pos2(103.0, 100.0), &points, &[]).unwrap();
        assert_eq!(hit.layer, LayerKind::Satellites);
    }

    #[test]
    fn out_of_range_is_no_hit() {
        let points = vec![(sel(LayerKind::Stations, 0), pos2(100.0, 100.0))];
        assert!(resolve_hit(pos2(150.0, 150.0), &points, &[]).is_none());
    }

    #[test]
    fn line_is_hit_along_its_length() {
        let lines = vec![(sel(LayerKind::Orbits, 2), vec![pos2(0.0, 0.0), pos2(200.0, 0.0)])];
        let hit = resolve_hit(pos2(120.0, 4.0), &[], &lines).unwrap();
        assert_eq!(hit, sel(LayerKind::Orbits, 2));
        assert!(resolve_hit(pos2(120.0, 40.0), &[], &lines).is_none());
    }
}
