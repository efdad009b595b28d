//! Application shell and eframe integration.
//!
//! Owns all mutable UI state explicitly (layer stack, live feed, tile
//! pipeline, selection) and threads it into the handlers; the update loop
//! drains fetch channels, drives the live-poll timer, and lays out the
//! sidebar, map, and detail panel.

use crate::config::AppConfig;
use crate::data::{self, Dataset, FetchResult, LoadState};
use crate::feature::{observer_feature, orbit_feature, point_feature, FeatureKind};
use crate::layer::{LayerKind, LayerStack};
use crate::live::LiveState;
use crate::map_view;
use crate::ndvi::{self, NdviImage, NdviState};
use crate::panels::{self, Selection};
use crate::tile::BasemapTiles;
use chrono::Local;
use eframe::egui;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::mpsc;

pub struct App {
    config: AppConfig,
    stack: LayerStack,
    dataset_states: HashMap<Dataset, LoadState>,
    data_tx: mpsc::Sender<FetchResult>,
    data_rx: mpsc::Receiver<FetchResult>,
    live: LiveState,
    last_live_update: Option<chrono::DateTime<Local>>,
    tiles: BasemapTiles,
    ndvi: NdviState,
    ndvi_visible: bool,
    ndvi_rx: Option<mpsc::Receiver<Result<NdviImage, String>>>,
    selection: Option<Selection>,
    hovered: Option<Selection>,
    show_side_panel: bool,
}

impl App {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load();
        let (data_tx, data_rx) = mpsc::channel();

        #[cfg(not(target_arch = "wasm32"))]
        let tiles = BasemapTiles::new(data::dirs_cache().join("trackmap").join("tiles"));
        #[cfg(target_arch = "wasm32")]
        let tiles = BasemapTiles::new();

        let mut stack = LayerStack::new();
        if let Some(obs) = config.observer {
            stack
                .layer_mut(LayerKind::Stations)
                .features
                .push(observer_feature(obs.lat, obs.lon));
        }

        let mut app = App {
            config,
            stack,
            dataset_states: HashMap::new(),
            data_tx,
            data_rx,
            live: LiveState::default(),
            last_live_update: None,
            tiles,
            ndvi: NdviState::NotLoaded,
            ndvi_visible: true,
            ndvi_rx: None,
            selection: None,
            hovered: None,
            show_side_panel: true,
        };

        // The three initial datasets load independently; a failure in one
        // leaves the others alone.
        app.request(Dataset::Stations);
        app.request(Dataset::Satellites);
        app.request(Dataset::Orbits);
        app
    }

    fn endpoint(&self, dataset: Dataset) -> &str {
        let e = &self.config.endpoints;
        match dataset {
            Dataset::Stations => &e.stations,
            Dataset::Satellites => &e.satellites,
            Dataset::Orbits => &e.orbits,
            Dataset::Live => &e.live,
            Dataset::Ndvi => &e.ndvi,
        }
    }

    fn request(&mut self, dataset: Dataset) {
        self.dataset_states.insert(dataset, LoadState::Loading);
        data::spawn_fetch(dataset, self.endpoint(dataset).to_string(), self.data_tx.clone());
    }

    fn apply(&mut self, dataset: Dataset, result: Result<Value, String>) {
        match (dataset, result) {
            (Dataset::Stations, Ok(doc)) => {
                let records = data::station_records(&doc);
                let layer = self.stack.layer_mut(LayerKind::Stations);
                layer.features.clear();
                if let Some(obs) = self.config.observer {
                    layer.features.push(observer_feature(obs.lat, obs.lon));
                }
                layer.features.extend(
                    records.iter().filter_map(|r| point_feature(FeatureKind::Station, r)),
                );
                let count = layer.features.len();
                self.dataset_states.insert(dataset, LoadState::Loaded { count });
            }
            (Dataset::Satellites, Ok(doc)) => {
                let records = data::array_records(&doc);
                let layer = self.stack.layer_mut(LayerKind::Satellites);
                layer.features = records
                    .iter()
                    .filter_map(|r| point_feature(FeatureKind::Satellite, r))
                    .collect();
                let count = layer.features.len();
                self.dataset_states.insert(dataset, LoadState::Loaded { count });
            }
            (Dataset::Orbits, Ok(doc)) => {
                let records = data::array_records(&doc);
                let layer = self.stack.layer_mut(LayerKind::Orbits);
                layer.features = records.iter().filter_map(orbit_feature).collect();
                let count = layer.features.len();
                self.dataset_states.insert(dataset, LoadState::Loaded { count });
            }
            (Dataset::Live, Ok(doc)) => {
                self.live.in_flight = false;
                let records = data::array_records(&doc);
                let layer = self.stack.layer_mut(LayerKind::Live);
                self.live.reconcile(layer, &records);
                self.last_live_update = Some(Local::now());
                let count = layer.features.len();
                self.dataset_states.insert(dataset, LoadState::Loaded { count });
            }
            (Dataset::Live, Err(e)) => {
                // Previous markers stay; the next tick retries naturally.
                self.live.in_flight = false;
                warn!("live feed fetch failed: {}", e);
                self.dataset_states.insert(dataset, LoadState::Failed(e));
            }
            (Dataset::Ndvi, Ok(doc)) => match ndvi::parse_payload(&doc) {
                Ok((url, bounds)) => {
                    info!("fetching NDVI image from {}", url);
                    let (tx, rx) = mpsc::channel();
                    self.ndvi_rx = Some(rx);
                    ndvi::spawn_image_fetch(url, bounds, tx);
                }
                Err(e) => {
                    warn!("NDVI service reported an error: {}", e);
                    self.fail_ndvi(e);
                }
            },
            (Dataset::Ndvi, Err(e)) => {
                warn!("NDVI request failed: {}", e);
                self.fail_ndvi(e);
            }
            (_, Err(e)) => {
                // Stations/satellites/orbits degrade to an empty layer.
                warn!("{} fetch failed: {}", dataset.label(), e);
                self.dataset_states.insert(dataset, LoadState::Failed(e));
            }
        }
    }

    fn drain_fetches(&mut self, ctx: &egui::Context) {
        let mut results: Vec<FetchResult> = Vec::new();
        while let Ok(r) = self.data_rx.try_recv() {
            results.push(r);
        }
        data::drain_pending(&mut results);
        for (dataset, result) in results {
            self.apply(dataset, result);
        }

        if let Some(rx) = self.ndvi_rx.take() {
            match rx.try_recv() {
                Ok(Ok(img)) => {
                    self.ndvi = NdviState::Loaded {
                        texture: ndvi::upload(ctx, &img),
                        bounds: img.bounds,
                    };
                }
                Ok(Err(e)) => {
                    warn!("NDVI image fetch failed: {}", e);
                    self.fail_ndvi(e);
                }
                Err(mpsc::TryRecvError::Empty) => self.ndvi_rx = Some(rx),
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.fail_ndvi("fetch worker exited".to_string());
                }
            }
        }
    }

    /// A failed refresh never discards an overlay that is already showing.
    fn fail_ndvi(&mut self, error: String) {
        if !matches!(self.ndvi, NdviState::Loaded { .. }) {
            self.ndvi = NdviState::Failed(error);
        }
    }

    fn tick_live(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        if self.live.due(now, self.config.poll_interval_secs) {
            self.live.in_flight = true;
            self.live.last_poll = Some(now);
            data::spawn_fetch(
                Dataset::Live,
                self.config.endpoints.live.clone(),
                self.data_tx.clone(),
            );
        }
    }

    fn refresh_ndvi(&mut self) {
        // The current overlay stays on screen until a replacement arrives.
        if !matches!(self.ndvi, NdviState::Loaded { .. }) {
            self.ndvi = NdviState::Loading;
        }
        self.request(Dataset::Ndvi);
    }

    fn show_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Basemap").strong());
        let mut basemap = self.stack.basemap;
        egui::ComboBox::from_id_salt("basemap")
            .selected_text(basemap.label())
            .show_ui(ui, |ui| {
                for b in crate::tile::Basemap::ALL {
                    ui.selectable_value(&mut basemap, b, b.label());
                }
            });
        if self.stack.set_basemap(basemap) {
            self.tiles.invalidate();
        }

        ui.separator();
        ui.label(egui::RichText::new("Layers").strong());
        for kind in LayerKind::ALL {
            let mut visible = self.stack.layer(kind).visible;
            if ui.checkbox(&mut visible, kind.label()).changed() {
                self.stack.set_visible(kind, visible);
            }
        }

        ui.separator();
        ui.label(egui::RichText::new("NDVI overlay").strong());
        ui.checkbox(&mut self.ndvi_visible, "Show NDVI");
        if ui.button("Refresh NDVI").clicked() {
            self.refresh_ndvi();
        }
        ui.label(egui::RichText::new(self.ndvi.status_line()).weak());

        ui.separator();
        ui.label(egui::RichText::new("Data").strong());
        for dataset in [Dataset::Stations, Dataset::Satellites, Dataset::Orbits, Dataset::Live] {
            let status = match self.dataset_states.get(&dataset) {
                None => "not loaded".to_string(),
                Some(LoadState::Loading) => "loading...".to_string(),
                Some(LoadState::Loaded { count }) => count.to_string(),
                Some(LoadState::Failed(e)) => format!("failed: {}", e),
            };
            ui.label(format!("{}: {}", dataset.label(), status));
        }
        if let Some(t) = self.last_live_update {
            ui.label(
                egui::RichText::new(format!(
                    "tracking {}, updated {}",
                    self.live.tracked(),
                    t.format("%H:%M:%S")
                ))
                .weak(),
            );
        }

        ui.separator();
        ui.label(
            egui::RichText::new(format!("trackmap {} {}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")))
                .weak()
                .small(),
        );
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_fetches(ctx);
        self.tiles.poll(ctx);
        self.tick_live(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let glyph = if self.show_side_panel { "\u{25C0}" } else { "\u{25B6}" };
                if ui.button(glyph).clicked() {
                    self.show_side_panel = !self.show_side_panel;
                }
                ui.heading("TrackMap");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(Local::now().format("%H:%M:%S").to_string()).weak());
                });
            });
        });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(220.0)
            .show_animated(ctx, self.show_side_panel, |ui| {
                self.show_sidebar(ui);
            });

        // Selection can dangle after a layer reload; treat that as cleared.
        let selected_feature = self
            .selection
            .and_then(|s| self.stack.feature(s.layer, s.index).cloned());
        if self.selection.is_some() && selected_feature.is_none() {
            self.selection = None;
        }
        if let Some(feature) = &selected_feature {
            egui::SidePanel::right("detail")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                        if ui.button("\u{2715}").clicked() {
                            self.selection = None;
                        }
                    });
                    panels::show(ui, feature);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let response = map_view::show_map(
                ui,
                &self.stack,
                &mut self.tiles,
                &self.ndvi,
                self.ndvi_visible,
                self.hovered,
            );
            self.hovered = response.hovered;
            if let Some(hit) = response.clicked {
                self.selection = hit;
            }
        });

        // Keep the live-poll timer ticking even when nothing repaints.
        ctx.request_repaint_after(std::time::Duration::from_millis(500));
    }
}
