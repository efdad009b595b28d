//! Slippy-map tile basemap: coordinate math, background fetching with a
//! disk cache, and an LRU texture cache.
//!
//! Fetch requests carry a generation counter; switching the basemap bumps
//! the generation so stale in-flight responses are discarded instead of
//! landing on the new basemap.

use eframe::egui;
use std::collections::HashMap;
use std::f64::consts::PI;

pub const TILE_SIZE_PX: f64 = 256.0;
pub const MAX_TILE_ZOOM: u8 = 19;
pub const MAX_CACHED_TEXTURES: usize = 512;

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    /// Next-lower-zoom tile containing this one, used as a stand-in while
    /// the exact tile is still loading.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord { x: self.x / 2, y: self.y / 2, z: self.z - 1 })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Basemap {
    Imagery,
    Streets,
    Topo,
}

impl Basemap {
    pub const ALL: [Basemap; 3] = [Basemap::Imagery, Basemap::Streets, Basemap::Topo];

    pub fn label(&self) -> &'static str {
        match self {
            Basemap::Imagery => "Satellite imagery",
            Basemap::Streets => "Streets",
            Basemap::Topo => "Topographic",
        }
    }

    fn service(&self) -> &'static str {
        match self {
            Basemap::Imagery => "World_Imagery",
            Basemap::Streets => "World_Street_Map",
            Basemap::Topo => "World_Topo_Map",
        }
    }

    pub fn tile_url(&self, coord: &TileCoord) -> String {
        format!(
            "https://server.arcgisonline.com/ArcGIS/rest/services/{}/MapServer/tile/{}/{}/{}",
            self.service(),
            coord.z,
            coord.y,
            coord.x
        )
    }
}

pub fn lon_lat_to_tile(lon: f64, lat: f64, z: u8) -> TileCoord {
    let n = (1u32 << z) as f64;
    let x = ((lon + 180.0) / 360.0 * n).floor() as i64;
    let ni = n as i64;
    let x = (((x % ni) + ni) % ni) as u32;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as u32;
    TileCoord { x, y: y.min(n as u32 - 1), z }
}

/// Tile zoom for a view showing `span_x` of the unit-mercator world across
/// `width_px` pixels, aiming for roughly one tile texel per screen pixel.
pub fn zoom_for_view(span_x: f64, width_px: f32) -> u8 {
    if span_x <= 0.0 || width_px <= 0.0 {
        return 0;
    }
    let tiles_across = width_px as f64 / TILE_SIZE_PX;
    let z = (tiles_across / span_x).log2().ceil() as i32;
    z.clamp(0, MAX_TILE_ZOOM as i32) as u8
}

/// Tiles covering the plot rect x0..x1, y0..y1 (unit-mercator, y up).
pub fn visible_tiles(x0: f64, x1: f64, y0: f64, y1: f64, z: u8) -> Vec<TileCoord> {
    let clamp01 = |v: f64| v.clamp(0.0, 1.0 - 1e-12);
    // Plot y runs south-to-north; tile rows count from the north.
    let (west, north) = crate::feature::unproject(clamp01(x0), clamp01(y1));
    let (east, south) = crate::feature::unproject(clamp01(x1), clamp01(y0));
    let nw = lon_lat_to_tile(west, north, z);
    let se = lon_lat_to_tile(east, south, z);
    let mut out = Vec::new();
    for y in nw.y..=se.y {
        for x in nw.x..=se.x {
            out.push(TileCoord { x, y, z });
        }
    }
    out
}

struct CacheSlot {
    handle: egui::TextureHandle,
    last_used: u64,
}

/// LRU cache of uploaded tile textures; eviction drops down to 3/4 capacity.
pub struct TileCache {
    entries: HashMap<TileCoord, CacheSlot>,
    access_counter: u64,
    max_entries: usize,
}

impl TileCache {
    pub fn new(max_entries: usize) -> Self {
        TileCache { entries: HashMap::new(), access_counter: 0, max_entries }
    }

    pub fn insert(&mut self, coord: TileCoord, handle: egui::TextureHandle) {
        self.access_counter += 1;
        let at = self.access_counter;
        self.entries.insert(coord, CacheSlot { handle, last_used: at });
        self.evict_if_needed();
    }

    pub fn get(&mut self, coord: &TileCoord) -> Option<&egui::TextureHandle> {
        self.access_counter += 1;
        let at = self.access_counter;
        self.entries.get_mut(coord).map(|slot| {
            slot.last_used = at;
            &slot.handle
        })
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.entries.contains_key(coord)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_if_needed(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let target = self.max_entries * 3 / 4;
        let mut by_age: Vec<(u64, TileCoord)> =
            self.entries.iter().map(|(c, s)| (s.last_used, *c)).collect();
        by_age.sort_by_key(|(last_used, _)| *last_used);
        let to_remove = self.entries.len().saturating_sub(target);
        for (_, coord) in by_age.into_iter().take(to_remove) {
            self.entries.remove(&coord);
        }
    }
}

pub struct TileFetchResult {
    pub coord: TileCoord,
    pub generation: u64,
    pub pixels: Vec<[u8; 3]>,
    pub width: u32,
    pub height: u32,
}

pub fn decode_tile_pixels(bytes: &[u8]) -> Option<(Vec<[u8; 3]>, u32, u32)> {
    let img = image::load_from_memory(bytes).ok()?.to_rgb8();
    let (w, h) = (img.width(), img.height());
    let pixels: Vec<[u8; 3]> = img.pixels().map(|p| p.0).collect();
    Some((pixels, w, h))
}

pub fn tile_color_image(pixels: &[[u8; 3]], width: u32, height: u32) -> egui::ColorImage {
    egui::ColorImage {
        size: [width as usize, height as usize],
        pixels: pixels.iter().map(|p| egui::Color32::from_rgb(p[0], p[1], p[2])).collect(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod fetch {
    use super::*;
    use log::debug;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{mpsc, Arc, Mutex};

    struct TileRequest {
        coord: TileCoord,
        basemap: Basemap,
        cache_dir: PathBuf,
        generation: u64,
    }

    /// Worker-thread tile fetcher. Tiles hit the on-disk cache first, then
    /// the tile server; requests from a superseded generation come back
    /// empty so the pending set still drains.
    pub struct TilePipeline {
        pub cache: TileCache,
        fetch_tx: mpsc::Sender<TileRequest>,
        result_rx: mpsc::Receiver<TileFetchResult>,
        pending: HashSet<TileCoord>,
        generation: Arc<AtomicU64>,
        cache_dir: PathBuf,
    }

    impl TilePipeline {
        pub fn new(cache_dir: PathBuf) -> Self {
            let (fetch_tx, fetch_rx) = mpsc::channel::<TileRequest>();
            let (result_tx, result_rx) = mpsc::channel::<TileFetchResult>();
            let _ = std::fs::create_dir_all(&cache_dir);

            let generation = Arc::new(AtomicU64::new(0));
            let fetch_rx = Arc::new(Mutex::new(fetch_rx));
            for _ in 0..4 {
                let rx = fetch_rx.clone();
                let tx = result_tx.clone();
                let generation = generation.clone();
                std::thread::spawn(move || loop {
                    let req = {
                        let lock = rx.lock().unwrap();
                        lock.recv()
                    };
                    let req = match req {
                        Ok(r) => r,
                        Err(_) => break,
                    };
                    let stale = generation.load(Ordering::Relaxed) != req.generation;
                    let fetched = if stale { None } else { fetch_one(&req) };
                    let (pixels, width, height) = fetched.unwrap_or((Vec::new(), 0, 0));
                    let _ = tx.send(TileFetchResult {
                        coord: req.coord,
                        generation: req.generation,
                        pixels,
                        width,
                        height,
                    });
                });
            }

            TilePipeline {
                cache: TileCache::new(MAX_CACHED_TEXTURES),
                fetch_tx,
                result_rx,
                pending: HashSet::new(),
                generation,
                cache_dir,
            }
        }

        pub fn generation(&self) -> u64 {
            self.generation.load(Ordering::Relaxed)
        }

        pub fn invalidate(&mut self) {
            self.generation.fetch_add(1, Ordering::Relaxed);
            self.pending.clear();
            self.cache.clear();
        }

        pub fn request(&mut self, coord: TileCoord, basemap: Basemap) {
            if self.cache.contains(&coord) || self.pending.contains(&coord) {
                return;
            }
            self.pending.insert(coord);
            let _ = self.fetch_tx.send(TileRequest {
                coord,
                basemap,
                cache_dir: self.cache_dir.join(basemap.service()),
                generation: self.generation(),
            });
        }

        pub fn poll(&mut self, ctx: &egui::Context) {
            let current = self.generation();
            while let Ok(result) = self.result_rx.try_recv() {
                self.pending.remove(&result.coord);
                if result.generation != current || result.pixels.is_empty() {
                    continue;
                }
                let image = tile_color_image(&result.pixels, result.width, result.height);
                let name = format!("tile_{}_{}_{}", result.coord.z, result.coord.x, result.coord.y);
                let handle = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                self.cache.insert(result.coord, handle);
            }
        }
    }

    fn fetch_one(req: &TileRequest) -> Option<(Vec<[u8; 3]>, u32, u32)> {
        let cache_path = req
            .cache_dir
            .join(req.coord.z.to_string())
            .join(req.coord.y.to_string())
            .join(format!("{}.jpg", req.coord.x));

        if let Ok(bytes) = std::fs::read(&cache_path) {
            if let Some(p) = decode_tile_pixels(&bytes) {
                return Some(p);
            }
        }

        let url = req.basemap.tile_url(&req.coord);
        let resp = match ureq::get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                debug!("tile fetch failed for {:?}: {}", req.coord, e);
                return None;
            }
        };
        let mut bytes = Vec::new();
        if std::io::Read::read_to_end(&mut resp.into_reader(), &mut bytes).is_err() {
            return None;
        }
        let decoded = decode_tile_pixels(&bytes)?;
        if let Some(parent) = cache_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&cache_path, &bytes);
        Some(decoded)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use fetch::TilePipeline;

/// Platform facade over the tile pipeline. On wasm there is no worker pool;
/// every operation is a no-op and the map renders without a basemap.
pub struct BasemapTiles {
    #[cfg(not(target_arch = "wasm32"))]
    pipeline: TilePipeline,
}

impl BasemapTiles {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(cache_dir: std::path::PathBuf) -> Self {
        BasemapTiles { pipeline: TilePipeline::new(cache_dir) }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new() -> Self {
        BasemapTiles {}
    }

    pub fn poll(&mut self, ctx: &egui::Context) {
        #[cfg(not(target_arch = "wasm32"))]
        self.pipeline.poll(ctx);
        #[cfg(target_arch = "wasm32")]
        let _ = ctx;
    }

    pub fn invalidate(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        self.pipeline.invalidate();
    }

    pub fn request(&mut self, coord: TileCoord, basemap: Basemap) {
        #[cfg(not(target_arch = "wasm32"))]
        self.pipeline.request(coord, basemap);
        #[cfg(target_arch = "wasm32")]
        let _ = (coord, basemap);
    }

    pub fn texture_id(&mut self, coord: &TileCoord) -> Option<egui::TextureId> {
        #[cfg(not(target_arch = "wasm32"))]
        return self.pipeline.cache.get(coord).map(|h| h.id());
        #[cfg(target_arch = "wasm32")]
        {
            let _ = coord;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // North-west corner of a tile in (lon, lat) degrees.
    fn tile_to_lon_lat(t: &TileCoord) -> (f64, f64) {
        let n = (1u32 << t.z) as f64;
        let lon = t.x as f64 / n * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * t.y as f64 / n)).sinh().atan().to_degrees();
        (lon, lat)
    }

    #[test]
    fn tile_math_round_trips_at_origin() {
        let t = lon_lat_to_tile(0.0, 0.0, 4);
        assert_eq!((t.x, t.y, t.z), (8, 8, 4));
        // The origin tile's north-west corner sits exactly on the equator
        // and prime meridian.
        let (lon, lat) = tile_to_lon_lat(&t);
        assert!((lon - 0.0).abs() < 1e-9);
        assert_eq!(lat, 0.0);
        // One row further north the corner lands strictly inside the band.
        let (_, lat_north) = tile_to_lon_lat(&TileCoord { x: 8, y: 7, z: 4 });
        assert!(lat_north > 0.0 && lat_north < 30.0);
    }

    #[test]
    fn longitude_wraps_into_range() {
        let t = lon_lat_to_tile(181.0, 0.0, 2);
        assert!(t.x < 4);
        let t2 = lon_lat_to_tile(-181.0, 0.0, 2);
        assert!(t2.x < 4);
    }

    #[test]
    fn zoom_tracks_view_span() {
        assert_eq!(zoom_for_view(1.0, 256.0), 0);
        assert_eq!(zoom_for_view(1.0, 1024.0), 2);
        assert!(zoom_for_view(1.0 / 1_000_000.0, 1024.0) <= MAX_TILE_ZOOM);
        assert_eq!(zoom_for_view(0.0, 1024.0), 0);
    }

    #[test]
    fn visible_tiles_cover_the_viewport() {
        let tiles = visible_tiles(0.0, 1.0, 0.0, 1.0, 1);
        assert_eq!(tiles.len(), 4);
        let tiles = visible_tiles(0.4, 0.6, 0.4, 0.6, 3);
        assert!(tiles.iter().all(|t| t.z == 3));
        assert!(tiles.contains(&TileCoord { x: 3, y: 3, z: 3 }));
    }

    #[test]
    fn parent_chain_reaches_root() {
        let mut c = TileCoord { x: 5, y: 3, z: 3 };
        let mut hops = 0;
        while let Some(p) = c.parent() {
            c = p;
            hops += 1;
        }
        assert_eq!(hops, 3);
        assert_eq!((c.x, c.y, c.z), (0, 0, 0));
    }

    #[test]
    fn basemaps_have_distinct_tile_urls() {
        let c = TileCoord { x: 1, y: 2, z: 3 };
        let urls: Vec<String> = Basemap::ALL.iter().map(|b| b.tile_url(&c)).collect();
        assert!(urls[0].contains("/3/2/1"));
        assert_ne!(urls[0], urls[1]);
        assert_ne!(urls[1], urls[2]);
    }
}
