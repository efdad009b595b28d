//! NDVI image overlay.
//!
//! The NDVI service returns a JSON payload with either an `image_url` (and
//! optionally a `bounds` array `[min_lon, min_lat, max_lon, max_lat]`) or an
//! `error` string. The image is fetched and decoded off the UI thread, then
//! uploaded as a texture and drawn over its geographic bounds.

use eframe::egui;
use serde_json::Value;

/// Whole Web Mercator square when the payload carries no bounds.
pub const DEFAULT_BOUNDS: [f64; 4] = [-180.0, -crate::feature::MERCATOR_MAX_LAT, 180.0, crate::feature::MERCATOR_MAX_LAT];

pub enum NdviState {
    NotLoaded,
    Loading,
    Loaded { texture: egui::TextureHandle, bounds: [f64; 4] },
    Failed(String),
}

impl NdviState {
    pub fn status_line(&self) -> String {
        match self {
            NdviState::NotLoaded => "not loaded".to_string(),
            NdviState::Loading => "loading...".to_string(),
            NdviState::Loaded { .. } => "loaded".to_string(),
            NdviState::Failed(e) => format!("failed: {}", e),
        }
    }
}

pub struct NdviImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bounds: [f64; 4],
}

pub fn parse_payload(doc: &Value) -> Result<(String, [f64; 4]), String> {
    if let Some(err) = doc.get("error").and_then(Value::as_str) {
        return Err(err.to_string());
    }
    let url = doc
        .get("image_url")
        .or_else(|| doc.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| "payload has no image_url".to_string())?;
    let bounds = doc
        .get("bounds")
        .and_then(Value::as_array)
        .and_then(|a| {
            let vals: Vec<f64> = a.iter().filter_map(Value::as_f64).collect();
            if vals.len() == 4 {
                Some([vals[0], vals[1], vals[2], vals[3]])
            } else {
                None
            }
        })
        .unwrap_or(DEFAULT_BOUNDS);
    Ok((url.to_string(), bounds))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_image_fetch(
    url: String,
    bounds: [f64; 4],
    tx: std::sync::mpsc::Sender<Result<NdviImage, String>>,
) {
    std::thread::spawn(move || {
        let result = crate::data::fetch_bytes(&url).and_then(|bytes| decode_image(&bytes, bounds));
        let _ = tx.send(result);
    });
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_image_fetch(
    url: String,
    _bounds: [f64; 4],
    tx: std::sync::mpsc::Sender<Result<NdviImage, String>>,
) {
    log::warn!("NDVI overlay image fetch is not available on wasm: {}", url);
    let _ = tx.send(Err("unsupported on this platform".to_string()));
}

fn decode_image(bytes: &[u8], bounds: [f64; 4]) -> Result<NdviImage, String> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| format!("decode error: {}", e))?
        .to_rgba8();
    let (width, height) = (img.width(), img.height());
    Ok(NdviImage { rgba: img.into_raw(), width, height, bounds })
}

pub fn upload(ctx: &egui::Context, img: &NdviImage) -> egui::TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [img.width as usize, img.height as usize],
        &img.rgba,
    );
    ctx.load_texture("ndvi_overlay", image, egui::TextureOptions::LINEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_with_error_field_fails() {
        let doc = json!({"error": "no imagery for region"});
        assert_eq!(parse_payload(&doc).unwrap_err(), "no imagery for region");
    }

    #[test]
    fn payload_with_url_and_bounds_parses() {
        let doc = json!({"image_url": "http://x/ndvi.png", "bounds": [-10.0, -5.0, 10.0, 5.0]});
        let (url, bounds) = parse_payload(&doc).unwrap();
        assert_eq!(url, "http://x/ndvi.png");
        assert_eq!(bounds, [-10.0, -5.0, 10.0, 5.0]);
    }

    #[test]
    fn missing_bounds_default_to_world() {
        let doc = json!({"url": "http://x/ndvi.png"});
        let (_, bounds) = parse_payload(&doc).unwrap();
        assert_eq!(bounds, DEFAULT_BOUNDS);
    }

    #[test]
    fn empty_payload_is_an_error() {
        assert!(parse_payload(&json!({})).is_err());
        assert!(parse_payload(&json!({"bounds": [1, 2]})).is_err());
    }
}
