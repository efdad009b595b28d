//! JSON dataset loading.
//!
//! Each dataset is fetched independently on a background thread (native) or
//! through the browser fetch API (wasm) and reported back over a channel
//! drained once per frame. A failed dataset degrades to an empty default;
//! it never blocks or fails the others.

use serde_json::Value;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dataset {
    Stations,
    Satellites,
    Orbits,
    Live,
    Ndvi,
}

impl Dataset {
    pub fn label(&self) -> &'static str {
        match self {
            Dataset::Stations => "Ground stations",
            Dataset::Satellites => "Satellites",
            Dataset::Orbits => "Orbits",
            Dataset::Live => "Live feed",
            Dataset::Ndvi => "NDVI",
        }
    }
}

#[derive(Clone)]
pub enum LoadState {
    Loading,
    Loaded { count: usize },
    Failed(String),
}

pub type FetchResult = (Dataset, Result<Value, String>);

/// `{"stations": [...]}` wrapper, a bare array, or anything else (empty).
pub fn station_records(doc: &Value) -> Vec<Value> {
    if let Some(arr) = doc.get("stations").and_then(Value::as_array) {
        return arr.clone();
    }
    array_records(doc)
}

pub fn array_records(doc: &Value) -> Vec<Value> {
    doc.as_array().cloned().unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_json(url: &str) -> Result<Value, String> {
    let response = ureq::get(url).call().map_err(|e| format!("HTTP error: {}", e))?;
    let body = response.into_string().map_err(|e| format!("Read error: {}", e))?;
    serde_json::from_str(&body).map_err(|e| format!("Parse error: {}", e))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let response = ureq::get(url).call().map_err(|e| format!("HTTP error: {}", e))?;
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut response.into_reader(), &mut bytes)
        .map_err(|e| format!("Read error: {}", e))?;
    Ok(bytes)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_fetch(dataset: Dataset, url: String, tx: std::sync::mpsc::Sender<FetchResult>) {
    std::thread::spawn(move || {
        let _ = tx.send((dataset, fetch_json(&url)));
    });
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static FETCH_RESULTS: std::cell::RefCell<Vec<FetchResult>> = std::cell::RefCell::new(Vec::new());
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_fetch(dataset: Dataset, url: String, _tx: std::sync::mpsc::Sender<FetchResult>) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = fetch_json_text(&url)
            .await
            .and_then(|body| serde_json::from_str(&body).map_err(|e| format!("Parse error: {}", e)));
        FETCH_RESULTS.with(|cell| cell.borrow_mut().push((dataset, result)));
    });
}

/// Results queued by wasm fetches; a no-op on native, where the mpsc
/// channel carries everything.
pub fn drain_pending(results: &mut Vec<FetchResult>) {
    #[cfg(target_arch = "wasm32")]
    FETCH_RESULTS.with(|cell| results.append(&mut cell.borrow_mut()));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = results;
}

#[cfg(target_arch = "wasm32")]
async fn fetch_json_text(url: &str) -> Result<String, String> {
    use wasm_bindgen::JsCast as _;
    use web_sys::{Request, RequestInit, Response};

    let opts = RequestInit::new();
    opts.set_method("GET");

    let request = Request::new_with_str_and_init(url, &opts).map_err(|e| format!("{:?}", e))?;

    let window = web_sys::window().ok_or("No window")?;
    let resp_value = wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| format!("Fetch failed: {:?}", e))?;

    let resp: Response = resp_value.dyn_into().map_err(|_| "Response is not a Response")?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let array_buffer =
        wasm_bindgen_futures::JsFuture::from(resp.array_buffer().map_err(|e| format!("{:?}", e))?)
            .await
            .map_err(|e| format!("{:?}", e))?;

    let bytes = js_sys::Uint8Array::new(&array_buffer).to_vec();
    String::from_utf8(bytes).map_err(|e| format!("{}", e))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn dirs_cache() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".cache"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stations_document_unwraps_wrapper() {
        let doc = json!({"stations": [{"name": "A"}, {"name": "B"}]});
        assert_eq!(station_records(&doc).len(), 2);
    }

    #[test]
    fn bare_array_is_accepted_for_stations() {
        let doc = json!([{"name": "A"}]);
        assert_eq!(station_records(&doc).len(), 1);
    }

    #[test]
    fn malformed_documents_degrade_to_empty() {
        assert!(station_records(&json!({"other": 1})).is_empty());
        assert!(array_records(&json!({"not": "array"})).is_empty());
        assert!(array_records(&json!(null)).is_empty());
    }
}
