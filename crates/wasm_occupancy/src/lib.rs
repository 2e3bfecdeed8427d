//! WASM bindings for occupancy scenes.
//!
//! The page fetches a scene's metadata JSON and binary payload, hands both
//! to [`OccupancyScene`] (or to a [`WasmViewer`] that caches scenes by URL)
//! and receives plain JS objects with typed arrays ready for a canvas
//! heatmap or an instanced cube mesh.

mod cache;
mod state;

pub use cache::SceneCache;
pub use state::{ProjectionView, Recompute, ViewerEvent, ViewerState};

use std::rc::Rc;

use js_sys::{Array, Float32Array, Object, Reflect, Uint32Array};
use occupancy::{
    project, voxelize, Axis, DecodedScene, OccupancyError, ProjectionResult,
    RenderOptions, VoxelInstance, Voxelization,
};
use wasm_bindgen::prelude::*;

/// A decoded scene held on the WASM side.
#[wasm_bindgen]
pub struct OccupancyScene {
    inner: Rc<DecodedScene>,
}

#[wasm_bindgen]
impl OccupancyScene {
    /// Decode a scene from its metadata JSON and payload bytes.
    #[wasm_bindgen(constructor)]
    pub fn new(metadata_json: &str, bytes: &[u8]) -> Result<OccupancyScene, JsValue> {
        let scene = occupancy::decode_json(metadata_json, bytes).map_err(to_js_error)?;
        report_warnings(&scene);
        Ok(OccupancyScene { inner: Rc::new(scene) })
    }

    /// Grid shape as `[nx, ny, nz]`.
    #[wasm_bindgen(getter)]
    pub fn shape(&self) -> Vec<u32> {
        self.inner.geometry.shape().iter().map(|&n| n as u32).collect()
    }

    /// Bounds as `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    #[wasm_bindgen(getter)]
    pub fn bounds(&self) -> Vec<f32> {
        self.inner.geometry.bounds().iter().flatten().copied().collect()
    }

    /// Derived voxel size per axis.
    #[wasm_bindgen(getter)]
    pub fn voxel_size(&self) -> Vec<f32> {
        self.inner.geometry.voxel_sizes().to_vec()
    }

    /// `"dense"` or `"bitset"`.
    #[wasm_bindgen(getter)]
    pub fn encoding(&self) -> String {
        match self.inner.volume.kind() {
            occupancy::EncodingKind::Dense => "dense".to_string(),
            occupancy::EncodingKind::Bitset => "bitset".to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn num_voxels(&self) -> usize {
        self.inner.geometry.num_voxels()
    }

    /// Decode warnings as human-readable strings.
    #[wasm_bindgen(getter)]
    pub fn warnings(&self) -> Array {
        warnings_array(self.inner.warnings.iter().map(ToString::to_string))
    }

    /// Value at a grid coordinate; out-of-range reads give 0.
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.inner.value_at(x, y, z)
    }

    /// Max-over-z map as `{width, height, values, min, max}`.
    pub fn project_max(&self) -> Object {
        projection_object(&occupancy::project_max(&self.inner.volume, &self.inner.geometry))
    }

    /// Mean-over-z map.
    pub fn project_mean(&self) -> Object {
        projection_object(&occupancy::project_mean(&self.inner.volume, &self.inner.geometry))
    }

    /// A single z plane.
    pub fn extract_slice(&self, z: usize) -> Result<Object, JsValue> {
        occupancy::extract_slice(&self.inner.volume, &self.inner.geometry, z)
            .map(|result| projection_object(&result))
            .map_err(to_js_error)
    }

    /// Voxelize with options parsed from a URL query string.
    pub fn voxelize_query(&self, query: &str) -> Result<Object, JsValue> {
        self.run_voxelize(&RenderOptions::from_query(query))
    }

    /// Voxelize with explicit options; `undefined` takes the default.
    pub fn voxelize(
        &self,
        threshold: Option<f32>,
        z_min: Option<f32>,
        z_max: Option<f32>,
        drop_top_layers: Option<u32>,
    ) -> Result<Object, JsValue> {
        self.run_voxelize(&RenderOptions {
            threshold,
            z_filter_min: z_min,
            z_filter_max: z_max,
            drop_top_layers,
        })
    }
}

impl OccupancyScene {
    fn run_voxelize(&self, options: &RenderOptions) -> Result<Object, JsValue> {
        voxelize_scene(&self.inner, options)
    }
}

/// Scene cache plus viewer controls for a whole page session.
#[wasm_bindgen]
pub struct WasmViewer {
    cache: SceneCache,
    state: ViewerState,
}

#[wasm_bindgen]
impl WasmViewer {
    /// Create a viewer. Without `max_scenes` the cache is unbounded.
    #[wasm_bindgen(constructor)]
    pub fn new(max_scenes: Option<u32>) -> WasmViewer {
        let cache = match max_scenes {
            Some(limit) => SceneCache::with_max_entries(limit as usize),
            None => SceneCache::new(),
        };
        WasmViewer { cache, state: ViewerState::default() }
    }

    /// Whether `url` is already decoded; the page can skip the fetch.
    pub fn has_scene(&self, url: &str) -> bool {
        self.cache.contains(url)
    }

    /// Decode and cache a fetched scene. A cached URL is not decoded again.
    pub fn load_scene(
        &mut self,
        url: &str,
        metadata_json: &str,
        bytes: &[u8],
    ) -> Result<(), JsValue> {
        let scene = self
            .cache
            .get_or_decode(url, metadata_json, bytes)
            .map_err(to_js_error)?;
        report_warnings(&scene);
        Ok(())
    }

    /// Apply a JSON event and return what must be recomputed:
    /// `"nothing"`, `"projection"`, `"voxels"` or `"all"`.
    pub fn dispatch(&mut self, event_json: &str) -> Result<String, JsValue> {
        let event = ViewerEvent::from_json(event_json)
            .map_err(|err| JsValue::from_str(&format!("invalid viewer event: {err}")))?;
        let (next, recompute) = std::mem::take(&mut self.state).apply(event);
        self.state = next;
        log(&format!("dispatch -> {}", recompute.as_str()));
        Ok(recompute.as_str().to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn scene_url(&self) -> Option<String> {
        self.state.scene_url.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn threshold(&self) -> Option<f32> {
        self.state.options.threshold
    }

    #[wasm_bindgen(getter)]
    pub fn show_voxels(&self) -> bool {
        self.state.show_voxels
    }

    /// Projection of the selected scene for the current view.
    pub fn projection(&mut self) -> Result<Object, JsValue> {
        let scene = self.current_scene()?;
        project(&scene.volume, &scene.geometry, self.state.projection_mode())
            .map(|result| projection_object(&result))
            .map_err(to_js_error)
    }

    /// Voxels of the selected scene for the current options.
    pub fn voxels(&mut self) -> Result<Object, JsValue> {
        let scene = self.current_scene()?;
        voxelize_scene(&scene, &self.state.options)
    }

    /// Number of z layers in the selected scene, for sizing a slice slider.
    pub fn layer_count(&mut self) -> Result<usize, JsValue> {
        Ok(self.current_scene()?.geometry.nz())
    }
}

impl WasmViewer {
    fn current_scene(&mut self) -> Result<Rc<DecodedScene>, JsValue> {
        let url = self
            .state
            .scene_url
            .as_deref()
            .ok_or_else(|| JsValue::from_str("no scene selected"))?;
        self.cache
            .get(url)
            .ok_or_else(|| JsValue::from_str(&format!("scene not loaded: {url}")))
    }
}

fn voxelize_scene(scene: &DecodedScene, options: &RenderOptions) -> Result<Object, JsValue> {
    let voxels = voxelize(&scene.volume, &scene.geometry, options).map_err(to_js_error)?;
    for warning in &voxels.warnings {
        warn(&warning.to_string());
    }
    log(&format!(
        "voxelized {} voxels in {} bands (z {:.2}..{:.2}, t {:.2})",
        voxels.voxel_count(),
        voxels.bands.len(),
        voxels.window.min,
        voxels.window.max,
        voxels.threshold,
    ));
    Ok(voxelization_object(&voxels, scene.geometry.voxel_size(Axis::Z)))
}

fn projection_object(result: &ProjectionResult) -> Object {
    let (min, max) = result.value_range();
    let object = Object::new();
    let values = Float32Array::from(result.values());
    Reflect::set(&object, &JsValue::from_str("values"), &values).ok();
    Reflect::set(&object, &JsValue::from_str("width"), &JsValue::from(result.width() as u32)).ok();
    Reflect::set(&object, &JsValue::from_str("height"), &JsValue::from(result.height() as u32)).ok();
    Reflect::set(&object, &JsValue::from_str("min"), &JsValue::from(min)).ok();
    Reflect::set(&object, &JsValue::from_str("max"), &JsValue::from(max)).ok();
    object
}

fn voxelization_object(voxels: &Voxelization, voxel_height: f32) -> Object {
    let bands = Array::new();
    for band in &voxels.bands {
        let entry = Object::new();
        let positions = Float32Array::from(band.positions().as_slice());
        Reflect::set(&entry, &JsValue::from_str("band"), &JsValue::from(band.band)).ok();
        Reflect::set(&entry, &JsValue::from_str("t"), &JsValue::from(band.t)).ok();
        Reflect::set(
            &entry,
            &JsValue::from_str("base_height"),
            &JsValue::from(band.base_height),
        )
        .ok();
        Reflect::set(&entry, &JsValue::from_str("count"), &JsValue::from(band.len() as u32)).ok();
        Reflect::set(&entry, &JsValue::from_str("positions"), &positions).ok();
        bands.push(&entry);
    }

    // Interleaved [x, y, z, t] per voxel for a single instanced draw.
    let instances = voxels.instance_buffer();
    let instances =
        Float32Array::from(bytemuck::cast_slice::<VoxelInstance, f32>(instances.as_slice()));

    let grid_indices: Vec<u32> = voxels
        .grid_indices()
        .iter()
        .flat_map(|index| index.iter().map(|&i| i as u32))
        .collect();

    let object = Object::new();
    Reflect::set(&object, &JsValue::from_str("bands"), &bands).ok();
    Reflect::set(&object, &JsValue::from_str("instances"), &instances).ok();
    Reflect::set(
        &object,
        &JsValue::from_str("grid_indices"),
        &Uint32Array::from(grid_indices.as_slice()),
    )
    .ok();
    Reflect::set(&object, &JsValue::from_str("count"), &JsValue::from(voxels.voxel_count() as u32))
        .ok();
    Reflect::set(&object, &JsValue::from_str("threshold"), &JsValue::from(voxels.threshold)).ok();
    Reflect::set(&object, &JsValue::from_str("z_min"), &JsValue::from(voxels.window.min)).ok();
    Reflect::set(&object, &JsValue::from_str("z_max"), &JsValue::from(voxels.window.max)).ok();
    Reflect::set(&object, &JsValue::from_str("voxel_height"), &JsValue::from(voxel_height)).ok();
    Reflect::set(
        &object,
        &JsValue::from_str("warnings"),
        &warnings_array(voxels.warnings.iter().map(ToString::to_string)),
    )
    .ok();
    object
}

fn warnings_array(messages: impl Iterator<Item = String>) -> Array {
    messages.map(|m| JsValue::from_str(&m)).collect()
}

fn report_warnings(scene: &DecodedScene) {
    for warning in &scene.warnings {
        warn(&warning.to_string());
    }
}

fn to_js_error(err: OccupancyError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// Logging support

thread_local! {
    static LOG_ENABLED: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

/// Install the panic hook and turn on console logging.
#[wasm_bindgen]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    set_log_enabled(true);
}

/// Enable or disable console logging.
#[wasm_bindgen]
pub fn set_log_enabled(enabled: bool) {
    LOG_ENABLED.with(|flag| flag.set(enabled));
}

pub(crate) fn log(message: &str) {
    if LOG_ENABLED.with(|enabled| enabled.get()) {
        web_sys::console::log_1(&format!("[wasm_occupancy] {message}").into());
    }
}

fn warn(message: &str) {
    if LOG_ENABLED.with(|enabled| enabled.get()) {
        web_sys::console::warn_1(&format!("[wasm_occupancy] {message}").into());
    }
}

/// Get the version of the occupancy bindings.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
