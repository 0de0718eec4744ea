use std::cell::RefCell;

use wasm_bindgen::prelude::*;

pub mod runner;

pub use runner::RollerRunner;

thread_local! {
    static RUNNER: RefCell<Option<RollerRunner>> = const { RefCell::new(None) };
}

/// Run `f` against the live runner. Returns `None` before `roller_init`.
fn with_runner<R>(f: impl FnOnce(&mut RollerRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("dice roller not initialized; call roller_init() first");
                None
            }
        }
    })
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Create the roller. Either JSON argument may be empty for defaults.
#[wasm_bindgen]
pub fn roller_init(config_json: &str, caps_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = RollerRunner::from_json(config_json, caps_json).map_err(js_error)?;
    log::info!("dice roller initialized ({} quality)", runner.quality_tier());
    RUNNER.with(|cell| *cell.borrow_mut() = Some(runner));
    Ok(())
}

/// Start a roll. Returns the roll epoch.
#[wasm_bindgen]
pub fn roller_roll(request_json: &str) -> Result<f64, JsValue> {
    with_runner(|r| r.roll(request_json))
        .ok_or_else(|| js_error("roller not initialized"))?
        .map(|epoch| epoch as f64)
        .map_err(js_error)
}

#[wasm_bindgen]
pub fn roller_roll_percentile(result: u32) -> Result<f64, JsValue> {
    with_runner(|r| r.roll_percentile(result))
        .ok_or_else(|| js_error("roller not initialized"))?
        .map(|epoch| epoch as f64)
        .map_err(js_error)
}

#[wasm_bindgen]
pub fn roller_tick(dt: f32) {
    with_runner(|r| r.tick(dt));
}

#[wasm_bindgen]
pub fn roller_resize(width: f32, height: f32) {
    with_runner(|r| r.resize(width, height));
}

#[wasm_bindgen]
pub fn roller_is_rolling() -> bool {
    with_runner(|r| r.is_rolling()).unwrap_or(false)
}

/// Release physics bodies. Cached meshes and textures survive.
#[wasm_bindgen]
pub fn roller_teardown() {
    with_runner(|r| r.teardown());
    log::info!("dice roller torn down");
}

// ---- Frame buffer accessors ----

#[wasm_bindgen]
pub fn roller_buffer_ptr() -> *const f32 {
    with_runner(|r| r.buffer_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn roller_buffer_len() -> u32 {
    with_runner(|r| r.buffer_len()).unwrap_or(0)
}

// ---- Asset accessors ----

/// Interleaved position/normal triangle list for a die mesh.
#[wasm_bindgen]
pub fn roller_mesh(sides: u32) -> js_sys::Float32Array {
    let data = with_runner(|r| r.mesh(sides)).unwrap_or_default();
    js_sys::Float32Array::from(data.as_slice())
}

#[wasm_bindgen]
pub fn roller_texture_count() -> u32 {
    with_runner(|r| r.texture_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn roller_texture_width(id: u32) -> u32 {
    with_runner(|r| r.texture_size(id)).flatten().map_or(0, |(w, _)| w)
}

#[wasm_bindgen]
pub fn roller_texture_height(id: u32) -> u32 {
    with_runner(|r| r.texture_size(id)).flatten().map_or(0, |(_, h)| h)
}

/// RGBA8 pixels, empty for an unknown id.
#[wasm_bindgen]
pub fn roller_texture_pixels(id: u32) -> js_sys::Uint8Array {
    let data = with_runner(|r| r.texture_pixels(id)).flatten().unwrap_or_default();
    js_sys::Uint8Array::from(data.as_slice())
}
