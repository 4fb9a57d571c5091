//! Portfolio page interaction layer.
//!
//! This is the `cdylib` that the page loads. All behavior lives in the
//! workspace crates; this crate only boots the browser layer.

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    folio_web::start()
}
