//! folio-web: the browser side of the portfolio page.
//!
//! [`page::WebPage`] adapts the DOM to `folio_core::Page`, [`app::App`]
//! turns DOM events into `Site` calls and [`submit`] posts the contact form.

pub mod app;
pub mod page;
pub mod submit;

use folio_core::FolioConfig;
use wasm_bindgen::JsValue;

/// Built-in settings. Unknown or missing keys fall back to defaults.
const CONFIG: &str = include_str!("../../../folio.toml");

fn load_config() -> (FolioConfig, Option<String>) {
    match FolioConfig::from_toml_str(CONFIG) {
        Ok(config) => (config, None),
        Err(err) => (FolioConfig::default(), Some(err.to_string())),
    }
}

/// Boot the page: logging first, then every listener.
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let (config, config_error) = load_config();
    let level = config.log.level.parse().unwrap_or(log::Level::Info);
    if let Err(err) = console_log::init_with_level(level) {
        web_sys::console::warn_1(&JsValue::from_str(&err.to_string()));
    }
    if let Some(err) = config_error {
        log::warn!("invalid folio.toml, using defaults: {err}");
    }

    match app::App::install(&config) {
        Ok(app) => {
            // Listeners hold the app; this handle is not needed
            drop(app);
            Ok(())
        }
        Err(err) => {
            log::error!("failed to start: {err:#}");
            Err(JsValue::from_str(&format!("{err:#}")))
        }
    }
}
