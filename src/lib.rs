// ==================== Imports ====================
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

#[macro_use]
pub mod browser;
pub mod config;
pub mod engine;
pub mod game;
pub mod jump;
pub mod level;
#[cfg(test)]
mod testutils;

use config::Config;
use engine::{BrowserImageLoader, GameLoop, LoopHandle, Renderer};
use game::Session;

// ==================== Structs ====================
/// Returned to the page so it can tear the loop down (e.g. on navigation)
#[wasm_bindgen]
pub struct GameHandle {
    handle: LoopHandle,
}

#[wasm_bindgen]
impl GameHandle {
    /// Stops the loop before its next tick
    pub fn stop(&self) {
        self.handle.stop();
    }

    #[wasm_bindgen(js_name = isStopped)]
    pub fn is_stopped(&self) -> bool {
        self.handle.is_stopped()
    }
}

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - acquires (or creates) the canvas
/// - generates the level
/// - starts the frame loop with the default configuration
#[wasm_bindgen]
pub fn main_js() -> Result<GameHandle, JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    launch(Config::default()).map_err(to_js_error)
}

/// Same as `main_js`, with a partial configuration object from the page
#[wasm_bindgen]
pub fn start_with_config(config: JsValue) -> Result<GameHandle, JsValue> {
    console_error_panic_hook::set_once();
    Config::from_js(config)
        .and_then(launch)
        .map_err(to_js_error)
}

/// Fetches a JSON configuration, then starts like `start_with_config`
#[wasm_bindgen]
pub async fn start_with_config_url(url: String) -> Result<GameHandle, JsValue> {
    console_error_panic_hook::set_once();
    let config = browser::fetch_json::<Config>(&url)
        .await
        .map_err(to_js_error)?;
    launch(config).map_err(to_js_error)
}

fn launch(config: Config) -> anyhow::Result<GameHandle> {
    let renderer = Renderer::new(browser::context()?)?;
    let jump_key = config.jump_key.clone();
    let session = Session::new(config, renderer, BrowserImageLoader, &mut rand::thread_rng())?;
    let handle = GameLoop::start(session, &jump_key)?;
    Ok(GameHandle { handle })
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}
