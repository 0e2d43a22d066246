//! Browser bindings for the page and the service worker.

mod console;
pub mod page;
pub mod worker;

use wasm_bindgen::JsValue;

/// Routes `tracing` output to the developer console. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);
    let installed = tracing_subscriber::fmt()
        .with_writer(console::ConsoleMakeWriter)
        .without_time()
        .with_target(false)
        .with_max_level(level)
        .try_init();
    if installed.is_ok() {
        tracing::debug!(%level, "console logging ready");
    }
}

/// Best-effort text for a thrown JS value.
pub(crate) fn js_text(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
