//! Scab Picker core crate.
//!
//! An offline-capable matching game: the player builds a local image library,
//! the page shows a target and a grid of candidates, and the player taps the
//! matching candidate before the countdown runs out.
//!
//! - [`game`] holds the library, round draws, scoring and the session clock.
//! - [`offline`] is the cache-first service-worker logic.
//! - `web` (wasm32 only) binds both to the browser: local storage, the DOM,
//!   `setInterval`, `CacheStorage` and the exported entry points.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod game;
pub mod offline;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{AppConfig, GameConfig, OfflineConfig};
pub use error::{Error, Result};
pub use game::library::{ImageEntry, ImageSource, Library};
pub use game::round::{RandomSampler, Round, Sampler};
pub use game::store::{KeyValueStore, MemoryStore};
pub use game::{GameController, Host, ImportTicket, Phase, PickOutcome, Session, SessionEnd};
pub use offline::{FetchSource, OfflineController, OfflineHost, Served};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Cache version tag compiled into this build.
#[wasm_bindgen]
pub fn cache_version() -> String {
    config::DEFAULT_CACHE_VERSION.to_string()
}
