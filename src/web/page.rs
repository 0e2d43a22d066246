//! Page glue: binds the game controller to the DOM, local storage and a
//! one-second `setInterval`.
//!
//! Expected markup ids: `grid`, `targetImg`, `startBtn`, `clearBtn`,
//! `fileInput`, `timeLeft`, `score`, `best`, `hint`.

use std::cell::RefCell;

use gloo::events::EventListener;
use gloo::file::FileList;
use gloo::storage::{LocalStorage, Storage};
use gloo::timers::callback::Interval;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlImageElement, HtmlInputElement, window};

use super::js_text;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::game::library::{ImageEntry, ImageSource};
use crate::game::round::RandomSampler;
use crate::game::store::KeyValueStore;
use crate::game::{GameController, Host, PickOutcome};

const GRID: &str = "grid";
const TARGET_IMG: &str = "targetImg";
const START_BTN: &str = "startBtn";
const CLEAR_BTN: &str = "clearBtn";
const FILE_INPUT: &str = "fileInput";
const TIME_LEFT: &str = "timeLeft";
const SCORE: &str = "score";
const BEST: &str = "best";
const HINT: &str = "hint";

const SERVICE_WORKER_URL: &str = "/sw.js";

type WebGame = GameController<LocalStore, RandomSampler, DomHost>;

thread_local! {
    static APP: RefCell<Option<WebGame>> = const { RefCell::new(None) };
}

/// Runs `f` against the booted game. `None` before boot or on re-entry.
fn with_app<T>(f: impl FnOnce(&mut WebGame) -> T) -> Option<T> {
    APP.with(|cell| {
        let mut slot = cell.try_borrow_mut().ok()?;
        slot.as_mut().map(f)
    })
}

// --- Storage -----------------------------------------------------------------

/// `window.localStorage`, string values.
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| Error::Storage(js_text(&e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| Error::Storage(js_text(&e)))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|e| Error::Storage(js_text(&e)))
    }
}

// --- DOM host ----------------------------------------------------------------

pub struct DomHost {
    document: Document,
    tiles: Vec<EventListener>,
    countdown: Option<Interval>,
}

impl DomHost {
    fn new(document: Document) -> Self {
        Self {
            document,
            tiles: Vec::new(),
            countdown: None,
        }
    }

    fn element(&self, id: &str) -> Option<HtmlElement> {
        self.document.get_element_by_id(id)?.dyn_into().ok()
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.element(id) {
            el.set_text_content(Some(text));
        }
    }

    fn try_render(&mut self, library: &[ImageEntry]) -> std::result::Result<(), JsValue> {
        let Some(grid) = self.element(GRID) else {
            return Ok(());
        };
        grid.set_inner_html("");
        self.tiles.clear();
        for entry in library {
            let tile = self.document.create_element("div")?;
            tile.set_class_name("tile");
            let img: HtmlImageElement = self.document.create_element("img")?.dyn_into()?;
            img.set_src(&entry.url);
            img.set_alt("candidate");
            let button = self.document.create_element("button")?;
            let id = entry.id.clone();
            self.tiles.push(EventListener::new(&button, "click", move |_| {
                with_app(|app| app.pick(&id));
            }));
            tile.append_child(&img)?;
            tile.append_child(&button)?;
            grid.append_child(&tile)?;
        }
        Ok(())
    }
}

impl Host for DomHost {
    fn render(&mut self, library: &[ImageEntry]) {
        if let Err(err) = self.try_render(library) {
            tracing::warn!("grid render failed: {}", js_text(&err));
        }
    }

    fn show_hint(&mut self, hint: Option<&str>) {
        self.set_text(HINT, hint.unwrap_or(""));
    }

    fn show_target(&mut self, url: Option<&str>) {
        let img = self
            .document
            .get_element_by_id(TARGET_IMG)
            .and_then(|el| el.dyn_into::<HtmlImageElement>().ok());
        if let Some(img) = img {
            img.set_src(url.unwrap_or(""));
        }
    }

    fn show_score(&mut self, score: u32) {
        self.set_text(SCORE, &score.to_string());
    }

    fn show_time(&mut self, seconds: u32) {
        self.set_text(TIME_LEFT, &seconds.to_string());
    }

    fn show_best(&mut self, best: u32) {
        self.set_text(BEST, &best.to_string());
    }

    fn confirm(&mut self, message: &str) -> bool {
        gloo::dialogs::confirm(message)
    }

    fn alert(&mut self, message: &str) {
        gloo::dialogs::alert(message);
    }

    fn vibrate(&mut self, pattern: &[u32]) -> bool {
        let Some(navigator) = window().map(|w| w.navigator()) else {
            return false;
        };
        // Safari and desktop Firefox have no vibrate at all.
        if !js_sys::Reflect::has(&navigator, &JsValue::from_str("vibrate")).unwrap_or(false) {
            return false;
        }
        let pattern: js_sys::Array = pattern.iter().map(|ms| JsValue::from(*ms)).collect();
        navigator.vibrate_with_pattern(&pattern)
    }

    fn revoke_object_url(&mut self, url: &str) {
        if let Err(err) = web_sys::Url::revoke_object_url(url) {
            tracing::debug!("revoke failed: {}", js_text(&err));
        }
    }

    fn start_countdown(&mut self, period_ms: u32) {
        self.stop_countdown();
        self.countdown = Some(Interval::new(period_ms, || {
            with_app(|app| app.tick());
        }));
    }

    fn stop_countdown(&mut self) {
        if let Some(interval) = self.countdown.take() {
            // The last tick stops its own interval; free the callback once it returns.
            let callback = interval.cancel();
            wasm_bindgen_futures::spawn_local(async move { drop(callback) });
        }
    }

    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

// --- Wiring ------------------------------------------------------------------

/// Takes the current selection and clears the input, so picking the same
/// files again still fires `change`.
pub fn take_selected_files(input: &HtmlInputElement) -> Option<FileList> {
    let files = input.files();
    input.set_value("");
    files.map(FileList::from)
}

fn import_files(input: &HtmlInputElement) {
    let Some(files) = take_selected_files(input) else {
        return;
    };
    let Some((ticket, cap)) = with_app(|app| (app.import_ticket(), app.config().import_cap)) else {
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        let mut sources = Vec::new();
        for file in files.iter().take(cap) {
            match gloo::file::futures::read_as_data_url(file).await {
                Ok(url) => sources.push(ImageSource::DataUrl(url)),
                Err(err) => tracing::warn!(name = %file.name(), "image not readable: {err}"),
            }
        }
        with_app(|app| app.add_imported(ticket, sources));
    });
}

fn wire_controls(document: &Document) {
    if let Some(start) = document.get_element_by_id(START_BTN) {
        EventListener::new(&start, "click", |_| {
            with_app(|app| app.start_session());
        })
        .forget();
    }
    if let Some(clear) = document.get_element_by_id(CLEAR_BTN) {
        EventListener::new(&clear, "click", |_| {
            with_app(|app| app.clear_library());
        })
        .forget();
    }
    let input = document
        .get_element_by_id(FILE_INPUT)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
    if let Some(input) = input {
        let target = input.clone();
        EventListener::new(&input, "change", move |_| import_files(&target)).forget();
    }
}

fn register_service_worker() {
    let Some(navigator) = window().map(|w| w.navigator()) else {
        return;
    };
    if !js_sys::Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false) {
        tracing::info!("service workers unsupported, running online only");
        return;
    }
    let registration = navigator.service_worker().register(SERVICE_WORKER_URL);
    wasm_bindgen_futures::spawn_local(async move {
        match wasm_bindgen_futures::JsFuture::from(registration).await {
            Ok(_) => tracing::info!(url = SERVICE_WORKER_URL, "service worker registered"),
            Err(err) => tracing::warn!("service worker registration failed: {}", js_text(&err)),
        }
    });
}

/// Boots the game on the current page. `config_json` overrides defaults.
#[wasm_bindgen]
pub fn boot(config_json: Option<String>) -> std::result::Result<(), JsValue> {
    if APP.with(|cell| cell.borrow().is_some()) {
        tracing::warn!("boot called twice, keeping the running game");
        return Ok(());
    }
    let config = AppConfig::from_optional_json(config_json.as_deref())?;
    super::init_logging(&config.log_level);

    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let sampler = RandomSampler::from_entropy()?;
    let game = GameController::boot(config.game, LocalStore, sampler, DomHost::new(document.clone()));
    APP.with(|cell| *cell.borrow_mut() = Some(game));

    wire_controls(&document);
    register_service_worker();
    Ok(())
}

#[wasm_bindgen]
pub fn start_session() -> bool {
    with_app(|app| app.start_session().is_ok()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn clear_library() -> bool {
    with_app(|app| app.clear_library()).unwrap_or(false)
}

/// Taps the candidate with `id`. Returns the new score on a hit, -1 otherwise.
#[wasm_bindgen]
pub fn pick(id: &str) -> i32 {
    with_app(|app| app.pick(id)).map_or(-1, pick_code)
}

/// Export code for a pick: the score on a hit (saturating), -1 otherwise.
pub fn pick_code(outcome: PickOutcome) -> i32 {
    match outcome {
        PickOutcome::Hit { score } => i32::try_from(score).unwrap_or(i32::MAX),
        _ => -1,
    }
}

/// Number of images in the booted game's library, 0 before boot.
#[wasm_bindgen]
pub fn library_size() -> usize {
    with_app(|app| app.library().len()).unwrap_or(0)
}

/// Adds already encoded `data:` URLs, e.g. bundled samples fetched by the page.
#[wasm_bindgen]
pub fn add_data_urls(urls: Vec<String>) -> usize {
    with_app(|app| app.add_images(urls.into_iter().map(ImageSource::DataUrl))).unwrap_or(0)
}
