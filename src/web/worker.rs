//! Service-worker glue over `CacheStorage` and `fetch`.
//!
//! The worker script initializes the module, calls [`init_worker`], and
//! forwards its `install`, `activate` and `fetch` events to the matching
//! `handle_*` export.

use std::rc::Rc;
use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{
    Cache, CacheStorage, ExtendableEvent, FetchEvent, Request, Response, ServiceWorkerGlobalScope,
};

use super::js_text;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::offline::{OfflineController, OfflineHost};

thread_local! {
    static WORKER: RefCell<Option<Rc<OfflineController<WorkerHost>>>> = const { RefCell::new(None) };
}

pub struct WorkerHost {
    scope: ServiceWorkerGlobalScope,
}

impl WorkerHost {
    fn caches(&self) -> Result<CacheStorage> {
        self.scope.caches().map_err(|e| Error::Cache(js_text(&e)))
    }

    async fn open(&self, name: &str) -> Result<Cache> {
        let cache = JsFuture::from(self.caches()?.open(name))
            .await
            .map_err(|e| Error::Cache(js_text(&e)))?;
        Ok(cache.dyn_into()?)
    }
}

/// `Cache.match` resolves to `undefined` on a miss.
async fn matched(promise: js_sys::Promise) -> Result<Option<Response>> {
    let found = JsFuture::from(promise)
        .await
        .map_err(|e| Error::Cache(js_text(&e)))?;
    if found.is_undefined() {
        return Ok(None);
    }
    Ok(Some(found.dyn_into()?))
}

impl OfflineHost for WorkerHost {
    type Request = Request;
    type Response = Response;

    async fn cache_names(&self) -> Result<Vec<String>> {
        let keys = JsFuture::from(self.caches()?.keys())
            .await
            .map_err(|e| Error::Cache(js_text(&e)))?;
        Ok(js_sys::Array::from(&keys)
            .iter()
            .filter_map(|k| k.as_string())
            .collect())
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        let deleted = JsFuture::from(self.caches()?.delete(name))
            .await
            .map_err(|e| Error::Cache(js_text(&e)))?;
        Ok(deleted.as_bool().unwrap_or(false))
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<()> {
        let cache = self.open(name).await?;
        for (url, response) in entries {
            JsFuture::from(cache.put_with_str(&url, &response))
                .await
                .map_err(|e| Error::Cache(format!("{url}: {}", js_text(&e))))?;
        }
        Ok(())
    }

    async fn lookup(&self, name: &str, url: &str) -> Result<Option<Response>> {
        let cache = self.open(name).await?;
        matched(cache.match_with_str(url)).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>> {
        let cache = self.open(name).await?;
        matched(cache.match_with_request(request)).await
    }

    async fn fetch(&self, url: &str) -> Result<Response> {
        let response = JsFuture::from(self.scope.fetch_with_str(url))
            .await
            .map_err(|e| Error::network(url, js_text(&e)))?;
        Ok(response.dyn_into()?)
    }

    async fn fetch_request(&self, request: &Request) -> Result<Response> {
        let response = JsFuture::from(self.scope.fetch_with_request(request))
            .await
            .map_err(|e| Error::network(request.url(), js_text(&e)))?;
        Ok(response.dyn_into()?)
    }

    fn request_url(request: &Request) -> String {
        request.url()
    }

    fn status(response: &Response) -> u16 {
        response.status()
    }

    async fn skip_waiting(&self) -> Result<()> {
        JsFuture::from(self.scope.skip_waiting()?).await?;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        JsFuture::from(self.scope.clients().claim()).await?;
        Ok(())
    }
}

fn controller() -> std::result::Result<Rc<OfflineController<WorkerHost>>, JsValue> {
    WORKER
        .with(|cell| cell.borrow().clone())
        .ok_or_else(|| JsValue::from_str("worker not initialized"))
}

/// Sets up the offline controller for this worker. `config_json` overrides defaults.
#[wasm_bindgen]
pub fn init_worker(config_json: Option<String>) -> std::result::Result<(), JsValue> {
    let config = AppConfig::from_optional_json(config_json.as_deref())?;
    super::init_logging(&config.log_level);
    let scope: ServiceWorkerGlobalScope = js_sys::global().dyn_into()?;
    let ctl = OfflineController::new(config.offline, WorkerHost { scope });
    tracing::info!(version = ctl.version(), "service worker initialized");
    WORKER.with(|cell| *cell.borrow_mut() = Some(Rc::new(ctl)));
    Ok(())
}

#[wasm_bindgen]
pub fn handle_install(event: ExtendableEvent) -> std::result::Result<(), JsValue> {
    let ctl = controller()?;
    let done = future_to_promise(async move {
        ctl.install().await?;
        Ok(JsValue::UNDEFINED)
    });
    event.wait_until(&done)
}

#[wasm_bindgen]
pub fn handle_activate(event: ExtendableEvent) -> std::result::Result<(), JsValue> {
    let ctl = controller()?;
    let done = future_to_promise(async move {
        let evicted = ctl.activate().await?;
        Ok(JsValue::from(evicted.len() as u32))
    });
    event.wait_until(&done)
}

#[wasm_bindgen]
pub fn handle_fetch(event: FetchEvent) -> std::result::Result<(), JsValue> {
    let ctl = controller()?;
    let request = event.request();
    let response = future_to_promise(async move {
        let served = ctl.respond(&request).await?;
        Ok(served.response.into())
    });
    event.respond_with(&response)
}
