//! Cache-first offline controller for the service worker.
//!
//! One named cache per version tag holds the app shell and the bundled
//! samples. Install fills the new version all-or-nothing, activate evicts
//! every other version, and fetch serves cache, then network, then the shell.

use futures::future::try_join_all;

use crate::config::OfflineConfig;
use crate::error::{Error, Result};

/// Service-worker platform: cache storage, network and client control.
#[allow(async_fn_in_trait)]
pub trait OfflineHost {
    /// An intercepted request, replayed as-is (method, headers, body, mode).
    type Request;
    type Response: Clone;

    /// Names of every cache this origin holds.
    async fn cache_names(&self) -> Result<Vec<String>>;
    async fn delete_cache(&self, name: &str) -> Result<bool>;
    /// Stores all `entries` in cache `name`, creating it if needed.
    async fn put_all(&self, name: &str, entries: Vec<(String, Self::Response)>) -> Result<()>;
    async fn lookup(&self, name: &str, url: &str) -> Result<Option<Self::Response>>;
    /// Cache match for an intercepted request. Non-GET requests never match.
    async fn match_request(&self, name: &str, request: &Self::Request) -> Result<Option<Self::Response>>;
    /// Live GET of a manifest path. Fails only when no response arrives at all.
    async fn fetch(&self, url: &str) -> Result<Self::Response>;
    /// Forwards an intercepted request to the network unchanged.
    async fn fetch_request(&self, request: &Self::Request) -> Result<Self::Response>;
    fn request_url(request: &Self::Request) -> String;
    /// HTTP status of `response`.
    fn status(response: &Self::Response) -> u16;
    /// Lets a freshly installed version replace the waiting one right away.
    async fn skip_waiting(&self) -> Result<()>;
    /// Takes control of pages that are already open.
    async fn claim_clients(&self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
    Shell,
}

#[derive(Clone, Debug)]
pub struct Served<R> {
    pub response: R,
    pub source: FetchSource,
}

pub struct OfflineController<H> {
    config: OfflineConfig,
    host: H,
}

impl<H: OfflineHost> OfflineController<H> {
    pub fn new(config: OfflineConfig, host: H) -> Self {
        Self { config, host }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Fetches the whole manifest and stores it under the current version.
    ///
    /// Any failed fetch fails the install and nothing is written. A failed
    /// write deletes the half-filled cache so older versions keep serving.
    pub async fn install(&self) -> Result<()> {
        let version = self.config.version.as_str();
        tracing::info!(version, assets = self.config.manifest.len(), "installing offline cache");

        let fetches = self.config.manifest.iter().map(|url| async move {
            let response = self.host.fetch(url).await?;
            let status = H::status(&response);
            if !(200..300).contains(&status) {
                return Err(Error::network(url.as_str(), format!("status {status}")));
            }
            Ok::<_, Error>((url.clone(), response))
        });
        let entries = match try_join_all(fetches).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(version, "install aborted: {err}");
                return Err(err);
            }
        };

        if let Err(err) = self.host.put_all(version, entries).await {
            tracing::warn!(version, "install aborted while storing: {err}");
            if let Err(cleanup) = self.host.delete_cache(version).await {
                tracing::warn!(version, "partial cache left behind: {cleanup}");
            }
            return Err(err);
        }

        if let Err(err) = self.host.skip_waiting().await {
            tracing::warn!("skip waiting refused: {err}");
        }
        tracing::info!(version, "offline cache ready");
        Ok(())
    }

    /// Deletes every cache except the current version and claims open pages.
    /// Returns the names of the evicted caches.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let version = self.config.version.as_str();
        let stale: Vec<String> = self
            .host
            .cache_names()
            .await?
            .into_iter()
            .filter(|name| name != version)
            .collect();

        let deletions = stale.iter().map(|name| self.host.delete_cache(name));
        try_join_all(deletions).await?;
        for name in &stale {
            tracing::info!(cache = %name, "evicted stale cache");
        }

        if let Err(err) = self.host.claim_clients().await {
            tracing::warn!("claiming clients failed: {err}");
        }
        tracing::info!(version, evicted = stale.len(), "offline cache active");
        Ok(stale)
    }

    /// Cache first, then network, then the cached shell page. Fails only
    /// when all three miss. The network is tried once.
    pub async fn respond(&self, request: &H::Request) -> Result<Served<H::Response>> {
        let version = self.config.version.as_str();
        let url = H::request_url(request);
        match self.host.match_request(version, request).await {
            Ok(Some(response)) => {
                tracing::debug!(%url, "cache hit");
                return Ok(Served {
                    response,
                    source: FetchSource::Cache,
                });
            }
            Ok(None) => tracing::debug!(%url, "cache miss"),
            Err(err) => tracing::warn!(%url, "cache lookup failed: {err}"),
        }

        let network_err = match self.host.fetch_request(request).await {
            Ok(response) => {
                return Ok(Served {
                    response,
                    source: FetchSource::Network,
                });
            }
            Err(err) => err,
        };
        tracing::warn!(%url, "network unavailable, serving shell: {network_err}");

        match self.host.lookup(version, &self.config.shell).await {
            Ok(Some(response)) => Ok(Served {
                response,
                source: FetchSource::Shell,
            }),
            Ok(None) => Err(network_err),
            Err(err) => {
                tracing::warn!("shell lookup failed: {err}");
                Err(network_err)
            }
        }
    }
}
