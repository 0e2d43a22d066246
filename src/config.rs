//! Runtime configuration for the page and the service worker.
//!
//! Every field defaults to the value the shipped game uses, so an empty JSON
//! object (or no config at all) yields the stock behavior.

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_CACHE_VERSION: &str = "scab-picker-v1";
pub const DEFAULT_SHELL: &str = "/index.html";

/// App shell plus the bundled sample textures.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/app.js",
    "/manifest.webmanifest",
    "/assets/icons/icon-192.png",
    "/assets/icons/icon-512.png",
    "/assets/samples/sample1.png",
    "/assets/samples/sample2.png",
    "/assets/samples/sample3.png",
    "/assets/samples/sample4.png",
    "/assets/samples/sample5.png",
    "/assets/samples/sample6.png",
];

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub offline: OfflineConfig,
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            offline: OfflineConfig::default(),
            log_level: "info".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Maximum candidates drawn per round.
    pub round_size: usize,
    pub session_seconds: u32,
    /// Seconds lost on a wrong pick.
    pub penalty_seconds: u32,
    pub tick_ms: u32,
    /// Maximum entries written to local storage.
    pub library_cap: usize,
    /// Maximum sources accepted by a single import.
    pub import_cap: usize,
    pub success_vibration: Vec<u32>,
    pub failure_vibration: Vec<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_size: 9,
            session_seconds: 60,
            penalty_seconds: 2,
            tick_ms: 1000,
            library_cap: 60,
            import_cap: 60,
            success_vibration: vec![30],
            failure_vibration: vec![40, 40, 40],
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OfflineConfig {
    /// Cache version tag. Changing it evicts every older cache on activation.
    pub version: String,
    /// Page served when both cache and network miss.
    pub shell: String,
    pub manifest: Vec<String>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.into(),
            shell: DEFAULT_SHELL.into(),
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: AppConfig = serde_json::from_str(raw).map_err(Error::ConfigFormat)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses `raw` when present, defaults otherwise.
    pub fn from_optional_json(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Self::from_json(raw),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.game.validate()?;
        self.offline.validate()?;
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(Error::Config(format!("unknown log level `{}`", self.log_level)));
        }
        Ok(())
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.round_size == 0 {
            return Err(Error::Config("round_size must be at least 1".into()));
        }
        if self.session_seconds == 0 {
            return Err(Error::Config("session_seconds must be at least 1".into()));
        }
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be at least 1".into()));
        }
        Ok(())
    }
}

impl OfflineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::Config("cache version tag is empty".into()));
        }
        if !self.manifest.iter().any(|p| p == &self.shell) {
            return Err(Error::Config(format!(
                "shell page `{}` is not in the cache manifest",
                self.shell
            )));
        }
        Ok(())
    }
}
