use thiserror::Error;

/// Failures surfaced by the game and offline controllers.
///
/// Nothing escapes a handler boundary: the controllers turn these into an
/// alert, a fallback response or a log line. Helpers return them with `?`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("image library is empty")]
    EmptyLibrary,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("persisted library is malformed: {0}")]
    CorruptLibrary(#[source] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("malformed configuration: {0}")]
    ConfigFormat(#[source] serde_json::Error),
    #[error("network request for {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("cache error: {0}")]
    Cache(String),
    #[error("no entropy source: {0}")]
    Entropy(#[from] getrandom::Error),
    #[error("platform error: {0}")]
    Platform(String),
}

impl Error {
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for Error {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self::Platform(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

#[cfg(target_arch = "wasm32")]
impl From<Error> for wasm_bindgen::JsValue {
    fn from(value: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&value.to_string())
    }
}
