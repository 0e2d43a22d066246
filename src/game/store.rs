//! Last-write-wins key-value persistence (browser local storage in production).

use std::collections::HashMap;

use crate::error::Result;

pub const BEST_SCORE_KEY: &str = "bestScore";
pub const LIBRARY_KEY: &str = "library";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store used natively and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Reads the stored best score. Missing or malformed values count as 0.
pub fn load_best(store: &impl KeyValueStore) -> u32 {
    match store.get(BEST_SCORE_KEY) {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(raw = %raw, "ignoring malformed best score");
            0
        }),
        Ok(None) => 0,
        Err(err) => {
            tracing::warn!("best score unreadable: {err}");
            0
        }
    }
}

pub fn save_best(store: &mut impl KeyValueStore, best: u32) -> Result<()> {
    store.set(BEST_SCORE_KEY, &best.to_string())
}
