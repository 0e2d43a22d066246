//! The player's image library and its local-storage representation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// One tappable image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    /// Anything an `<img src>` accepts: a `data:` URL or a `blob:` object URL.
    pub url: String,
    pub id: String,
}

impl ImageEntry {
    /// New entry with a fresh random id.
    pub fn fresh(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        is_data_url(&self.url)
    }
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Where an imported image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Already encoded (`FileReader.readAsDataURL` output or a bundled sample).
    DataUrl(String),
    /// Raw file contents, embedded as base64.
    Encoded { mime: String, bytes: Vec<u8> },
    /// Transient `blob:` URL. Kept in memory only, revoked on clear.
    ObjectUrl(String),
}

impl ImageSource {
    pub fn into_url(self) -> String {
        match self {
            ImageSource::DataUrl(url) | ImageSource::ObjectUrl(url) => url,
            ImageSource::Encoded { mime, bytes } => {
                format!("data:{mime};base64,{}", STANDARD.encode(bytes))
            }
        }
    }
}

#[derive(Deserialize)]
struct StoredEntry {
    url: String,
    #[serde(default)]
    id: Option<String>,
}

/// Ordered, id-unique list of entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Library {
    entries: Vec<ImageEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ImageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Appends `entry` unless its id is already taken.
    pub fn push(&mut self, entry: ImageEntry) -> bool {
        if self.get(&entry.id).is_some() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The first `cap` embedded entries, the only ones that survive a reload.
    pub fn persisted(&self, cap: usize) -> Vec<&ImageEntry> {
        self.entries.iter().filter(|e| e.is_embedded()).take(cap).collect()
    }

    pub fn to_json(&self, cap: usize) -> Result<String> {
        serde_json::to_string(&self.persisted(cap)).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Rebuilds a library from its stored JSON.
    ///
    /// Ids are kept when present and otherwise derived from the position and
    /// `now_ms`. Non-embedded urls and repeated ids are dropped.
    pub fn restore(raw: &str, now_ms: u64) -> Result<Self> {
        let stored: Vec<StoredEntry> = serde_json::from_str(raw).map_err(Error::CorruptLibrary)?;
        let mut library = Library::new();
        for (i, item) in stored.into_iter().enumerate() {
            if !is_data_url(&item.url) {
                tracing::debug!(index = i, "skipping non-embedded stored entry");
                continue;
            }
            let id = item.id.unwrap_or_else(|| format!("saved-{i}-{now_ms}"));
            if !library.push(ImageEntry { url: item.url, id }) {
                tracing::debug!(index = i, "skipping duplicate stored entry");
            }
        }
        Ok(library)
    }
}
