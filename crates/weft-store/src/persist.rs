//! Persistence boundary.
//!
//! The entire store state is serialized as one JSON document under a single
//! fixed storage key and rewritten after every mutation. At startup the
//! document is read back to seed initial state, falling back to a built-in
//! default single page when absent or unparsable.
//!
//! [`SnapshotStore`] is the host seam: file-backed for desktop sessions,
//! in-memory for tests and embedding hosts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use weft_core::id::EntityId;
use weft_core::model::{
    ApiEndpoint, AppPage, AppSettings, ComponentNode, Datasource, GeneratedCode, GlobalState,
    SqlQuery,
};

/// Fixed storage key the snapshot document lives under.
pub const STORAGE_KEY: &str = "weft_app_state_v1";

/// Everything the store persists.
///
/// `components` is the working list of the current page at save time; when
/// missing from a hand-edited document, hydration falls back to the current
/// page's saved components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub pages: Vec<AppPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentNode>>,
    #[serde(default)]
    pub apis: Vec<ApiEndpoint>,
    #[serde(default)]
    pub sql_queries: Vec<SqlQuery>,
    #[serde(default)]
    pub datasources: Vec<Datasource>,
    pub current_page_id: EntityId,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default)]
    pub global_state: GlobalState,
    #[serde(default)]
    pub generated_code: GeneratedCode,
}

/// Host storage for the serialized snapshot, keyed by the storage key.
pub trait SnapshotStore {
    fn load(&self, key: &str) -> Option<String>;
    /// Write the document. Failures are the implementation's to report —
    /// a failed save must never abort the mutation that triggered it.
    fn save(&mut self, key: &str, document: &str);
}

// ─── File-backed store ───────────────────────────────────────────────────

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn save(&mut self, key: &str, document: &str) {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            log::error!("failed to create snapshot dir {:?}: {err}", self.dir);
            return;
        }
        if let Err(err) = std::fs::write(self.path_for(key), document) {
            log::error!("failed to write snapshot {key}: {err}");
        }
    }
}

// ─── In-memory store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: HashMap<String, String>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a document (e.g. a snapshot saved by an earlier session).
    pub fn seeded(key: &str, document: &str) -> Self {
        let mut store = Self::default();
        store.entries.insert(key.to_string(), document.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, document: &str) {
        self.entries.insert(key.to_string(), document.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path());
        assert_eq!(store.load(STORAGE_KEY), None);

        store.save(STORAGE_KEY, "{\"pages\":[]}");
        assert_eq!(store.load(STORAGE_KEY).as_deref(), Some("{\"pages\":[]}"));
    }

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemorySnapshotStore::new();
        store.save("k", "doc");
        assert_eq!(store.load("k").as_deref(), Some("doc"));
        assert_eq!(store.load("other"), None);
    }
}
