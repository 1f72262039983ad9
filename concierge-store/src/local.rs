use crate::StoreResult;
use concierge_core::ResultStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Key/value storage for the wizard, optionally written through to a JSON
/// file so results survive a restart of the page host.
#[derive(Default)]
pub struct LocalStore {
    items: Mutex<HashMap<String, String>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens (or starts) a file-backed store. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            items: Mutex::new(items),
            path: Some(path),
        })
    }

    fn flush(&self, items: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(path) = &self.path {
            std::fs::write(path, serde_json::to_string_pretty(items)?)?;
        }
        Ok(())
    }
}

impl ResultStore for LocalStore {
    fn set_item(&self, key: &str, value: String) {
        let Ok(mut items) = self.items.lock() else {
            warn!("Local store lock poisoned, dropping write to {}", key);
            return;
        };
        items.insert(key.to_string(), value);
        if let Err(e) = self.flush(&items) {
            warn!("Failed to persist local store: {}", e);
        }
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }
}
