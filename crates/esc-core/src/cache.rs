// ── Persistent result cache ──
//
// A single JSON file mapping slot names to values. Every `set` reloads the
// whole file, replaces one slot and rewrites the file. No locking: the
// client is used by one process at a time and the last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

/// Well-known slot names.
pub mod slot {
    /// Raw line list from the last fetch, sorted by id.
    pub const LINES: &str = "ll";
    /// The filtered, sorted lines last shown to the user.
    pub const SELECTION: &str = "ll.selection";
    /// Generic "last shown output".
    pub const LAST: &str = "last";

    // Last rendered output per command family.
    pub const LINES_LIST: &str = "ll.list";
    pub const LINES_STATUS: &str = "ll.status";
    pub const LINES_SHOW: &str = "ll.show";
    pub const GROUPS_LIST: &str = "lg.list";
    pub const CONFIG_LIST: &str = "config.list";

    /// Slots holding rendered text, in the order `last --list` shows them.
    pub const RENDERED: &[&str] = &[
        LAST,
        LINES_LIST,
        LINES_STATUS,
        LINES_SHOW,
        GROUPS_LIST,
        CONFIG_LIST,
    ];
}

type Store = BTreeMap<String, Value>;

/// Handle to the on-disk cache file.
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    /// Open a handle. The file is not touched until the first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one slot. Missing file, corrupt file, absent slot and a value
    /// of the wrong shape are all a miss.
    pub fn get<T: DeserializeOwned>(&self, slot: &str) -> Option<T> {
        let value = self.load().remove(slot)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(slot, error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Replace one slot and persist the whole store.
    pub fn set<T: Serialize + ?Sized>(&self, slot: &str, value: &T) -> Result<(), CoreError> {
        let value = serde_json::to_value(value)
            .map_err(|e| CoreError::Internal(format!("cannot serialize slot '{slot}': {e}")))?;

        let mut store = self.load();
        store.insert(slot.to_owned(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }
        let bytes = serde_json::to_vec(&store)
            .map_err(|e| CoreError::Internal(format!("cannot serialize cache: {e}")))?;
        std::fs::write(&self.path, bytes).map_err(|e| self.io_error(&e))?;

        tracing::debug!(slot, path = %self.path.display(), "cache slot stored");
        Ok(())
    }

    fn load(&self) -> Store {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Store::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache unreadable, starting empty");
                return Store::new();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "cache corrupt, starting empty");
            Store::new()
        })
    }

    fn io_error(&self, err: &std::io::Error) -> CoreError {
        CoreError::Cache {
            message: format!("{}: {err}", self.path.display()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    fn temp_cache() -> (tempfile::TempDir, ResultCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path().join("nested").join("cache.json"));
        (dir, cache)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        ids: Vec<u32>,
    }

    #[test]
    fn round_trip() {
        let (_dir, cache) = temp_cache();
        let value = Sample {
            name: "north".into(),
            ids: vec![3, 1, 2],
        };

        cache.set("sample", &value).unwrap();
        assert_eq!(cache.get::<Sample>("sample"), Some(value));
    }

    #[test]
    fn untouched_slot_is_a_miss() {
        let (_dir, cache) = temp_cache();
        assert_eq!(cache.get::<String>(slot::LAST), None);

        cache.set(slot::LINES_LIST, "table").unwrap();
        assert_eq!(cache.get::<String>(slot::LAST), None);
    }

    #[test]
    fn set_replaces_only_its_slot() {
        let (_dir, cache) = temp_cache();
        cache.set("a", "first").unwrap();
        cache.set("b", "other").unwrap();
        cache.set("a", "second").unwrap();

        assert_eq!(cache.get::<String>("a").as_deref(), Some("second"));
        assert_eq!(cache.get::<String>("b").as_deref(), Some("other"));
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_overwritten() {
        let (dir, cache) = temp_cache();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(cache.path(), b"\x80not json").unwrap();

        assert_eq!(cache.get::<String>("a"), None);
        cache.set("a", "fresh").unwrap();
        assert_eq!(cache.get::<String>("a").as_deref(), Some("fresh"));
    }

    #[test]
    fn wrong_shape_is_a_miss() {
        let (_dir, cache) = temp_cache();
        cache.set("a", &42).unwrap();
        assert_eq!(cache.get::<Sample>("a"), None);
        assert_eq!(cache.get::<u32>("a"), Some(42));
    }

    #[test]
    fn handles_share_one_store() {
        let (_dir, cache) = temp_cache();
        let other = ResultCache::open(cache.path());

        cache.set("a", "written by one").unwrap();
        assert_eq!(other.get::<String>("a").as_deref(), Some("written by one"));
    }
}
