//! Durable key/value storage areas for persisted filters.
//!
//! [`Storage`] mirrors a browser storage area: synchronous string values
//! addressed by string keys. Two implementations are provided, an in-process
//! map shared between clones and a directory of JSON files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// A synchronous string key/value storage area.
///
/// Implementations use interior mutability so one area can be shared by
/// several handles, the way browser tabs share one origin's storage.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty storage area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the storage area is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// File-backed storage: one `<key>.json` file per key under a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous value in place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a storage area rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for `key`.
    ///
    /// Lowercase ASCII letters, digits, `-` and `_` are kept; every other
    /// byte of the key is written as `%XX`. Distinct keys always map to
    /// distinct files, including on case-insensitive file systems.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for &b in key.as_bytes() {
            if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_' {
                name.push(char::from(b));
            } else {
                name.push_str(&format!("%{:02X}", b));
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "[1,2]").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("a").unwrap();
        storage.remove_item("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_clones_share() {
        let tab_a = MemoryStorage::new();
        let tab_b = tab_a.clone();

        tab_a.set_item("k", "v").unwrap();
        assert_eq!(tab_b.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();

        assert_eq!(storage.get_item("bloom-seen-posts").unwrap(), None);

        storage.set_item("bloom-seen-posts", "[0,1]").unwrap();
        assert_eq!(
            storage.get_item("bloom-seen-posts").unwrap().as_deref(),
            Some("[0,1]")
        );
        assert!(storage.path_for("bloom-seen-posts").exists());

        storage.set_item("bloom-seen-posts", "[2]").unwrap();
        assert_eq!(storage.get_item("bloom-seen-posts").unwrap().as_deref(), Some("[2]"));

        storage.remove_item("bloom-seen-posts").unwrap();
        storage.remove_item("bloom-seen-posts").unwrap();
        assert_eq!(storage.get_item("bloom-seen-posts").unwrap(), None);
    }

    #[test]
    fn test_file_storage_escapes_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let path = storage.path_for("../seen posts/äb");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert_eq!(
            path.file_name().unwrap(),
            "%2E%2E%2Fseen%20posts%2F%C3%A4b.json"
        );
        assert_eq!(
            storage.path_for("bloom-seen-posts").file_name().unwrap(),
            "bloom-seen-posts.json"
        );
    }

    #[test]
    fn test_file_storage_keys_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let keys = [
            "seen:alice",
            "seen/alice",
            "seen alice",
            "seen_alice",
            "Seen_alice",
            "seen%3Aalice",
        ];
        for (i, key) in keys.iter().enumerate() {
            storage.set_item(key, &format!("[{}]", i)).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            let expected = format!("[{}]", i);
            assert_eq!(storage.get_item(key).unwrap().as_deref(), Some(expected.as_str()));
        }

        storage.remove_item("seen:alice").unwrap();
        assert_eq!(storage.get_item("seen:alice").unwrap(), None);
        assert_eq!(storage.get_item("seen/alice").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_arc_dyn_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
