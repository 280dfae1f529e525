//! Usage: Durable key-value storage surface (browser `localStorage` equivalent) + adapters.

use crate::shared::fs::{read_optional_file, write_file_atomic};
use crate::shared::mutex_ext::MutexExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOCAL_STORAGE_FILE_NAME: &str = "local_storage.json";

/// String-valued key-value store scoped to one installation.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove_item(&self, key: &str) -> Result<(), String>;
}

#[derive(Debug, Default)]
pub struct MemoryLocalStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .items
            .lock_or_recover()
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.items.lock_or_recover().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        self.items
            .lock_or_recover()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        self.items.lock_or_recover().remove(key);
        Ok(())
    }
}

/// One JSON object file holding every key; rewritten atomically on each mutation.
#[derive(Debug)]
pub struct FileLocalStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileLocalStorage {
    pub fn open(dir: &Path) -> Result<Self, String> {
        let path = dir.join(LOCAL_STORAGE_FILE_NAME);
        let items = match read_optional_file(&path).map_err(|e| format!("STORAGE_ERROR: {e}"))? {
            None => BTreeMap::new(),
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Some(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(items) => items,
                Err(err) => {
                    // Same policy as a browser with a wiped profile: start empty, keep the app usable.
                    tracing::warn!(
                        path = %path.display(),
                        "local storage file is not a JSON string map, starting empty: {}",
                        err
                    );
                    BTreeMap::new()
                }
            },
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), String> {
        let bytes = serde_json::to_vec_pretty(items)
            .map_err(|e| format!("STORAGE_ERROR: failed to serialize local storage: {e}"))?;
        write_file_atomic(&self.path, &bytes).map_err(|e| format!("STORAGE_ERROR: {e}"))
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.items.lock_or_recover().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        let mut items = self.items.lock_or_recover();
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush(&items) {
            match previous {
                Some(prev) => items.insert(key.to_string(), prev),
                None => items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        let mut items = self.items.lock_or_recover();
        let Some(previous) = items.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.flush(&items) {
            items.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fs::test_support::unique_tmp_dir;

    #[test]
    fn memory_storage_get_set_remove() {
        let storage = MemoryLocalStorage::new();
        assert_eq!(storage.get_item("k").expect("get"), None);
        storage.set_item("k", "v1").expect("set");
        storage.set_item("k", "v2").expect("set");
        assert_eq!(storage.get_item("k").expect("get").as_deref(), Some("v2"));
        storage.remove_item("k").expect("remove");
        assert_eq!(storage.get_item("k").expect("get"), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = unique_tmp_dir("local_storage");
        {
            let storage = FileLocalStorage::open(&dir).expect("open");
            storage.set_item("lastKnownLocation", "{\"a\":1}").expect("set");
            storage.set_item("travelUser", "{}").expect("set");
            storage.remove_item("travelUser").expect("remove");
        }

        let reopened = FileLocalStorage::open(&dir).expect("reopen");
        assert_eq!(
            reopened.get_item("lastKnownLocation").expect("get").as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(reopened.get_item("travelUser").expect("get"), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_storage_starts_empty_when_file_is_garbage() {
        let dir = unique_tmp_dir("local_storage");
        std::fs::write(dir.join(LOCAL_STORAGE_FILE_NAME), "[1, 2").expect("write");

        let storage = FileLocalStorage::open(&dir).expect("open");
        assert_eq!(storage.get_item("anything").expect("get"), None);

        storage.set_item("k", "v").expect("set");
        let content = std::fs::read_to_string(storage.path()).expect("read");
        assert!(content.contains("\"k\""));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_storage_starts_empty_when_file_is_not_utf8() {
        let dir = unique_tmp_dir("local_storage");
        std::fs::write(dir.join(LOCAL_STORAGE_FILE_NAME), [0xff, 0xfe, b'{']).expect("write");

        let storage = FileLocalStorage::open(&dir).expect("open");
        assert_eq!(storage.get_item("lastKnownLocation").expect("get"), None);

        storage.set_item("k", "v").expect("set");
        let reopened = FileLocalStorage::open(&dir).expect("reopen");
        assert_eq!(reopened.get_item("k").expect("get").as_deref(), Some("v"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn removing_missing_key_does_not_create_file() {
        let dir = unique_tmp_dir("local_storage");
        let storage = FileLocalStorage::open(&dir).expect("open");
        storage.remove_item("absent").expect("remove");
        assert!(!storage.path().exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
