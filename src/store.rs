use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const SPREADSHEET_ID_KEY: &str = "spreadsheetId";

/// Key/value persistence for values that outlive a single run
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys; absent keys are left out of the result
    fn get(&self, keys: &[&str]) -> Result<BTreeMap<String, String>>;

    fn set(&self, entries: &[(&str, &str)]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Store kept in a YAML file
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_yaml::to_string(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, keys: &[&str]) -> Result<BTreeMap<String, String>> {
        let mut values = self.read()?;
        values.retain(|k, _| keys.contains(&k.as_str()));
        Ok(values)
    }

    fn set(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self.read()?;
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        self.write(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.read()?;
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<BTreeMap<String, String>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn set(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self.lock();
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.yaml");

        FileStore::new(&path)
            .set(&[(AUTH_TOKEN_KEY, "ya29.token"), (SPREADSHEET_ID_KEY, "1AbC")])
            .unwrap();

        let store = FileStore::new(&path);
        let values = store.get(&[AUTH_TOKEN_KEY, SPREADSHEET_ID_KEY]).unwrap();
        assert_eq!(values.get(AUTH_TOKEN_KEY).map(String::as_str), Some("ya29.token"));
        assert_eq!(values.get(SPREADSHEET_ID_KEY).map(String::as_str), Some("1AbC"));

        store.remove(AUTH_TOKEN_KEY).unwrap();
        let values = FileStore::new(&path).get(&[AUTH_TOKEN_KEY, SPREADSHEET_ID_KEY]).unwrap();
        assert!(!values.contains_key(AUTH_TOKEN_KEY));
        assert!(values.contains_key(SPREADSHEET_ID_KEY));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.yaml"));

        assert!(store.get(&[AUTH_TOKEN_KEY]).unwrap().is_empty());
        store.remove(AUTH_TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_memory_store_filters_keys() {
        let store = MemoryStore::new();
        store.set(&[("a", "1"), ("b", "2")]).unwrap();

        let values = store.get(&["b", "c"]).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["b"], "2");
    }
}
