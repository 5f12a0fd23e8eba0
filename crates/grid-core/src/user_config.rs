//! Persisted user settings.
//!
//! The user config is a flat JSON object. The shell reads two keys from it:
//! [`UserConfigKeys::REGISTRIES`](crate::config::UserConfigKeys::REGISTRIES)
//! and [`UserConfigKeys::APPS`](crate::config::UserConfigKeys::APPS).

use crate::storage::{atomic_read_json, atomic_write_json};
use crate::{GridError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::debug;

/// Key-value access to the user's settings.
pub trait UserConfig: Send + Sync {
    /// Value stored under `key`, `None` if unset.
    fn get_item(&self, key: &str) -> Result<Option<Value>>;

    fn set_item(&self, key: &str, value: Value) -> Result<()>;
}

/// Read `key` as a list of `T`. Unset keys are an empty list.
pub fn read_list<T: DeserializeOwned>(config: &dyn UserConfig, key: &str) -> Result<Vec<T>> {
    match config.get_item(key)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| GridError::Json {
            message: format!("User config key {:?} has the wrong shape: {}", key, e),
            source: Some(e),
        }),
    }
}

/// User config stored as one JSON file.
#[derive(Debug)]
pub struct JsonFileConfig {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        match atomic_read_json::<Value>(&self.path)? {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(GridError::config(format!(
                "User config {} is not a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl UserConfig for JsonFileConfig {
    fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| GridError::Other("user config lock poisoned".into()))?;
        let mut map = self.load()?;
        map.insert(key.to_string(), value);
        atomic_write_json(&self.path, &Value::Object(map))?;
        debug!("Stored user config key {} in {}", key, self.path.display());
        Ok(())
    }
}

/// In-memory user config.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    values: RwLock<Map<String, Value>>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, key: &str, value: Value) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
        self
    }
}

impl UserConfig for MemoryConfig {
    fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .read()
            .map_err(|_| GridError::Other("user config lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| GridError::Other("user config lock poisoned".into()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfigKeys;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_json_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = JsonFileConfig::new(temp_dir.path().join("config.json"));
        assert!(config.get_item(UserConfigKeys::REGISTRIES).unwrap().is_none());

        config
            .set_item(UserConfigKeys::REGISTRIES, json!(["https://a.example/apps.json"]))
            .unwrap();
        config.set_item("theme", json!("dark")).unwrap();

        let reopened = JsonFileConfig::new(config.path());
        let urls: Vec<String> = read_list(&reopened, UserConfigKeys::REGISTRIES).unwrap();
        assert_eq!(urls, vec!["https://a.example/apps.json"]);
        assert_eq!(reopened.get_item("theme").unwrap(), Some(json!("dark")));
    }

    #[test]
    fn test_non_object_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let config = JsonFileConfig::new(&path);
        assert!(config.get_item("apps").unwrap_err().is_configuration());
    }

    #[test]
    fn test_read_list_wrong_shape() {
        let config = MemoryConfig::new().with_item("apps", json!({"name": "x"}));
        let result: Result<Vec<String>> = read_list(&config, "apps");
        assert!(matches!(result, Err(GridError::Json { .. })));
    }

    #[test]
    fn test_read_list_unset() {
        let config = MemoryConfig::new();
        let result: Vec<String> = read_list(&config, "apps").unwrap();
        assert!(result.is_empty());
    }
}
