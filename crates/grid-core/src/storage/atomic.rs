//! Crash-safe JSON persistence.
//!
//! Writes go to a sibling temp file, are synced to disk and then renamed over
//! the target, so readers observe either the old document or the new one.

use crate::{GridError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

/// Read and parse a JSON file. Returns `None` if the file doesn't exist.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GridError::io_with_path(e, path)),
    };

    let data = serde_json::from_str(&contents).map_err(|e| GridError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;
    Ok(Some(data))
}

/// Serialize `data` as pretty JSON and atomically replace `path` with it.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GridError::io_with_path(e, parent))?;
    }

    let serialized = serde_json::to_string_pretty(data).map_err(|e| GridError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    let temp_path = temp_path_for(path);
    let written = write_synced(&temp_path, serialized.as_bytes())
        .and_then(|_| fs::rename(&temp_path, path).map_err(|e| GridError::io_with_path(e, path)));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| GridError::io_with_path(e, path))?;
    file.write_all(bytes)
        .map_err(|e| GridError::io_with_path(e, path))?;
    file.sync_all()
        .map_err(|e| GridError::io_with_path(e, path))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Registries {
        urls: Vec<String>,
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let data = Registries {
            urls: vec!["https://example.com/apps.json".to_string()],
        };

        atomic_write_json(&path, &data).unwrap();
        let read: Option<Registries> = atomic_read_json(&path).unwrap();
        assert_eq!(read, Some(data));
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let read: Option<Registries> = atomic_read_json(&temp_dir.path().join("none.json")).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_read_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let result: Result<Option<Registries>> = atomic_read_json(&path);
        assert!(matches!(result, Err(GridError::Json { .. })));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        atomic_write_json(&path, &Registries { urls: vec![] }).unwrap();
        atomic_write_json(&path, &Registries { urls: vec!["a".into()] }).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
