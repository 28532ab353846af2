//! Save/load helpers
//!
//! Everything persisted by the game is a small JSON document: the best score,
//! settings, and optional rule-set overrides. Native builds write files
//! (tmp → rename so a crash never leaves a half-written save); wasm builds use
//! LocalStorage.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Persistence errors
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document is not valid JSON for the expected type
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Browser storage unavailable or rejected the write
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Read a JSON document from disk
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PersistError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write a JSON document to disk via a temporary sibling file
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), PersistError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// LocalStorage access (wasm only)
#[cfg(target_arch = "wasm32")]
pub mod local {
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use super::PersistError;

    fn storage() -> Result<web_sys::Storage, PersistError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| PersistError::Storage("LocalStorage unavailable".to_string()))
    }

    /// Read a JSON document; `Ok(None)` when the key was never written
    pub fn read<T: DeserializeOwned>(key: &str) -> Result<Option<T>, PersistError> {
        let storage = storage()?;
        match storage.get_item(key) {
            Ok(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Ok(None) => Ok(None),
            Err(_) => Err(PersistError::Storage(format!("failed to read `{key}`"))),
        }
    }

    pub fn write<T: Serialize>(key: &str, value: &T) -> Result<(), PersistError> {
        let json = serde_json::to_string(value)?;
        storage()?
            .set_item(key, &json)
            .map_err(|_| PersistError::Storage(format!("failed to write `{key}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_roundtrip_creates_parent() {
        let dir = std::env::temp_dir().join(format!("xr-runner-persist-{}", std::process::id()));
        let path = dir.join("nested").join("doc.json");

        write_json(&path, &vec![3u32, 1, 4]).expect("write should succeed");
        let back: Vec<u32> = read_json(&path).expect("read should succeed");
        assert_eq!(back, vec![3, 1, 4]);
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<u64, _> = read_json("/definitely/not/here.json");
        assert!(matches!(result, Err(PersistError::Io(_))));
    }
}
