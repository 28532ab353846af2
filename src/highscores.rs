//! Best score
//!
//! A single integer, read at startup and written only when a finished run
//! beats it. Storage is behind `ScoreStore` so the loop can be tested without
//! touching disk or LocalStorage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::persistence::{self, PersistError};

/// Where the best score lives
pub trait ScoreStore {
    /// `Ok(None)` when nothing was ever saved
    fn load(&mut self) -> Result<Option<u64>, PersistError>;
    fn save(&mut self, best: u64) -> Result<(), PersistError>;
}

/// Best score seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub best: u64,
}

impl HighScore {
    /// Read the stored best; a broken store starts from zero
    pub fn load(store: &mut dyn ScoreStore) -> Self {
        match store.load() {
            Ok(Some(best)) => {
                log::info!("Loaded best score {}", best);
                Self { best }
            }
            Ok(None) => {
                log::info!("No best score found, starting fresh");
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to load best score: {}", e);
                Self::default()
            }
        }
    }

    /// Record a finished run. Returns true if it is a new best.
    pub fn submit(&mut self, score: u64) -> bool {
        if score == 0 || score <= self.best {
            return false;
        }
        self.best = score;
        true
    }

    /// Submit and persist on a new best; storage failures are logged only
    pub fn submit_and_save(&mut self, score: u64, store: &mut dyn ScoreStore) -> bool {
        if !self.submit(score) {
            return false;
        }
        match store.save(self.best) {
            Ok(()) => log::info!("New best score {} saved", self.best),
            Err(e) => log::warn!("New best score {} not saved: {}", self.best, e),
        }
        true
    }
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<u64>, PersistError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let score: HighScore = persistence::read_json(&self.path)?;
        Ok(Some(score.best))
    }

    fn save(&mut self, best: u64) -> Result<(), PersistError> {
        persistence::write_json(&self.path, &HighScore { best })
    }
}

/// In-memory store for tests and storage-less hosts
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub value: Option<u64>,
    pub saves: u32,
}

impl ScoreStore for MemoryStore {
    fn load(&mut self) -> Result<Option<u64>, PersistError> {
        Ok(self.value)
    }

    fn save(&mut self, best: u64) -> Result<(), PersistError> {
        self.value = Some(best);
        self.saves += 1;
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    const STORAGE_KEY: &'static str = "xr_runner_best_score";
}

#[cfg(target_arch = "wasm32")]
impl ScoreStore for LocalStorageStore {
    fn load(&mut self) -> Result<Option<u64>, PersistError> {
        let score: Option<HighScore> = persistence::local::read(Self::STORAGE_KEY)?;
        Ok(score.map(|s| s.best))
    }

    fn save(&mut self, best: u64) -> Result<(), PersistError> {
        persistence::local::write(Self::STORAGE_KEY, &HighScore { best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn load(&mut self) -> Result<Option<u64>, PersistError> {
            Err(PersistError::Storage("offline".to_string()))
        }

        fn save(&mut self, _best: u64) -> Result<(), PersistError> {
            Err(PersistError::Storage("offline".to_string()))
        }
    }

    #[test]
    fn test_submit_only_on_improvement() {
        let mut high = HighScore { best: 50 };
        assert!(!high.submit(0));
        assert!(!high.submit(50));
        assert!(!high.submit(10));
        assert!(high.submit(51));
        assert_eq!(high.best, 51);
    }

    #[test]
    fn test_zero_never_qualifies_on_empty() {
        let mut high = HighScore::default();
        assert!(!high.submit(0));
        assert!(high.submit(1));
    }

    #[test]
    fn test_save_only_when_beaten() {
        let mut store = MemoryStore {
            value: Some(100),
            saves: 0,
        };
        let mut high = HighScore::load(&mut store);
        assert_eq!(high.best, 100);

        assert!(!high.submit_and_save(80, &mut store));
        assert_eq!(store.saves, 0);
        assert!(high.submit_and_save(120, &mut store));
        assert_eq!(store.value, Some(120));
        assert_eq!(store.saves, 1);
    }

    #[test]
    fn test_broken_store_degrades() {
        let mut store = BrokenStore;
        let mut high = HighScore::load(&mut store);
        assert_eq!(high.best, 0);
        assert!(high.submit_and_save(5, &mut store));
        assert_eq!(high.best, 5);
    }

    #[test]
    fn test_json_file_store() {
        let dir = std::env::temp_dir().join(format!("xr-runner-best-{}", std::process::id()));
        let mut store = JsonFileStore::new(dir.join("best.json"));
        assert_eq!(store.load().unwrap(), None);
        store.save(777).unwrap();
        assert_eq!(store.load().unwrap(), Some(777));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
