//! Data Directory - locate and seed the local FillMate data file
//!
//! Profiles, templates and settings live in a single JSON file under the
//! user's data directory. The file is created with first-run defaults the
//! first time it is needed.

use anyhow::{anyhow, Result};
use fillmate_core::store::{DataStore, FileStore, StoredData};
use std::path::{Path, PathBuf};

const DATA_FILE: &str = "data.json";

/// Manages the FillMate data directory for the CLI
pub struct DataDirManager {
    /// Base directory for fillmate data (e.g., ~/.local/share/fillmate)
    data_dir: PathBuf,
}

impl DataDirManager {
    /// Create a new DataDirManager using the default data directory
    pub fn new() -> Result<Self> {
        let data_dir = Self::get_data_dir()?;
        Ok(Self { data_dir })
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Get the data directory (~/.local/share/fillmate on all Unix platforms)
    fn get_data_dir() -> Result<PathBuf> {
        #[cfg(windows)]
        {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow!("Could not determine local data directory"))?;
            Ok(base.join("fillmate"))
        }

        #[cfg(not(windows))]
        {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow!("Could not determine home directory"))?;
            Ok(home.join(".local").join("share").join("fillmate"))
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the data file inside the data directory
    pub fn data_file(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE)
    }

    /// Open the store, writing first-run defaults if the file is missing
    pub fn ensure_store(&self) -> Result<FileStore> {
        let store = FileStore::new(self.data_file())?;
        if store.init_defaults()? {
            println!("📦 Created default data at: {}", store.path().display());
        }
        Ok(store)
    }

    /// Load stored data from an explicit file, or from the data directory
    pub fn load(&self, explicit: Option<&str>) -> Result<StoredData> {
        match explicit {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow!("Data file not found: {path}"));
                }
                FileStore::new(path)?.load()
            }
            None => self.ensure_store()?.load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_use_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = DataDirManager::with_dir(dir.path().join("fillmate"));
        assert!(!manager.data_file().exists());

        let data = manager.load(None).unwrap();
        assert!(manager.data_file().exists());
        assert_eq!(data.active_profile.as_deref(), Some("default"));
        assert_eq!(data.templates.len(), 4);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = DataDirManager::with_dir(dir.path());
        let missing = dir.path().join("nope.json");
        assert!(manager.load(missing.to_str()).is_err());
    }
}
