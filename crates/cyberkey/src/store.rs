//! LocalStore - persistent key-value mapping
//!
//! The browser-localStorage analog: each key is stored as its own
//! plain file inside the store root directory. Values are UTF-8
//! strings. No locking, no journal - this is a single-user store.

use anyhow::{bail, Context, Result};
use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store-specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// File-backed string-to-string mapping
pub struct LocalStore {
    /// Root directory holding one file per key
    root: PathBuf,
}

impl LocalStore {
    /// Open a store, creating the root directory if needed
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create store directory: {}", root.display()))?;
        fs::set_permissions(root, Permissions::from_mode(0o700))?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Validate a key name
    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            bail!(StoreError::InvalidKey("key cannot be empty".to_string()));
        }

        // Keys become filenames, so keep them to a single path segment
        if key.contains('/') || key.contains("..") {
            bail!(StoreError::InvalidKey(format!(
                "key must not contain path separators: {}",
                key
            )));
        }

        Ok(())
    }

    /// Path of the file backing a key
    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Read the value for a key, if present
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.validate_key(key)?;

        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let value = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store key: {}", key))?;
        Ok(Some(value))
    }

    /// Write the value for a key
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.validate_key(key)?;

        let path = self.key_path(key);
        fs::write(&path, value)
            .with_context(|| format!("Failed to write store key: {}", key))?;
        fs::set_permissions(&path, Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.key_path(key).exists()
    }

    /// Remove a key (missing key is a no-op)
    pub fn remove(&self, key: &str) -> Result<()> {
        self.validate_key(key)?;

        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove store key: {}", key))?;
        }

        Ok(())
    }

    /// Remove every key in the store
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_file() {
                fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }
}
