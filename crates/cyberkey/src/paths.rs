//! Standard paths used by cyberkey

use std::path::PathBuf;

/// Standard cyberkey paths
pub struct Paths {
    /// Data directory (~/.local/share/cyberkey)
    pub data: PathBuf,
    /// Config directory (~/.config/cyberkey)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("cyberkey");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cyberkey");

        Self { data, config }
    }

    /// Root directory for the key-value store
    pub fn store(&self) -> PathBuf {
        self.data.join("store")
    }
}
