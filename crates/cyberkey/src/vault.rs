//! Vault - PIN-gated credential records
//!
//! The vault is an ordered list of (platform, username, password)
//! entries kept in memory and mirrored to a [`LocalStore`]. The whole
//! list lives as one JSON blob under the `vault` key; the PIN is a
//! separate scalar under the `pin` key. Passwords are base64-encoded
//! before they hit the store - reversible obfuscation, not encryption.

use crate::store::LocalStore;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// PIN used when none has been set
pub const DEFAULT_PIN: &str = "0000";

/// Store key holding the serialized entry list
const VAULT_KEY: &str = "vault";
/// Store key holding the PIN scalar
const PIN_KEY: &str = "pin";

/// Vault-specific errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Entry not found: {0}")]
    NotFound(i64),

    #[error("Field cannot be empty: {0}")]
    EmptyField(&'static str),

    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("Vault is empty, nothing to export")]
    EmptyVault,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored credential record
///
/// All fields default so that a hand-damaged blob degrades per entry
/// instead of losing the whole vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Unique id, derived from the creation timestamp (ms)
    #[serde(default)]
    pub id: i64,
    /// Service the credential belongs to (e.g., "github")
    #[serde(default)]
    pub platform: String,
    /// Login name on that service
    #[serde(default)]
    pub username: String,
    /// Password, base64-encoded at rest
    #[serde(default)]
    pub password: String,
}

/// The credential vault
pub struct Vault {
    /// Backing key-value store
    store: LocalStore,
    /// In-memory entry list, insertion-ordered
    entries: Vec<VaultEntry>,
    /// Current PIN
    pin: String,
}

impl Vault {
    /// Open the vault, loading entries and PIN from the store.
    ///
    /// A missing or unparseable blob yields an empty vault; individual
    /// entries that fail to deserialize are skipped.
    pub fn open(store: LocalStore) -> Result<Self> {
        let entries = match store.get(VAULT_KEY)? {
            Some(raw) => Self::parse_blob(&raw),
            None => Vec::new(),
        };

        let pin = store
            .get(PIN_KEY)?
            .unwrap_or_else(|| DEFAULT_PIN.to_string());

        tracing::debug!(entries = entries.len(), "vault loaded");

        Ok(Self {
            store,
            entries,
            pin,
        })
    }

    /// Tolerant blob parse: bad JSON or a non-array yields no entries,
    /// non-object elements are dropped
    fn parse_blob(raw: &str) -> Vec<VaultEntry> {
        let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };

        values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// Write the entry list back to the store
    fn persist(&self) -> Result<()> {
        let blob = serde_json::to_string(&self.entries)?;
        self.store.set(VAULT_KEY, &blob)?;
        tracing::debug!(entries = self.entries.len(), "vault persisted");
        Ok(())
    }

    /// Trim inputs and reject empty fields
    fn validate_fields(
        platform: &str,
        username: &str,
        password: &str,
    ) -> Result<(String, String, String)> {
        let platform = platform.trim();
        let username = username.trim();
        let password = password.trim();

        if platform.is_empty() {
            bail!(VaultError::EmptyField("platform"));
        }
        if username.is_empty() {
            bail!(VaultError::EmptyField("username"));
        }
        if password.is_empty() {
            bail!(VaultError::EmptyField("password"));
        }

        Ok((
            platform.to_string(),
            username.to_string(),
            password.to_string(),
        ))
    }

    /// Add a new entry, returning its id.
    ///
    /// Ids are the creation time in milliseconds; a collision (two adds
    /// inside the same millisecond) is bumped until unique.
    pub fn add(&mut self, platform: &str, username: &str, password: &str) -> Result<i64> {
        let (platform, username, password) = Self::validate_fields(platform, username, password)?;

        let mut id = Utc::now().timestamp_millis();
        while self.entries.iter().any(|e| e.id == id) {
            id += 1;
        }

        self.entries.push(VaultEntry {
            id,
            platform,
            username,
            password: encode_password(&password),
        });

        self.persist()?;
        Ok(id)
    }

    /// Replace an entry in place, keeping its id
    pub fn update(&mut self, id: i64, platform: &str, username: &str, password: &str) -> Result<()> {
        let (platform, username, password) = Self::validate_fields(platform, username, password)?;

        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            bail!(VaultError::NotFound(id));
        };

        entry.platform = platform;
        entry.username = username;
        entry.password = encode_password(&password);

        self.persist()
    }

    /// Remove an entry by id
    pub fn delete(&mut self, id: i64) -> Result<()> {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            bail!(VaultError::NotFound(id));
        };

        self.entries.remove(index);
        self.persist()
    }

    /// Fetch an entry with the password decoded
    pub fn get(&self, id: i64) -> Result<VaultEntry> {
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            bail!(VaultError::NotFound(id));
        };

        let mut entry = entry.clone();
        entry.password = safe_decode(&entry.password);
        Ok(entry)
    }

    /// All entries, insertion-ordered, passwords still encoded
    pub fn entries(&self) -> &[VaultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring match on platform.
    ///
    /// Entries with an empty platform (degraded blob) are skipped.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&VaultEntry> {
        let query = query.to_lowercase();

        self.entries
            .iter()
            .filter(|e| !e.platform.is_empty())
            .filter(|e| e.platform.to_lowercase().contains(&query))
            .collect()
    }

    /// Verbatim comparison against the stored PIN
    pub fn verify_pin(&self, input: &str) -> bool {
        input == self.pin
    }

    /// Change the PIN; must be exactly 4 ASCII digits
    pub fn set_pin(&mut self, new_pin: &str) -> Result<()> {
        if new_pin.len() != 4 || !new_pin.chars().all(|c| c.is_ascii_digit()) {
            bail!(VaultError::InvalidPin);
        }

        self.store.set(PIN_KEY, new_pin)?;
        self.pin = new_pin.to_string();
        Ok(())
    }

    /// Write a JSON backup of the entry list (passwords stay encoded)
    pub fn export(&self, output: &Path) -> Result<()> {
        if self.entries.is_empty() {
            bail!(VaultError::EmptyVault);
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(output, json)
            .with_context(|| format!("Failed to write backup: {}", output.display()))?;

        Ok(())
    }

    /// Factory reset: wipe the store, empty the vault, restore the
    /// default PIN
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.entries.clear();
        self.pin = DEFAULT_PIN.to_string();

        tracing::debug!("vault reset to factory state");
        Ok(())
    }
}

/// Encode a password for storage (standard base64)
pub fn encode_password(plain: &str) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, plain)
}

/// Decode a stored password; anything that is not valid base64-UTF-8
/// comes back unchanged
pub fn safe_decode(stored: &str) -> String {
    match base64::Engine::decode(&base64::engine::general_purpose::STANDARD, stored) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| stored.to_string()),
        Err(_) => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!(
            "cyberkey_vault_test_{}_{}",
            std::process::id(),
            id
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn temp_vault() -> (Vault, PathBuf) {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).unwrap();
        let vault = Vault::open(store).unwrap();
        (vault, dir)
    }

    fn reopen(dir: &Path) -> Vault {
        let store = LocalStore::open(dir).unwrap();
        Vault::open(store).unwrap()
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_dir_all(path);
    }

    #[test]
    fn test_fresh_vault_defaults() {
        let (vault, dir) = temp_vault();

        assert!(vault.is_empty());
        assert!(vault.verify_pin(DEFAULT_PIN));
        assert!(!vault.verify_pin("1234"));

        cleanup(&dir);
    }

    #[test]
    fn test_add_and_get_roundtrip() {
        let (mut vault, dir) = temp_vault();

        let id = vault.add("github", "alice", "hunter2").unwrap();

        // Stored form is encoded
        let stored = &vault.entries()[0];
        assert_eq!(stored.password, encode_password("hunter2"));
        assert_ne!(stored.password, "hunter2");

        // get() decodes
        let entry = vault.get(id).unwrap();
        assert_eq!(entry.platform, "github");
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.password, "hunter2");

        cleanup(&dir);
    }

    #[test]
    fn test_ids_unique() {
        let (mut vault, dir) = temp_vault();

        let a = vault.add("a", "u", "p").unwrap();
        let b = vault.add("b", "u", "p").unwrap();
        let c = vault.add("c", "u", "p").unwrap();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);

        cleanup(&dir);
    }

    #[test]
    fn test_update_keeps_id() {
        let (mut vault, dir) = temp_vault();

        let id = vault.add("github", "alice", "old").unwrap();
        vault.update(id, "gitlab", "bob", "new").unwrap();

        assert_eq!(vault.len(), 1);
        let entry = vault.get(id).unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.platform, "gitlab");
        assert_eq!(entry.username, "bob");
        assert_eq!(entry.password, "new");

        cleanup(&dir);
    }

    #[test]
    fn test_delete() {
        let (mut vault, dir) = temp_vault();

        let id = vault.add("github", "alice", "pw").unwrap();
        vault.delete(id).unwrap();

        assert!(vault.is_empty());
        assert!(vault.delete(id).is_err());

        cleanup(&dir);
    }

    #[test]
    fn test_not_found() {
        let (mut vault, dir) = temp_vault();

        assert!(vault.get(42).is_err());
        assert!(vault.update(42, "p", "u", "pw").is_err());
        assert!(vault.delete(42).is_err());

        cleanup(&dir);
    }

    #[test]
    fn test_empty_fields_rejected() {
        let (mut vault, dir) = temp_vault();

        assert!(vault.add("", "user", "pw").is_err());
        assert!(vault.add("github", "", "pw").is_err());
        assert!(vault.add("github", "user", "").is_err());
        // Whitespace-only counts as empty
        assert!(vault.add("   ", "user", "pw").is_err());

        cleanup(&dir);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).unwrap();
        let mut vault = Vault::open(store).unwrap();

        let id = vault.add("github", "alice", "hunter2").unwrap();
        vault.set_pin("4321").unwrap();

        let vault = reopen(&dir);
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get(id).unwrap().password, "hunter2");
        assert!(vault.verify_pin("4321"));
        assert!(!vault.verify_pin(DEFAULT_PIN));

        cleanup(&dir);
    }

    #[test]
    fn test_corrupt_blob_yields_empty_vault() {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).unwrap();
        store.set("vault", "{not json").unwrap();

        let vault = reopen(&dir);
        assert!(vault.is_empty());

        // Non-array JSON is also tolerated
        let store = LocalStore::open(&dir).unwrap();
        store.set("vault", "{\"id\": 1}").unwrap();
        let vault = reopen(&dir);
        assert!(vault.is_empty());

        cleanup(&dir);
    }

    #[test]
    fn test_degraded_blob_skips_bad_elements() {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).unwrap();
        store
            .set(
                "vault",
                r#"[{"id":1,"platform":"github","username":"a","password":"cHc="},7,{"id":2,"username":"b"}]"#,
            )
            .unwrap();

        let vault = reopen(&dir);
        // The bare number is dropped, the object missing fields survives
        assert_eq!(vault.len(), 2);

        // But the field-less entry never shows up in search
        let hits = vault.search("");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].platform, "github");

        cleanup(&dir);
    }

    #[test]
    fn test_search() {
        let (mut vault, dir) = temp_vault();

        vault.add("GitHub", "alice", "pw").unwrap();
        vault.add("gitlab", "alice", "pw").unwrap();
        vault.add("twitter", "alice", "pw").unwrap();

        assert_eq!(vault.search("git").len(), 2);
        assert_eq!(vault.search("HUB").len(), 1);
        assert_eq!(vault.search("").len(), 3);
        assert_eq!(vault.search("reddit").len(), 0);

        cleanup(&dir);
    }

    #[test]
    fn test_pin_validation() {
        let (mut vault, dir) = temp_vault();

        assert!(vault.set_pin("123").is_err());
        assert!(vault.set_pin("12345").is_err());
        assert!(vault.set_pin("12a4").is_err());
        assert!(vault.set_pin("").is_err());

        vault.set_pin("9876").unwrap();
        assert!(vault.verify_pin("9876"));

        cleanup(&dir);
    }

    #[test]
    fn test_export() {
        let (mut vault, dir) = temp_vault();
        let backup = dir.join("backup.json");

        // Empty vault refuses to export
        assert!(vault.export(&backup).is_err());

        vault.add("github", "alice", "hunter2").unwrap();
        vault.export(&backup).unwrap();

        let json = fs::read_to_string(&backup).unwrap();
        let entries: Vec<VaultEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(entries.len(), 1);
        // Backup keeps the encoded form
        assert_eq!(entries[0].password, encode_password("hunter2"));

        cleanup(&dir);
    }

    #[test]
    fn test_reset() {
        let dir = temp_dir();
        let store = LocalStore::open(&dir).unwrap();
        let mut vault = Vault::open(store).unwrap();

        vault.add("github", "alice", "pw").unwrap();
        vault.set_pin("4321").unwrap();

        vault.reset().unwrap();
        assert!(vault.is_empty());
        assert!(vault.verify_pin(DEFAULT_PIN));

        // Reset survives reopen
        let vault = reopen(&dir);
        assert!(vault.is_empty());
        assert!(vault.verify_pin(DEFAULT_PIN));

        cleanup(&dir);
    }

    #[test]
    fn test_safe_decode_passthrough() {
        assert_eq!(safe_decode(&encode_password("hunter2")), "hunter2");
        // Not base64 at all
        assert_eq!(safe_decode("not%%base64"), "not%%base64");
        // Valid base64 but not UTF-8
        let bad = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0xff, 0xfe]);
        assert_eq!(safe_decode(&bad), bad);
    }
}
