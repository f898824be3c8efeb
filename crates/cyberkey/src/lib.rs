//! cyberkey - Local credential vault
//!
//! "Your logins, behind one PIN."
//!
//! A single-user vault for (platform, username, password) records,
//! persisted in a file-backed key-value store under the user's data
//! directory. Access is gated by a 4-digit PIN compared verbatim to
//! user input. Stored passwords are base64-encoded: reversible
//! obfuscation, not encryption.

pub mod password;
pub mod paths;
pub mod store;
pub mod vault;

pub use paths::Paths;
pub use store::LocalStore;
pub use vault::{Vault, VaultEntry, VaultError};
