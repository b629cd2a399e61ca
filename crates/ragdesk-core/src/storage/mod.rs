//! Object storage abstraction.
//!
//! The [`Storage`] trait is the uniform save/load interface used by the file
//! service. Backends are thin adapters: an in-memory map here, a local
//! directory and S3 in the application crate.
//!
//! Methods are synchronous. The server calls them from blocking worker
//! threads, never from an async task directly.

pub mod memory;

use anyhow::{bail, Result};

/// A key/value object store.
///
/// Keys are `/`-separated relative paths such as
/// `upload_files/<tenant>/<uuid>.pdf`.
pub trait Storage: Send + Sync {
    /// Backend identifier recorded on each upload row (`"local"`, `"s3"`, ...).
    fn storage_type(&self) -> &str;

    /// Write `data` under `key`, replacing any existing object.
    fn save(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the object stored under `key`.
    ///
    /// Returns an error containing `"not found"` when the key is absent.
    fn load(&self, key: &str) -> Result<Vec<u8>>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Reject keys that could escape a backend's root.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("invalid storage key: empty");
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        bail!("invalid storage key: '{}'", key);
    }
    if key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        bail!("invalid storage key: '{}'", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("upload_files/t1/abc.pdf").is_ok());
        assert!(validate_key("a.txt").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("upload_files/../secret").is_err());
        assert!(validate_key("upload_files//x").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("./a").is_err());
    }
}
