//! In-memory [`Storage`] implementation for tests and ephemeral deployments.
//!
//! Objects live in a `HashMap` behind `std::sync::RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::{validate_key, Storage};

pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for InMemoryStorage {
    fn storage_type(&self) -> &str {
        "memory"
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        objects.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("object not found: {}", key))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        Ok(objects.contains_key(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        objects.remove(key);
        Ok(())
    }
}
