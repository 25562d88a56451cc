use super::KeyValueStore;
use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-memory key/value storage.
///
/// Uses an `RwLock` because poll tasks read from other threads while the
/// facade writes.
#[derive(Default)]
pub struct MemKv {
    entries: RwLock<HashMap<String, String>>,
    simulate_write_error: AtomicBool,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation (e.g. a full storage quota).
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Test helper to plant a raw value, bypassing error simulation.
    pub fn set_raw(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("Simulated write error".to_string()));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
