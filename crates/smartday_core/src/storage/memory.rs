//! In-memory storage backend for tests and ephemeral sessions.

use super::{StateStorage, StorageResult};
use std::collections::HashMap;

/// Volatile `StateStorage`; contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStorage {
    items: HashMap<String, String>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `value` already stored under `name`.
    pub fn with_item(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut items = HashMap::new();
        items.insert(name.into(), value.into());
        Self { items }
    }
}

impl StateStorage for MemoryStateStorage {
    fn get_item(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self.items.get(name).cloned())
    }

    fn set_item(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.items.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
