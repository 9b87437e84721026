//! In-memory backend, for tests and embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::PersistenceBackend;
use crate::errors::Result;

/// Backend keeping payloads in a process-local map.
pub struct MemoryBackend {
    id: String,
    display_name: String,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            blobs: Mutex::new(HashMap::new()),
        }
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistenceBackend for MemoryBackend {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(self.blobs().get(name).cloned().unwrap_or_default())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.blobs().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs().contains_key(name))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
