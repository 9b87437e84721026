//! Local-filesystem backend.
//!
//! Stores each payload as a plain file under a data directory.  Writes
//! are atomic: the payload goes to a temp file in the same directory
//! first, then a rename replaces the target, so readers never see a
//! half-written blob.

use std::fs;
use std::path::PathBuf;

use crate::backend::PersistenceBackend;
use crate::errors::Result;

/// Backend storing payloads as files under `data_dir`.
pub struct LocalFileBackend {
    data_dir: PathBuf,
}

impl LocalFileBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

impl PersistenceBackend for LocalFileBackend {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read(path)?)
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.path_for(name);
        let tmp_path = self.data_dir.join(format!(".{name}.tmp"));
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name).exists())
    }

    fn id(&self) -> &str {
        "local-file"
    }

    fn display_name(&self) -> &str {
        "Local file system"
    }
}
