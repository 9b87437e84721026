//! Storage backends for the encrypted vault blob.
//!
//! A backend is any medium that can read, write and probe a named
//! payload.  The whole vault is one blob stored under the fixed name
//! [`SECRETS_NAME`] on every backend; absence of the blob is reported
//! as an empty read, never as an error.

pub mod localfs;
pub mod memory;

pub use localfs::LocalFileBackend;
pub use memory::MemoryBackend;

use crate::crypto::BoundCrypto;
use crate::errors::Result;

/// Logical name of the vault blob on every backend.
pub const SECRETS_NAME: &str = "secrets";

/// Read/write data from/to some local or remote storage medium.
pub trait PersistenceBackend: Send + Sync {
    /// Reads the payload stored under `name`.
    ///
    /// Returns an empty vector if no payload exists.  Absence is not
    /// an error; callers rely on the distinction between "truly
    /// absent" and an I/O failure.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Replaces the payload stored under `name`.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Returns `true` if a payload named `name` exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Stable identifier used to select this backend.
    fn id(&self) -> &str;

    /// Human-readable name, for presentation only.
    fn display_name(&self) -> &str;

    /// Lets a backend authorize itself against its storage medium,
    /// decrypting any credential metadata it keeps with `crypto`.
    ///
    /// The default does nothing; only backends that hold their own
    /// supporting data need to override it.
    fn authorize(&self, _crypto: &BoundCrypto) -> Result<()> {
        Ok(())
    }

    /// Re-encrypts backend-owned supporting data under a new
    /// password-derived key.  The default does nothing.
    fn regenerate_supporting_data(&self, _crypto: &BoundCrypto) -> Result<()> {
        Ok(())
    }
}
