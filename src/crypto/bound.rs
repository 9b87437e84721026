//! Crypto handle bound to a key derived from the master password.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::CryptoService;
use crate::errors::Result;

/// Encrypts and decrypts supporting data (not user data) with a key
/// derived from the master password digest.
///
/// Backends that keep their own credential metadata (OAuth tokens and
/// the like) use this so the metadata is bound to the master password
/// without the password itself being stored anywhere.  The derived key
/// is zeroed when the handle is dropped.
pub struct BoundCrypto {
    service: Arc<dyn CryptoService>,
    key: Zeroizing<Vec<u8>>,
}

impl BoundCrypto {
    /// Bind a crypto service to the digest of `master_password`.
    ///
    /// The password is only read for the duration of this call.
    pub fn new(service: Arc<dyn CryptoService>, master_password: &[u8]) -> Self {
        let key = Zeroizing::new(service.digest(master_password).into_bytes());
        Self { service, key }
    }

    /// Encrypt supporting data under the bound key.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.service.encrypt(&self.key, data)
    }

    /// Decrypt supporting data under the bound key.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.service.decrypt(&self.key, data)
    }
}
