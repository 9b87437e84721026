//! Password-based key derivation using PBKDF2-HMAC-SHA512.
//!
//! The same password + salt + iteration count always produce the same
//! key, which is what lets the envelope re-derive its key from the
//! stored salt on decryption.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::{RngCore, TryRngCore};
use sha2::Sha512;

use crate::errors::{CredVaultError, Result};

/// Length of the envelope salt in bytes.
pub const SALT_LEN: usize = 16;

/// Length of the cipher initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Length of the derived key in bytes (128 bits, for AES-128).
pub const KEY_LEN: usize = 16;

/// Configurable key-derivation parameters.
#[derive(Debug, Clone, Copy)]
pub struct PbeParams {
    /// Number of PBKDF2 iterations (default: 100).
    pub iterations: u32,
}

impl Default for PbeParams {
    fn default() -> Self {
        Self { iterations: 100 }
    }
}

/// Derive a 16-byte encryption key from a password and salt.
///
/// Rejects an iteration count of zero so a misconfigured caller cannot
/// silently skip the stretching step.
pub fn derive_key(password: &[u8], salt: &[u8], params: &PbeParams) -> Result<[u8; KEY_LEN]> {
    if params.iterations < 1 {
        return Err(CredVaultError::KeyDerivationFailed(
            "iteration count must be at least 1".into(),
        ));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha512>(password, salt, params.iterations, &mut key);
    Ok(key)
}

/// Generate a cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.unwrap_err().fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically random initialization vector.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.unwrap_err().fill_bytes(&mut iv);
    iv
}
