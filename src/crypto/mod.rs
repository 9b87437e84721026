//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA512 password-based key derivation (`kdf`)
//! - The self-describing AES-128-CBC envelope cipher (`envelope`)
//! - SHA-512 hex digests (`digest`)
//! - Support-data crypto bound to a digest-derived key (`bound`)

pub mod bound;
pub mod digest;
pub mod envelope;
pub mod kdf;

// Re-export the most commonly used items so callers can write:
//   use credvault::crypto::{PbeCipher, PbeParams, sha512_hex};
pub use bound::BoundCrypto;
pub use digest::sha512_hex;
pub use envelope::{PbeCipher, ENVELOPE_HEADER_LEN, VERSION_LEN};
pub use kdf::{derive_key, generate_iv, generate_salt, PbeParams, IV_LEN, SALT_LEN};

use crate::errors::Result;

/// Encrypt, decrypt or digest arbitrary data.
///
/// The password is borrowed for the duration of the call only; an
/// implementation must never retain it.
pub trait CryptoService: Send + Sync {
    /// Encrypts `data` under `password` into a self-describing envelope.
    fn encrypt(&self, password: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts an envelope produced by [`CryptoService::encrypt`].
    ///
    /// Fails with a cryptographic error on a wrong password or corrupt
    /// input.
    fn decrypt(&self, password: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Computes the SHA-512 digest of `input`, hex-encoded.
    fn digest(&self, input: &[u8]) -> String;
}
