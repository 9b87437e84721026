//! Self-describing password-based encryption envelope.
//!
//! Each call to `encrypt` generates a fresh random salt and IV and
//! prepends them, together with a format version byte, to the
//! ciphertext.  `decrypt` parses them back out at fixed offsets.
//!
//! Layout of the returned byte buffer:
//!   [ version: 1 byte | salt: 16 bytes | iv: 16 bytes | ciphertext ]
//!
//! The key is derived from the password and salt via PBKDF2 and the
//! payload is encrypted with AES-128-CBC/PKCS#7.  A wrong password
//! makes the padding check fail on decryption; callers treat that as
//! "wrong password" rather than data corruption.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use zeroize::Zeroize;

use crate::crypto::digest::sha512_hex;
use crate::crypto::kdf::{self, PbeParams, IV_LEN, SALT_LEN};
use crate::crypto::CryptoService;
use crate::errors::{CredVaultError, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Size of the format version prefix in bytes.
pub const VERSION_LEN: usize = 1;

/// Offset where the ciphertext begins: version + salt + IV.
pub const ENVELOPE_HEADER_LEN: usize = VERSION_LEN + SALT_LEN + IV_LEN;

/// Current envelope format version.
const FORMAT_VERSION: u8 = 0;

/// The envelope cipher.
///
/// Stateless apart from its key-derivation parameters, so a single
/// instance can be shared across any number of calls.
#[derive(Debug, Default)]
pub struct PbeCipher {
    params: PbeParams,
}

impl PbeCipher {
    /// Create a cipher with explicit key-derivation parameters.
    pub fn new(params: PbeParams) -> Self {
        Self { params }
    }
}

impl CryptoService for PbeCipher {
    /// Encrypt `data` under `password`.
    ///
    /// Salt and IV are freshly random on every call, so encrypting the
    /// same plaintext twice never produces the same envelope.
    fn encrypt(&self, password: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let salt = kdf::generate_salt();
        let iv = kdf::generate_iv();

        let mut key = kdf::derive_key(password, &salt, &self.params)?;
        let cipher = Aes128CbcEnc::new_from_slices(&key, &iv).map_err(|e| {
            key.zeroize();
            CredVaultError::EncryptionFailed(format!("invalid key or IV length: {e}"))
        })?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(data);
        key.zeroize();

        let mut output = Vec::with_capacity(ENVELOPE_HEADER_LEN + ciphertext.len());
        output.push(FORMAT_VERSION);
        output.extend_from_slice(&salt);
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt an envelope produced by `encrypt`.
    ///
    /// The version byte is ignored today, reserved for future format
    /// evolution.
    fn decrypt(&self, password: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < ENVELOPE_HEADER_LEN {
            return Err(CredVaultError::DecryptionFailed);
        }

        let salt = &data[VERSION_LEN..VERSION_LEN + SALT_LEN];
        let iv = &data[VERSION_LEN + SALT_LEN..ENVELOPE_HEADER_LEN];
        let ciphertext = &data[ENVELOPE_HEADER_LEN..];

        let mut key = kdf::derive_key(password, salt, &self.params)?;
        let cipher = Aes128CbcDec::new_from_slices(&key, iv).map_err(|_| {
            key.zeroize();
            CredVaultError::DecryptionFailed
        })?;

        // A wrong password surfaces here as a padding failure.
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CredVaultError::DecryptionFailed);
        key.zeroize();
        plaintext
    }

    fn digest(&self, input: &[u8]) -> String {
        sha512_hex(input)
    }
}
