//! SHA-512 digests.

use sha2::{Digest, Sha512};

/// Compute the SHA-512 digest of `input` and return it as 128
/// lowercase hex characters.
///
/// Used to derive a password-bound key for auxiliary support data
/// without ever persisting the password itself.
pub fn sha512_hex(input: &[u8]) -> String {
    hex::encode(Sha512::digest(input))
}
