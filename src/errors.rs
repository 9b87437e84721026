use thiserror::Error;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Validation errors ---
    #[error("{0} cannot be empty")]
    EmptySequence(&'static str),

    #[error("Maximum size of {field} exceeded: limit {max}, got {actual}")]
    MaxSizeExceeded {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Row {0} does not exist")]
    NonexistentRow(usize),

    #[error("Serialized table must be exactly {expected} bytes (got {actual})")]
    InvalidDataLength { expected: usize, actual: usize },

    #[error("Secret length {length} cannot cover {classes} character classes")]
    SecretTooShort { length: usize, classes: usize },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Session state errors ---
    #[error("Existing data has not been loaded yet")]
    ExistingDataNotLoaded,

    #[error("There is no unsaved data to store")]
    NoUnsavedData,

    #[error("Invalid password")]
    InvalidPassword,

    // --- Collaborator errors ---
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
