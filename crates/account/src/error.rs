//! Account error types

use thiserror::Error;

/// Errors that can occur while creating, unlocking or persisting an account
#[derive(Error, Debug)]
pub enum AccountError {
    /// Raw key material is not a usable secp256k1 secret key
    #[error("invalid secret key: {0}")]
    InvalidSecret(String),

    /// Keystore record is structurally invalid or lacks required fields
    #[error("malformed keystore record: {0}")]
    MalformedRecord(String),

    /// MAC verification failed during unlock
    #[error("wrong password: MAC verification failed")]
    WrongPassword,

    /// `dump_to_disk` was called on an account without a path
    #[error("no keystore path configured")]
    NoPathConfigured,

    /// Record names a KDF this crate cannot run
    #[error("unsupported KDF function: {0}")]
    UnsupportedKdf(String),

    /// Record names a cipher this crate cannot run
    #[error("unsupported cipher function: {0}")]
    UnsupportedCipher(String),

    /// KDF parameters are out of range
    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AccountError {
    /// Whether the error names an algorithm outside the supported set
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            AccountError::UnsupportedKdf(_) | AccountError::UnsupportedCipher(_)
        )
    }
}

/// Result type for account operations
pub type AccountResult<T> = Result<T, AccountError>;
