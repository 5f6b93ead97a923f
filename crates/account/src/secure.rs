//! Secret containers for key material
//!
//! - Derived symmetric keys live in [`SecretBytes`] (`secrecy::SecretBox`)
//! - The account private key lives in [`SecretKeyBytes`]
//!
//! Both are zeroized on drop and never print their contents in `Debug`.
//! `SecretKeyBytes` does not implement `Clone`.

use secrecy::SecretBox;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a secp256k1 private key in bytes
pub const SECRET_KEY_LENGTH: usize = 32;

/// A variable-length secret byte buffer, zeroized on drop.
///
/// The inner value can only be accessed via `expose_secret()`.
pub type SecretBytes = SecretBox<Vec<u8>>;

/// Wrap bytes into a [`SecretBytes`].
pub fn secret_bytes(bytes: Vec<u8>) -> SecretBytes {
    SecretBox::new(Box::new(bytes))
}

/// A 32-byte private key, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyBytes {
    inner: [u8; SECRET_KEY_LENGTH],
}

impl SecretKeyBytes {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self { inner: bytes }
    }

    /// Expose the key bytes.
    ///
    /// The returned reference should not be stored.
    pub fn expose_secret(&self) -> &[u8; SECRET_KEY_LENGTH] {
        &self.inner
    }
}

impl std::fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeyBytes")
            .field("length", &SECRET_KEY_LENGTH)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
