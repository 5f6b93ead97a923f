//! Web3 Secret Storage (v3) encryption primitives
//!
//! This module is the key-derivation-and-cipher layer behind [`Account`]:
//!
//! - Password-based key derivation using pbkdf2 (HMAC-SHA256) or scrypt
//! - AES-128-CTR symmetric encryption
//! - Keccak-256 MAC, compared in constant time
//!
//! All parameters needed to decrypt are stored alongside the ciphertext in
//! the record's `crypto` block.
//!
//! # Example
//!
//! ```rust,ignore
//! use eth_account::keystore::CryptoSection;
//! use eth_account::KdfConfig;
//!
//! let section = CryptoSection::encrypt(&secret, "password", &KdfConfig::default())?;
//! let record_crypto = section.to_value();
//!
//! let parsed = CryptoSection::from_value(&record_crypto)?;
//! let secret = parsed.decrypt("password")?;
//! ```
//!
//! [`Account`]: crate::Account

mod cipher;
mod crypto;
mod kdf;
mod mac;

pub use self::cipher::{check_cipher, decrypt_secret, encrypt_secret, CipherParams, AES_128_CTR};
pub use self::crypto::CryptoSection;
pub use self::kdf::{pbkdf2_derive_key, scrypt_derive_key, Kdf, Pbkdf2Params, ScryptParams};
pub use self::mac::{compute_mac, verify_mac};

use crate::error::{AccountError, AccountResult};

/// Decode a hex field from the record, tolerating a `0x` prefix
pub(crate) fn decode_hex(value: &str, field: &str) -> AccountResult<Vec<u8>> {
    let stripped = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(stripped)
        .map_err(|e| AccountError::MalformedRecord(format!("invalid {} hex: {}", field, e)))
}

/// Encode bytes as lowercase hex without prefix
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
