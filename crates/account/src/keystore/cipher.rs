//! AES-128-CTR cipher implementation for keystore encryption
//!
//! CTR mode needs no padding, so the ciphertext is exactly as long as the
//! 32-byte private key.

use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use serde::{Deserialize, Serialize};

use crate::error::{AccountError, AccountResult};
use crate::secure::{secret_bytes, SecretBytes};

use super::decode_hex;

/// Record name of the only supported cipher
pub const AES_128_CTR: &str = "aes-128-ctr";

/// IV (initialization vector) length for AES-128-CTR
pub const IV_LENGTH: usize = 16;

/// AES-128 key length
pub const AES_KEY_LENGTH: usize = 16;

/// Type alias for AES-128-CTR cipher
type Aes128Ctr = Ctr128BE<Aes128>;

/// `cipherparams` for AES-128-CTR
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CipherParams {
    /// Initialization vector as hex string
    pub iv: String,
}

impl CipherParams {
    /// Wrap raw IV bytes
    pub fn new(iv: &[u8]) -> Self {
        Self {
            iv: hex::encode(iv),
        }
    }

    /// Get the IV bytes, checking the length
    pub fn iv(&self) -> AccountResult<Vec<u8>> {
        let iv = decode_hex(&self.iv, "cipherparams.iv")?;
        if iv.len() != IV_LENGTH {
            return Err(AccountError::MalformedRecord(format!(
                "IV must be {} bytes, got {}",
                IV_LENGTH,
                iv.len()
            )));
        }
        Ok(iv)
    }
}

/// Check the record's `cipher` name
pub fn check_cipher(name: &str) -> AccountResult<()> {
    if name == AES_128_CTR {
        Ok(())
    } else {
        Err(AccountError::UnsupportedCipher(name.to_string()))
    }
}

fn keystream(key: &[u8], iv: &[u8], data: &mut [u8]) -> AccountResult<()> {
    if key.len() < AES_KEY_LENGTH {
        return Err(AccountError::InvalidKdfParams(format!(
            "cipher key must be at least {} bytes, got {}",
            AES_KEY_LENGTH,
            key.len()
        )));
    }

    // Use first 16 bytes of derived key for AES-128
    let key: [u8; AES_KEY_LENGTH] = key[..AES_KEY_LENGTH]
        .try_into()
        .map_err(|_| AccountError::InvalidKdfParams("key conversion failed".to_string()))?;

    let iv: [u8; IV_LENGTH] = iv.try_into().map_err(|_| {
        AccountError::MalformedRecord(format!("IV must be {} bytes, got {}", IV_LENGTH, iv.len()))
    })?;

    let mut cipher = Aes128Ctr::new(&key.into(), &iv.into());
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypt secret data using AES-128-CTR
///
/// # Arguments
///
/// * `secret` - The secret data to encrypt
/// * `derived_key` - Derived key; its first 16 bytes are the AES key
/// * `iv` - 16-byte initialization vector
pub fn encrypt_secret(secret: &[u8], derived_key: &[u8], iv: &[u8]) -> AccountResult<Vec<u8>> {
    let mut ciphertext = secret.to_vec();
    keystream(derived_key, iv, &mut ciphertext)?;
    Ok(ciphertext)
}

/// Decrypt secret data using AES-128-CTR
pub fn decrypt_secret(
    ciphertext: &[u8],
    derived_key: &[u8],
    iv: &[u8],
) -> AccountResult<SecretBytes> {
    let mut plaintext = ciphertext.to_vec();
    keystream(derived_key, iv, &mut plaintext)?;
    Ok(secret_bytes(plaintext))
}

/// Generate a random IV
pub fn generate_iv() -> Vec<u8> {
    use rand::RngCore;
    let mut iv = vec![0u8; IV_LENGTH];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}
