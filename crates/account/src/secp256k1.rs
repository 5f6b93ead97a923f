//! Secp256k1 key handling for Ethereum accounts
//!
//! Validates raw private keys and derives the public key and the
//! Ethereum address: keccak256(uncompressed_pubkey[1..])[12..].
//!
//! Uses the k256 crate for curve operations.

use alloy_primitives::{keccak256, Address};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroize;

use crate::error::{AccountError, AccountResult};
use crate::secure::{SecretKeyBytes, SECRET_KEY_LENGTH};

/// Validated secp256k1 private key
#[derive(Clone)]
pub struct SecretKey(k256::SecretKey);

impl SecretKey {
    /// Load from raw bytes.
    ///
    /// Fails unless `bytes` is exactly 32 bytes encoding a non-zero scalar
    /// below the curve order.
    pub fn from_slice(bytes: &[u8]) -> AccountResult<Self> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(AccountError::InvalidSecret(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_LENGTH,
                bytes.len()
            )));
        }
        k256::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| AccountError::InvalidSecret("not a valid secp256k1 scalar".to_string()))
    }

    /// Serialize to a zeroizing container
    ///
    /// Intermediate copies of the scalar are wiped before returning.
    pub fn to_secret_bytes(&self) -> SecretKeyBytes {
        let mut field_bytes = self.0.to_bytes();
        let mut bytes = [0u8; SECRET_KEY_LENGTH];
        bytes.copy_from_slice(&field_bytes);
        let secret = SecretKeyBytes::new(bytes);

        field_bytes.as_mut_slice().zeroize();
        bytes.zeroize();
        secret
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Secp256k1 public key
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Serialize to compressed bytes (33 bytes)
    pub fn to_bytes(&self) -> [u8; 33] {
        let encoded = self.0.to_encoded_point(true);
        let mut result = [0u8; 33];
        result.copy_from_slice(encoded.as_bytes());
        result
    }

    /// Serialize to uncompressed bytes (65 bytes, with 0x04 prefix)
    pub fn to_uncompressed_bytes(&self) -> [u8; 65] {
        let encoded = self.0.to_encoded_point(false);
        let mut result = [0u8; 65];
        result.copy_from_slice(encoded.as_bytes());
        result
    }

    /// Derive the Ethereum address (20 bytes)
    pub fn address(&self) -> Address {
        let uncompressed = self.to_uncompressed_bytes();
        // Skip the 0x04 prefix byte
        let hash = keccak256(&uncompressed[1..]);
        Address::from_slice(&hash[12..])
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "PublicKey({})", hex::encode(&bytes[..8]))
    }
}

/// Derive the address for raw private key bytes
pub fn address_from_secret(bytes: &[u8]) -> AccountResult<Address> {
    Ok(SecretKey::from_slice(bytes)?.public_key().address())
}
