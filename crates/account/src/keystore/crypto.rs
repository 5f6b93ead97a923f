//! The `crypto` block of a keystore record
//!
//! Combines KDF, cipher and MAC into the encrypt/decrypt protocol:
//!
//! 1. derived_key = KDF(password, kdfparams)
//! 2. ciphertext = AES-128-CTR(derived_key[0..16], iv, secret)
//! 3. mac = keccak256(derived_key[16..32] || ciphertext)
//!
//! Decryption verifies the MAC before touching the ciphertext.

use serde_json::{Map, Value};

use crate::config::KdfConfig;
use crate::error::{AccountError, AccountResult};
use crate::secure::SecretBytes;

use super::cipher::{
    check_cipher, decrypt_secret, encrypt_secret, generate_iv, CipherParams, AES_128_CTR,
};
use super::kdf::{expose, generate_salt, Kdf};
use super::mac::{compute_mac, verify_mac};
use super::{decode_hex, encode_hex};

/// Typed view of a record's `crypto` block
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoSection {
    /// Cipher name (`aes-128-ctr`)
    pub cipher: String,
    /// Cipher parameters
    pub cipherparams: CipherParams,
    /// Encrypted secret as hex string
    pub ciphertext: String,
    /// KDF name and parameters
    pub kdf: Kdf,
    /// MAC as hex string
    pub mac: String,
}

impl CryptoSection {
    /// Encrypt `secret` under `password` with fresh salt and IV
    pub fn encrypt(secret: &[u8], password: &str, config: &KdfConfig) -> AccountResult<Self> {
        config.validate()?;

        let kdf = Kdf::from_config(config, &generate_salt());
        let iv = generate_iv();

        let derived_key = kdf.derive_key(password)?;
        let dk_bytes = expose(&derived_key);

        let ciphertext = encrypt_secret(secret, dk_bytes, &iv)?;
        let mac = compute_mac(dk_bytes, &ciphertext)?;

        Ok(Self {
            cipher: AES_128_CTR.to_string(),
            cipherparams: CipherParams::new(&iv),
            ciphertext: encode_hex(&ciphertext),
            kdf,
            mac: encode_hex(&mac),
        })
    }

    /// Parse a `crypto` block
    ///
    /// Missing or mistyped fields are `MalformedRecord`; algorithms outside
    /// the supported set are `UnsupportedKdf` / `UnsupportedCipher`.
    pub fn from_value(value: &Value) -> AccountResult<Self> {
        let block = value.as_object().ok_or_else(|| {
            AccountError::MalformedRecord("crypto must be a JSON object".to_string())
        })?;

        let cipher = str_field(block, "cipher")?;
        let cipherparams = object_field(block, "cipherparams")?;
        let ciphertext = str_field(block, "ciphertext")?;
        let kdf_name = str_field(block, "kdf")?;
        let kdfparams = object_field(block, "kdfparams")?;
        let mac = str_field(block, "mac")?;

        check_cipher(cipher)?;
        let cipherparams: CipherParams = serde_json::from_value(cipherparams.clone())
            .map_err(|e| AccountError::MalformedRecord(format!("invalid cipherparams: {}", e)))?;
        let kdf = Kdf::from_parts(kdf_name, kdfparams)?;

        Ok(Self {
            cipher: cipher.to_string(),
            cipherparams,
            ciphertext: ciphertext.to_string(),
            kdf,
            mac: mac.to_string(),
        })
    }

    /// Serialize back to a `crypto` JSON object
    pub fn to_value(&self) -> Value {
        let mut block = Map::new();
        block.insert("cipher".to_string(), Value::String(self.cipher.clone()));
        block.insert(
            "cipherparams".to_string(),
            serde_json::json!({ "iv": self.cipherparams.iv }),
        );
        block.insert(
            "ciphertext".to_string(),
            Value::String(self.ciphertext.clone()),
        );
        block.insert("kdf".to_string(), Value::String(self.kdf.name().to_string()));
        block.insert("kdfparams".to_string(), self.kdf.params_value());
        block.insert("mac".to_string(), Value::String(self.mac.clone()));
        Value::Object(block)
    }

    /// Verify the MAC and decrypt the secret
    ///
    /// Returns `WrongPassword` if the MAC does not match.
    pub fn decrypt(&self, password: &str) -> AccountResult<SecretBytes> {
        let ciphertext = decode_hex(&self.ciphertext, "ciphertext")?;
        let expected_mac = decode_hex(&self.mac, "mac")?;
        let iv = self.cipherparams.iv()?;

        let derived_key = self.kdf.derive_key(password)?;
        let dk_bytes = expose(&derived_key);

        // Verify MAC before decrypting
        verify_mac(dk_bytes, &ciphertext, &expected_mac)?;

        decrypt_secret(&ciphertext, dk_bytes, &iv)
    }
}

fn str_field<'a>(block: &'a Map<String, Value>, name: &str) -> AccountResult<&'a str> {
    match block.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(AccountError::MalformedRecord(format!(
            "crypto.{} must be a string",
            name
        ))),
        None => Err(AccountError::MalformedRecord(format!(
            "crypto.{} is missing",
            name
        ))),
    }
}

fn object_field<'a>(block: &'a Map<String, Value>, name: &str) -> AccountResult<&'a Value> {
    match block.get(name) {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(AccountError::MalformedRecord(format!(
            "crypto.{} must be an object",
            name
        ))),
        None => Err(AccountError::MalformedRecord(format!(
            "crypto.{} is missing",
            name
        ))),
    }
}
