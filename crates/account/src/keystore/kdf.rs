//! Key Derivation Function (KDF) implementation
//!
//! Supports the two KDFs of the Web3 Secret Storage v3 format:
//! - `pbkdf2` with `prf = hmac-sha256`
//! - `scrypt`
//!
//! Parameters are always taken from the record when unlocking.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{KdfConfig, DERIVED_KEY_LENGTH, MAX_DERIVED_KEY_LENGTH};
use crate::error::{AccountError, AccountResult};
use crate::secure::{secret_bytes, SecretBytes};

use super::{decode_hex, encode_hex};

/// Salt length in bytes
pub const SALT_LENGTH: usize = 32;

/// The only PRF accepted for pbkdf2
pub const PBKDF2_PRF: &str = "hmac-sha256";

/// KDF name plus parameters, as stored under `crypto.kdf` / `crypto.kdfparams`
#[derive(Debug, Clone, PartialEq)]
pub enum Kdf {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2(Pbkdf2Params),
    /// scrypt
    Scrypt(ScryptParams),
}

/// `kdfparams` for pbkdf2
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pbkdf2Params {
    /// Iteration count
    pub c: u32,
    /// Derived key length in bytes
    pub dklen: u32,
    /// Pseudo-random function
    pub prf: String,
    /// Salt as hex string
    pub salt: String,
}

/// `kdfparams` for scrypt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScryptParams {
    /// Derived key length in bytes
    pub dklen: u32,
    /// CPU/memory cost parameter (must be power of 2)
    pub n: u32,
    /// Block size parameter
    pub r: u32,
    /// Parallelization parameter
    pub p: u32,
    /// Salt as hex string
    pub salt: String,
}

impl Kdf {
    /// Build the KDF for a new keystore from config and a fresh salt
    pub fn from_config(config: &KdfConfig, salt: &[u8]) -> Self {
        let salt = encode_hex(salt);
        match *config {
            KdfConfig::Pbkdf2 { iterations } => Kdf::Pbkdf2(Pbkdf2Params {
                c: iterations,
                dklen: DERIVED_KEY_LENGTH,
                prf: PBKDF2_PRF.to_string(),
                salt,
            }),
            KdfConfig::Scrypt { n, r, p } => Kdf::Scrypt(ScryptParams {
                dklen: DERIVED_KEY_LENGTH,
                n,
                r,
                p,
                salt,
            }),
        }
    }

    /// Parse from the record's `kdf` name and `kdfparams` object
    pub fn from_parts(name: &str, params: &serde_json::Value) -> AccountResult<Self> {
        let malformed = |e: serde_json::Error| {
            AccountError::MalformedRecord(format!("invalid kdfparams: {}", e))
        };
        match name {
            "pbkdf2" => {
                let params: Pbkdf2Params =
                    serde_json::from_value(params.clone()).map_err(malformed)?;
                if params.prf != PBKDF2_PRF {
                    return Err(AccountError::UnsupportedKdf(format!(
                        "pbkdf2 with prf {}",
                        params.prf
                    )));
                }
                Ok(Kdf::Pbkdf2(params))
            }
            "scrypt" => {
                let params: ScryptParams =
                    serde_json::from_value(params.clone()).map_err(malformed)?;
                Ok(Kdf::Scrypt(params))
            }
            other => Err(AccountError::UnsupportedKdf(other.to_string())),
        }
    }

    /// Record name of the KDF
    pub fn name(&self) -> &'static str {
        match self {
            Kdf::Pbkdf2(_) => "pbkdf2",
            Kdf::Scrypt(_) => "scrypt",
        }
    }

    /// `kdfparams` as a JSON value
    pub fn params_value(&self) -> serde_json::Value {
        // Both param structs only hold strings and integers
        match self {
            Kdf::Pbkdf2(params) => serde_json::to_value(params),
            Kdf::Scrypt(params) => serde_json::to_value(params),
        }
        .unwrap_or(serde_json::Value::Null)
    }

    fn dklen(&self) -> u32 {
        match self {
            Kdf::Pbkdf2(params) => params.dklen,
            Kdf::Scrypt(params) => params.dklen,
        }
    }

    /// Validate the parameters
    pub fn validate(&self) -> AccountResult<()> {
        // The MAC key is bytes 16..32 of the derived key
        let dklen = self.dklen();
        if !(DERIVED_KEY_LENGTH..=MAX_DERIVED_KEY_LENGTH).contains(&dklen) {
            return Err(AccountError::InvalidKdfParams(format!(
                "dklen must be between {} and {}, got {}",
                DERIVED_KEY_LENGTH, MAX_DERIVED_KEY_LENGTH, dklen
            )));
        }
        match self {
            Kdf::Pbkdf2(params) => {
                if params.c == 0 {
                    return Err(AccountError::InvalidKdfParams(
                        "c must be positive".to_string(),
                    ));
                }
            }
            Kdf::Scrypt(params) => {
                KdfConfig::scrypt(params.n, params.r, params.p).validate()?;
            }
        }
        Ok(())
    }

    /// Derive a key from the given password
    pub fn derive_key(&self, password: &str) -> AccountResult<SecretBytes> {
        self.validate()?;
        match self {
            Kdf::Pbkdf2(params) => {
                let salt = decode_hex(&params.salt, "kdfparams.salt")?;
                Ok(pbkdf2_derive_key(
                    password,
                    &salt,
                    params.c,
                    params.dklen as usize,
                ))
            }
            Kdf::Scrypt(params) => {
                let salt = decode_hex(&params.salt, "kdfparams.salt")?;
                scrypt_derive_key(
                    password,
                    &salt,
                    params.n,
                    params.r,
                    params.p,
                    params.dklen as usize,
                )
            }
        }
    }
}

/// Derive a key using PBKDF2-HMAC-SHA256
pub fn pbkdf2_derive_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
    dklen: usize,
) -> SecretBytes {
    let mut output = vec![0u8; dklen];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut output);
    secret_bytes(output)
}

/// Derive a key using scrypt
///
/// # Arguments
///
/// * `password` - User password
/// * `salt` - Salt bytes from the record
/// * `n` - CPU/memory cost parameter (must be power of 2)
/// * `r` - Block size parameter
/// * `p` - Parallelization parameter
/// * `dklen` - Desired key length in bytes
pub fn scrypt_derive_key(
    password: &str,
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    dklen: usize,
) -> AccountResult<SecretBytes> {
    // n is a validated power of two
    let log_n = n.trailing_zeros() as u8;

    let params = scrypt::Params::new(log_n, r, p, dklen)
        .map_err(|e| AccountError::InvalidKdfParams(e.to_string()))?;

    let mut output = vec![0u8; dklen];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut output)
        .map_err(|e| AccountError::InvalidKdfParams(e.to_string()))?;

    Ok(secret_bytes(output))
}

/// Generate a random salt
pub fn generate_salt() -> Vec<u8> {
    use rand::RngCore;
    let mut salt = vec![0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Borrow the derived key bytes
pub(crate) fn expose(key: &SecretBytes) -> &[u8] {
    key.expose_secret().as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pbkdf2_known_vector() {
        // RFC 7914 section 11 (PBKDF2-HMAC-SHA256, c = 1)
        let derived = pbkdf2_derive_key("passwd", b"salt", 1, 64);
        assert_eq!(
            hex::encode(expose(&derived)),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc\
             49ca9cccf179b645991664b39d77ef317c71b845b1e30bd509112041d3a19783"
        );
    }

    #[test]
    fn test_scrypt_derive_key() {
        let salt = vec![0xAA; 32];

        let derived = scrypt_derive_key("test-password", &salt, 16, 8, 1, 32).unwrap();
        assert_eq!(expose(&derived).len(), 32);

        // Deterministic
        let derived2 = scrypt_derive_key("test-password", &salt, 16, 8, 1, 32).unwrap();
        assert_eq!(expose(&derived), expose(&derived2));

        // Different password, different key
        let derived3 = scrypt_derive_key("different", &salt, 16, 8, 1, 32).unwrap();
        assert_ne!(expose(&derived), expose(&derived3));
    }

    #[test]
    fn test_from_parts_pbkdf2() {
        let params = json!({"c": 2, "dklen": 32, "prf": "hmac-sha256", "salt": "aa"});
        let kdf = Kdf::from_parts("pbkdf2", &params).unwrap();
        assert_eq!(kdf.name(), "pbkdf2");
        assert_eq!(kdf.params_value(), params);
    }

    #[test]
    fn test_from_parts_unsupported() {
        let params = json!({"c": 2, "dklen": 32, "prf": "hmac-sha256", "salt": "aa"});
        assert!(matches!(
            Kdf::from_parts("argon2id", &params),
            Err(AccountError::UnsupportedKdf(_))
        ));

        let params = json!({"c": 2, "dklen": 32, "prf": "hmac-sha512", "salt": "aa"});
        assert!(matches!(
            Kdf::from_parts("pbkdf2", &params),
            Err(AccountError::UnsupportedKdf(_))
        ));
    }

    #[test]
    fn test_from_parts_missing_field() {
        let params = json!({"dklen": 32, "n": 16, "r": 8, "salt": "aa"});
        assert!(matches!(
            Kdf::from_parts("scrypt", &params),
            Err(AccountError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_validation() {
        let kdf = Kdf::from_config(&KdfConfig::scrypt(16, 8, 1), &[0xAA; 32]);
        assert!(kdf.validate().is_ok());

        let kdf = Kdf::Scrypt(ScryptParams {
            dklen: 32,
            n: 12345,
            r: 8,
            p: 1,
            salt: "aa".to_string(),
        });
        assert!(kdf.validate().is_err());

        let kdf = Kdf::Pbkdf2(Pbkdf2Params {
            c: 1,
            dklen: 16,
            prf: PBKDF2_PRF.to_string(),
            salt: "aa".to_string(),
        });
        assert!(matches!(
            kdf.derive_key("pw"),
            Err(AccountError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn test_hostile_cost_params_rejected() {
        let params = json!({"dklen": 32, "n": 1u64 << 31, "r": 8, "p": 1, "salt": "aa"});
        let kdf = Kdf::from_parts("scrypt", &params).unwrap();
        assert!(matches!(
            kdf.derive_key("pw"),
            Err(AccountError::InvalidKdfParams(_))
        ));

        let params = json!({"c": 1, "dklen": u32::MAX, "prf": "hmac-sha256", "salt": "aa"});
        let kdf = Kdf::from_parts("pbkdf2", &params).unwrap();
        assert!(matches!(
            kdf.derive_key("pw"),
            Err(AccountError::InvalidKdfParams(_))
        ));

        let params = json!({"dklen": 4096, "n": 16, "r": 8, "p": 1, "salt": "aa"});
        let kdf = Kdf::from_parts("scrypt", &params).unwrap();
        assert!(kdf.validate().is_err());
    }

    #[test]
    fn test_bad_salt_hex() {
        let kdf = Kdf::Pbkdf2(Pbkdf2Params {
            c: 1,
            dklen: 32,
            prf: PBKDF2_PRF.to_string(),
            salt: "zz".to_string(),
        });
        assert!(matches!(
            kdf.derive_key("pw"),
            Err(AccountError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_generate_salt() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();

        assert_eq!(salt1.len(), SALT_LENGTH);
        // Salts should be different (extremely high probability)
        assert_ne!(salt1, salt2);
    }
}
