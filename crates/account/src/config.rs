//! Key derivation configuration for newly created keystores
//!
//! Unlocking never consults this type: the parameters used to unlock are
//! always read back from the record itself. `KdfConfig` only decides how a
//! fresh keystore is encrypted by [`Account::new`](crate::Account::new).
//!
//! The type is deserializable so a host application can embed it in its own
//! config file:
//!
//! ```toml
//! [keystore]
//! kdf = "scrypt"
//! n = 262144
//! r = 1
//! p = 8
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AccountError, AccountResult};

/// Default PBKDF2 iteration count for new keystores.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 262_144;

/// Default scrypt CPU/memory cost (2^18).
pub const DEFAULT_SCRYPT_N: u32 = 262_144;

/// Default scrypt block size.
pub const DEFAULT_SCRYPT_R: u32 = 1;

/// Default scrypt parallelization.
pub const DEFAULT_SCRYPT_P: u32 = 8;

/// Derived key length in bytes. The first half keys the cipher, the second
/// half keys the MAC.
pub const DERIVED_KEY_LENGTH: u32 = 32;

/// Largest derived key length accepted from a record.
pub const MAX_DERIVED_KEY_LENGTH: u32 = 1024;

/// Ceiling on scrypt working memory (`128 * r * n` and `128 * r * p`), 1 GiB.
pub const MAX_SCRYPT_MEMORY: u64 = 1 << 30;

/// KDF choice and cost parameters for new keystores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kdf", rename_all = "lowercase")]
pub enum KdfConfig {
    /// PBKDF2 with HMAC-SHA256
    Pbkdf2 {
        /// Iteration count (`c` in the record)
        #[serde(default = "default_iterations")]
        iterations: u32,
    },
    /// scrypt
    Scrypt {
        /// CPU/memory cost, must be a power of two
        #[serde(default = "default_scrypt_n")]
        n: u32,
        /// Block size
        #[serde(default = "default_scrypt_r")]
        r: u32,
        /// Parallelization
        #[serde(default = "default_scrypt_p")]
        p: u32,
    },
}

fn default_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

fn default_scrypt_n() -> u32 {
    DEFAULT_SCRYPT_N
}

fn default_scrypt_r() -> u32 {
    DEFAULT_SCRYPT_R
}

fn default_scrypt_p() -> u32 {
    DEFAULT_SCRYPT_P
}

impl Default for KdfConfig {
    fn default() -> Self {
        KdfConfig::Pbkdf2 {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfConfig {
    /// PBKDF2-HMAC-SHA256 with the given iteration count
    pub fn pbkdf2(iterations: u32) -> Self {
        KdfConfig::Pbkdf2 { iterations }
    }

    /// scrypt with explicit cost parameters
    pub fn scrypt(n: u32, r: u32, p: u32) -> Self {
        KdfConfig::Scrypt { n, r, p }
    }

    /// Record name of the KDF
    pub fn name(&self) -> &'static str {
        match self {
            KdfConfig::Pbkdf2 { .. } => "pbkdf2",
            KdfConfig::Scrypt { .. } => "scrypt",
        }
    }

    /// Validate the cost parameters
    pub fn validate(&self) -> AccountResult<()> {
        match *self {
            KdfConfig::Pbkdf2 { iterations } => {
                if iterations == 0 {
                    return Err(AccountError::InvalidKdfParams(
                        "iterations must be positive".to_string(),
                    ));
                }
            }
            KdfConfig::Scrypt { n, r, p } => {
                // n must be a power of 2 greater than 1
                if n < 2 || !n.is_power_of_two() {
                    return Err(AccountError::InvalidKdfParams(
                        "n must be a power of 2 greater than 1".to_string(),
                    ));
                }
                if r == 0 {
                    return Err(AccountError::InvalidKdfParams(
                        "r must be positive".to_string(),
                    ));
                }
                if p == 0 {
                    return Err(AccountError::InvalidKdfParams(
                        "p must be positive".to_string(),
                    ));
                }
                let block = 128 * u64::from(r);
                if block.saturating_mul(u64::from(n)) > MAX_SCRYPT_MEMORY
                    || block.saturating_mul(u64::from(p)) > MAX_SCRYPT_MEMORY
                {
                    return Err(AccountError::InvalidKdfParams(format!(
                        "scrypt n={} r={} p={} exceeds the {} byte memory limit",
                        n, r, p, MAX_SCRYPT_MEMORY
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pbkdf2() {
        let config = KdfConfig::default();
        assert_eq!(config.name(), "pbkdf2");
        assert_eq!(
            config,
            KdfConfig::Pbkdf2 {
                iterations: DEFAULT_PBKDF2_ITERATIONS
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(KdfConfig::pbkdf2(1).validate().is_ok());
        assert!(KdfConfig::pbkdf2(0).validate().is_err());

        assert!(KdfConfig::scrypt(16, 8, 1).validate().is_ok());
        assert!(KdfConfig::scrypt(12345, 8, 1).validate().is_err());
        assert!(KdfConfig::scrypt(1, 8, 1).validate().is_err());
        assert!(KdfConfig::scrypt(16, 0, 1).validate().is_err());
        assert!(KdfConfig::scrypt(16, 8, 0).validate().is_err());
    }

    #[test]
    fn test_scrypt_memory_ceiling() {
        // Common geth parameters fit
        assert!(KdfConfig::scrypt(262_144, 8, 1).validate().is_ok());
        assert!(KdfConfig::scrypt(DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_R, DEFAULT_SCRYPT_P)
            .validate()
            .is_ok());

        assert!(matches!(
            KdfConfig::scrypt(1 << 31, 8, 1).validate(),
            Err(AccountError::InvalidKdfParams(_))
        ));
        assert!(matches!(
            KdfConfig::scrypt(16, u32::MAX, 1).validate(),
            Err(AccountError::InvalidKdfParams(_))
        ));
        assert!(matches!(
            KdfConfig::scrypt(16, 8, u32::MAX).validate(),
            Err(AccountError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: KdfConfig = serde_json::from_str(r#"{"kdf": "scrypt", "n": 1024}"#).unwrap();
        assert_eq!(
            config,
            KdfConfig::Scrypt {
                n: 1024,
                r: DEFAULT_SCRYPT_R,
                p: DEFAULT_SCRYPT_P
            }
        );

        let config: KdfConfig = serde_json::from_str(r#"{"kdf": "pbkdf2"}"#).unwrap();
        assert_eq!(config, KdfConfig::default());
    }
}
