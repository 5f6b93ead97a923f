//! Password-protected account backed by a keystore record
//!
//! An [`Account`] is either locked (only the encrypted record is held) or
//! unlocked (the decrypted private key is resident). The two states are an
//! explicit enum, so a locked account cannot carry a secret.
//!
//! # Example
//!
//! ```rust,ignore
//! use eth_account::{Account, KdfConfig};
//!
//! let account = Account::new("password", &secret, None, Some(KdfConfig::pbkdf2(1)))?;
//! let json = account.dump(true, true)?;
//!
//! let mut loaded = Account::from_json(&json, None)?;
//! assert!(loaded.is_locked());
//! loaded.unlock("password")?;
//! assert_eq!(loaded.secret(), account.secret());
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::KdfConfig;
use crate::error::{AccountError, AccountResult};
use crate::keystore::CryptoSection;
use crate::record::{KeystoreRecord, ADDRESS_FIELD, CRYPTO_FIELD, ID_FIELD, VERSION_FIELD};
use crate::secp256k1::{PublicKey, SecretKey};
use crate::secure::{SecretKeyBytes, SECRET_KEY_LENGTH};

/// Lock state. The secret only exists in the `Unlocked` variant.
enum State {
    Locked,
    Unlocked {
        secret: SecretKeyBytes,
        public_key: PublicKey,
    },
}

/// An Ethereum account stored as an encrypted keystore record
pub struct Account {
    record: KeystoreRecord,
    state: State,
    /// Cached address; from the record or derived on unlock
    address: Option<Address>,
    /// Identifier given to `from_record`, not written to the record
    identifier_override: Option<String>,
    path: Option<PathBuf>,
}

impl Account {
    /// Create a new account by encrypting a raw private key
    ///
    /// # Arguments
    ///
    /// * `password` - Password the key is encrypted under
    /// * `secret` - 32-byte secp256k1 private key
    /// * `identifier` - Record `id`; a random UUIDv4 when `None` or empty
    /// * `kdf` - KDF parameters; [`KdfConfig::default`] when `None`
    ///
    /// The returned account is unlocked.
    pub fn new(
        password: &str,
        secret: &[u8],
        identifier: Option<&str>,
        kdf: Option<KdfConfig>,
    ) -> AccountResult<Self> {
        let secret_key = SecretKey::from_slice(secret)?;
        let public_key = secret_key.public_key();
        let address = public_key.address();

        let kdf = kdf.unwrap_or_default();
        let crypto = CryptoSection::encrypt(secret, password, &kdf)?;

        let id = identifier
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = KeystoreRecord::new(&crypto, address, Some(&id));

        info!(
            address = %format_address(&address),
            id = %id,
            kdf = kdf.name(),
            "Created keystore account"
        );

        Ok(Self {
            record,
            state: State::Unlocked {
                secret: secret_key.to_secret_bytes(),
                public_key,
            },
            address: Some(address),
            identifier_override: None,
            path: None,
        })
    }

    /// Wrap an existing keystore record without decrypting it
    ///
    /// `identifier`, if given, takes precedence over the record's `id` but is
    /// not written into the record. Missing `crypto`, `address` or `id` are
    /// tolerated; an `address` field that is not 20 bytes of hex is not.
    ///
    /// The returned account is locked.
    pub fn from_record(record: Value, identifier: Option<&str>) -> AccountResult<Self> {
        let record = KeystoreRecord::from_value(record)?;
        let address = record.address()?;

        debug!(
            address = ?address.as_ref().map(format_address),
            has_crypto = record.crypto_value().is_some(),
            "Loaded keystore record"
        );

        Ok(Self {
            record,
            state: State::Locked,
            address,
            identifier_override: identifier
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            path: None,
        })
    }

    /// Parse JSON text and wrap it with [`Account::from_record`]
    pub fn from_json(json: &str, identifier: Option<&str>) -> AccountResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AccountError::MalformedRecord(format!("invalid JSON: {}", e)))?;
        Self::from_record(value, identifier)
    }

    /// Load a keystore file, remembering its path
    ///
    /// The account is unlocked when a password is given.
    pub fn load<P: AsRef<Path>>(path: P, password: Option<&str>) -> AccountResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let mut account = Self::from_json(&contents, None)?;
        account.path = Some(path.to_path_buf());

        if let Some(password) = password {
            account.unlock(password)?;
        }

        Ok(account)
    }

    /// Decrypt the private key
    ///
    /// A no-op if the account is already unlocked. On any error the account
    /// is left exactly as it was, so retrying after `WrongPassword` is safe.
    pub fn unlock(&mut self, password: &str) -> AccountResult<()> {
        if !self.is_locked() {
            debug!(account = %self, "Unlock requested on unlocked account");
            return Ok(());
        }

        let crypto = self.record.crypto()?;
        let plaintext = match crypto.decrypt(password) {
            Ok(plaintext) => plaintext,
            Err(AccountError::WrongPassword) => {
                warn!(account = %self, "Unlock failed: wrong password");
                return Err(AccountError::WrongPassword);
            }
            Err(e) => return Err(e),
        };

        let secret_key = SecretKey::from_slice(plaintext.expose_secret()).map_err(|_| {
            AccountError::MalformedRecord(format!(
                "decrypted secret is not a valid {}-byte secp256k1 key",
                SECRET_KEY_LENGTH
            ))
        })?;
        let public_key = secret_key.public_key();
        let derived = public_key.address();

        if let Some(known) = self.address {
            if known != derived {
                return Err(AccountError::MalformedRecord(format!(
                    "address mismatch: record has {}, key derives {}",
                    format_address(&known),
                    format_address(&derived)
                )));
            }
        }

        // Cached on the account only; the record keeps whatever it had
        self.address = Some(derived);
        self.state = State::Unlocked {
            secret: secret_key.to_secret_bytes(),
            public_key,
        };

        info!(account = %self, "Account unlocked");
        Ok(())
    }

    /// Drop the decrypted private key. The address stays cached.
    pub fn lock(&mut self) {
        if let State::Unlocked { .. } = self.state {
            // Dropping SecretKeyBytes zeroizes it
            self.state = State::Locked;
            debug!(account = %self, "Account locked");
        }
    }

    /// Whether the private key is absent from memory
    pub fn is_locked(&self) -> bool {
        matches!(self.state, State::Locked)
    }

    /// The private key, if unlocked
    pub fn secret(&self) -> Option<&[u8; SECRET_KEY_LENGTH]> {
        match &self.state {
            State::Unlocked { secret, .. } => Some(secret.expose_secret()),
            State::Locked => None,
        }
    }

    /// The public key, if unlocked
    pub fn public_key(&self) -> Option<&PublicKey> {
        match &self.state {
            State::Unlocked { public_key, .. } => Some(public_key),
            State::Locked => None,
        }
    }

    /// The address, if stored in the record or derived by an unlock
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// The identifier: the `from_record` override, else the record's `id`
    pub fn identifier(&self) -> Option<&str> {
        self.identifier_override
            .as_deref()
            .or_else(|| self.record.id())
    }

    /// Set or clear the record's `id`
    ///
    /// `None` or an empty string removes the `id` key from the record
    /// entirely.
    pub fn set_identifier(&mut self, identifier: Option<&str>) {
        self.identifier_override = None;
        self.record.set_id(identifier);
    }

    /// The full record, including fields this crate does not interpret
    pub fn record(&self) -> &KeystoreRecord {
        &self.record
    }

    /// The record's `version`, if present and numeric
    pub fn version(&self) -> Option<u64> {
        self.record.version()
    }

    /// Where [`Account::dump_to_disk`] writes
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set or clear the persistence path
    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// The persisted form: `crypto` and `version`, plus `address` and `id`
    /// when requested and known
    ///
    /// Other record fields are not included. The address is the cached
    /// one, so an address derived by unlock is emitted even if the record
    /// itself lacks it.
    pub fn to_record(
        &self,
        include_address: bool,
        include_id: bool,
    ) -> AccountResult<Map<String, Value>> {
        let crypto = self.record.crypto_value().ok_or_else(|| {
            AccountError::MalformedRecord("record has no crypto block".to_string())
        })?;
        let version = self.record.version_value().ok_or_else(|| {
            AccountError::MalformedRecord("record has no version".to_string())
        })?;

        let mut out = Map::new();
        out.insert(CRYPTO_FIELD.to_string(), crypto.clone());
        out.insert(VERSION_FIELD.to_string(), version.clone());

        if include_address {
            if let Some(address) = &self.address {
                out.insert(
                    ADDRESS_FIELD.to_string(),
                    Value::String(hex::encode(address.as_slice())),
                );
            }
        }

        if include_id {
            if let Some(id) = self.identifier() {
                out.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            }
        }

        Ok(out)
    }

    /// Serialize [`Account::to_record`] to JSON text
    pub fn dump(&self, include_address: bool, include_id: bool) -> AccountResult<String> {
        let record = self.to_record(include_address, include_id)?;
        Ok(serde_json::to_string(&Value::Object(record))?)
    }

    /// Write the full form (address and id included when known) to `path`
    ///
    /// Creates parent directories and restricts the file to 0600 on unix.
    pub fn dump_to_disk(&self) -> AccountResult<()> {
        let path = self.path.as_deref().ok_or(AccountError::NoPathConfigured)?;

        let record = self.to_record(true, true)?;
        let json = serde_json::to_string_pretty(&Value::Object(record))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        info!(account = %self, path = %path.display(), "Wrote keystore to disk");
        Ok(())
    }
}

fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self
            .address
            .as_ref()
            .map(format_address)
            .unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "<Account(address={}, id={})>",
            address,
            self.identifier().unwrap_or("None")
        )
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address.as_ref().map(format_address))
            .field("id", &self.identifier())
            .field("locked", &self.is_locked())
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PASSWORD: &str = "password";

    fn new_account(secret: &[u8; 32]) -> Account {
        Account::new(PASSWORD, secret, Some("test-id"), Some(KdfConfig::pbkdf2(1))).unwrap()
    }

    fn locked_value(account: &Account) -> Value {
        Value::Object(account.to_record(true, true).unwrap())
    }

    #[test]
    fn test_new_is_unlocked() {
        let account = new_account(&[0x11; 32]);

        assert!(!account.is_locked());
        assert_eq!(account.secret(), Some(&[0x11; 32]));
        assert!(account.public_key().is_some());
        assert_eq!(account.identifier(), Some("test-id"));
        assert_eq!(account.version(), Some(3));
        assert_eq!(account.record().address().unwrap(), account.address());
    }

    #[test]
    fn test_new_generates_uuid() {
        let a = Account::new(PASSWORD, &[0x11; 32], None, Some(KdfConfig::pbkdf2(1))).unwrap();
        let b = Account::new(PASSWORD, &[0x11; 32], None, Some(KdfConfig::pbkdf2(1))).unwrap();

        let id = a.identifier().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_ne!(a.identifier(), b.identifier());
    }

    #[test]
    fn test_new_rejects_invalid_secret() {
        for secret in [&[0x11; 31][..], &[0x11; 33][..], &[0x00; 32][..], &[0xFF; 32][..]] {
            assert!(matches!(
                Account::new(PASSWORD, secret, None, Some(KdfConfig::pbkdf2(1))),
                Err(AccountError::InvalidSecret(_))
            ));
        }
    }

    #[test]
    fn test_new_rejects_invalid_kdf_config() {
        assert!(matches!(
            Account::new(PASSWORD, &[0x11; 32], None, Some(KdfConfig::scrypt(12345, 8, 1))),
            Err(AccountError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn test_from_record_requires_object() {
        assert!(matches!(
            Account::from_record(json!([1, 2, 3]), None),
            Err(AccountError::MalformedRecord(_))
        ));
        assert!(matches!(
            Account::from_json("nope", None),
            Err(AccountError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_empty_record() {
        let mut account = Account::from_record(json!({}), None).unwrap();

        assert!(account.is_locked());
        assert_eq!(account.address(), None);
        assert_eq!(account.identifier(), None);
        assert_eq!(account.to_string(), "<Account(address=?, id=None)>");

        // Unlock and dump fail later, not at construction
        assert!(matches!(
            account.unlock(PASSWORD),
            Err(AccountError::MalformedRecord(_))
        ));
        assert!(matches!(
            account.dump(true, true),
            Err(AccountError::MalformedRecord(_))
        ));
        assert!(account.is_locked());
    }

    #[test]
    fn test_identifier_override_is_not_persisted() {
        let account = new_account(&[0x22; 32]);
        let mut loaded = Account::from_record(locked_value(&account), Some("override")).unwrap();

        assert_eq!(loaded.identifier(), Some("override"));
        assert_eq!(loaded.record().id(), Some("test-id"));

        let dumped: Value = serde_json::from_str(&loaded.dump(false, true).unwrap()).unwrap();
        assert_eq!(dumped["id"], json!("override"));

        loaded.set_identifier(Some("explicit"));
        assert_eq!(loaded.identifier(), Some("explicit"));
        assert_eq!(loaded.record().id(), Some("explicit"));
    }

    #[test]
    fn test_unlock_lock_cycle() {
        let account = new_account(&[0x33; 32]);
        let mut loaded = Account::from_record(locked_value(&account), None).unwrap();

        assert!(loaded.is_locked());
        assert!(loaded.secret().is_none());
        assert!(loaded.public_key().is_none());

        loaded.unlock(PASSWORD).unwrap();
        assert_eq!(loaded.secret(), Some(&[0x33; 32]));
        assert_eq!(loaded.public_key(), account.public_key());

        loaded.lock();
        loaded.lock();
        assert!(loaded.is_locked());
        assert!(loaded.secret().is_none());
        assert_eq!(loaded.address(), account.address());
    }

    #[test]
    fn test_failed_unlock_leaves_record_untouched() {
        let account = new_account(&[0x44; 32]);
        let mut loaded = Account::from_record(locked_value(&account), None).unwrap();
        let before = loaded.record().clone();

        for _ in 0..3 {
            assert!(matches!(
                loaded.unlock("wrong"),
                Err(AccountError::WrongPassword)
            ));
            assert!(loaded.is_locked());
            assert_eq!(loaded.record(), &before);
        }

        loaded.unlock(PASSWORD).unwrap();
        assert!(!loaded.is_locked());
    }

    #[test]
    fn test_address_mismatch_is_malformed() {
        let account = new_account(&[0x55; 32]);
        let mut value = locked_value(&account);
        value["address"] = json!("0000000000000000000000000000000000000001");

        let mut loaded = Account::from_record(value, None).unwrap();
        assert!(matches!(
            loaded.unlock(PASSWORD),
            Err(AccountError::MalformedRecord(_))
        ));
        assert!(loaded.is_locked());
    }

    #[test]
    fn test_unsupported_cipher() {
        let account = new_account(&[0x66; 32]);
        let mut value = locked_value(&account);
        value["crypto"]["cipher"] = json!("aes-256-gcm");

        let mut loaded = Account::from_record(value, None).unwrap();
        let err = loaded.unlock(PASSWORD).unwrap_err();
        assert!(err.is_unsupported());
        assert!(loaded.is_locked());
    }

    #[test]
    fn test_unknown_fields_preserved_but_not_dumped() {
        let account = new_account(&[0x77; 32]);
        let mut value = locked_value(&account);
        value["meta"] = json!({"label": "cold"});

        let mut loaded = Account::from_record(value, None).unwrap();
        loaded.unlock(PASSWORD).unwrap();
        loaded.set_identifier(None);

        assert_eq!(loaded.record().fields()["meta"], json!({"label": "cold"}));
        let dumped = loaded.to_record(true, true).unwrap();
        assert!(!dumped.contains_key("meta"));
    }

    #[test]
    fn test_legacy_crypto_field() {
        let account = new_account(&[0x88; 32]);
        let mut map = account.to_record(true, true).unwrap();
        let crypto = map.shift_remove("crypto").unwrap();
        map.insert("Crypto".to_string(), crypto);

        let mut loaded = Account::from_record(Value::Object(map), None).unwrap();
        loaded.unlock(PASSWORD).unwrap();
        assert_eq!(loaded.secret(), Some(&[0x88; 32]));

        let dumped = loaded.to_record(false, false).unwrap();
        assert!(dumped.contains_key("crypto"));
    }

    #[test]
    fn test_dump_to_disk_requires_path() {
        let account = new_account(&[0x99; 32]);
        assert!(matches!(
            account.dump_to_disk(),
            Err(AccountError::NoPathConfigured)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let account = new_account(&[0xAB; 32]);
        let debug = format!("{:?}", account);

        assert!(debug.contains("locked: false"));
        assert!(!debug.contains("abababab"));
    }
}
