//! Keystore record: the persisted JSON object
//!
//! The record is an insertion-ordered map so unknown fields survive a
//! load/modify cycle untouched. Reserved fields get named accessors.

use alloy_primitives::Address;
use serde_json::{Map, Value};

use crate::error::{AccountError, AccountResult};
use crate::keystore::{decode_hex, CryptoSection};

/// Web3 Secret Storage version written by this crate
pub const KEYSTORE_VERSION: u64 = 3;

/// Field holding the encrypted secret and its parameters
pub const CRYPTO_FIELD: &str = "crypto";

/// Legacy capitalised spelling accepted on read
pub const LEGACY_CRYPTO_FIELD: &str = "Crypto";

/// Field holding the schema version
pub const VERSION_FIELD: &str = "version";

/// Field holding the hex address
pub const ADDRESS_FIELD: &str = "address";

/// Field holding the identifier
pub const ID_FIELD: &str = "id";

const ADDRESS_LENGTH: usize = 20;

/// A keystore record with ordered, pass-through fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeystoreRecord {
    fields: Map<String, Value>,
}

impl KeystoreRecord {
    /// Wrap a JSON value. Fails unless the value is an object.
    pub fn from_value(value: Value) -> AccountResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(AccountError::MalformedRecord(format!(
                "record must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> AccountResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AccountError::MalformedRecord(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Build a fresh v3 record
    pub fn new(crypto: &CryptoSection, address: Address, id: Option<&str>) -> Self {
        let mut fields = Map::new();
        fields.insert(CRYPTO_FIELD.to_string(), crypto.to_value());
        fields.insert(VERSION_FIELD.to_string(), Value::from(KEYSTORE_VERSION));
        fields.insert(
            ADDRESS_FIELD.to_string(),
            Value::String(hex::encode(address.as_slice())),
        );
        let mut record = Self { fields };
        record.set_id(id);
        record
    }

    /// All fields, including ones this crate does not interpret
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw `crypto` block (or legacy `Crypto`), if present
    pub fn crypto_value(&self) -> Option<&Value> {
        self.fields
            .get(CRYPTO_FIELD)
            .or_else(|| self.fields.get(LEGACY_CRYPTO_FIELD))
    }

    /// Parsed `crypto` block
    ///
    /// Only version 3 records are decrypted with v3 semantics; any other or
    /// missing `version` is `MalformedRecord`.
    pub fn crypto(&self) -> AccountResult<CryptoSection> {
        let value = self.crypto_value().ok_or_else(|| {
            AccountError::MalformedRecord("record has no crypto block".to_string())
        })?;
        match self.version_value() {
            Some(version) if version.as_u64() == Some(KEYSTORE_VERSION) => {}
            Some(version) => {
                return Err(AccountError::MalformedRecord(format!(
                    "unsupported keystore version {}",
                    version
                )))
            }
            None => {
                return Err(AccountError::MalformedRecord(
                    "record has no version".to_string(),
                ))
            }
        }
        CryptoSection::from_value(value)
    }

    /// Raw `version` value, if present
    pub fn version_value(&self) -> Option<&Value> {
        self.fields.get(VERSION_FIELD)
    }

    /// `version` as an integer, if present and numeric
    pub fn version(&self) -> Option<u64> {
        self.version_value().and_then(Value::as_u64)
    }

    /// Stored address.
    ///
    /// `Ok(None)` when the field is absent or null; `MalformedRecord` when it
    /// is present but not 20 bytes of hex.
    pub fn address(&self) -> AccountResult<Option<Address>> {
        match self.fields.get(ADDRESS_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let bytes = decode_hex(s, ADDRESS_FIELD)?;
                if bytes.len() != ADDRESS_LENGTH {
                    return Err(AccountError::MalformedRecord(format!(
                        "address must be {} bytes, got {}",
                        ADDRESS_LENGTH,
                        bytes.len()
                    )));
                }
                Ok(Some(Address::from_slice(&bytes)))
            }
            Some(other) => Err(AccountError::MalformedRecord(format!(
                "address must be a string, got {}",
                json_type(other)
            ))),
        }
    }

    /// Stored identifier; non-string values are ignored
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Set or remove the identifier.
    ///
    /// `None` or an empty string removes the key; it is never stored as null
    /// or empty.
    pub fn set_id(&mut self, id: Option<&str>) {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.fields
                    .insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            }
            None => {
                self.fields.shift_remove(ID_FIELD);
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
