//! Password-protected Ethereum accounts
//!
//! This crate provides:
//! - `Account`: a keystore-backed account that is either locked (encrypted
//!   record only) or unlocked (private key resident in memory)
//! - Web3 Secret Storage v3 encryption (pbkdf2/scrypt, AES-128-CTR,
//!   Keccak-256 MAC)
//! - secp256k1 key validation and Ethereum address derivation
//! - Zeroizing containers for key material

pub mod account;
pub mod config;
pub mod error;
pub mod keystore;
pub mod record;
pub mod secp256k1;
pub mod secure;

// Account exports
pub use account::Account;

// Configuration exports
pub use config::{KdfConfig, DEFAULT_PBKDF2_ITERATIONS};

// Error exports
pub use error::{AccountError, AccountResult};

// Record exports
pub use record::{KeystoreRecord, KEYSTORE_VERSION};

// Key exports
pub use secp256k1::{address_from_secret, PublicKey, SecretKey};
pub use secure::{SecretBytes, SecretKeyBytes};

// Address type used throughout the public API
pub use alloy_primitives::Address;
