//! Keccak-256 MAC for keystore integrity verification
//!
//! The MAC is computed over: derived_key[16..32] || ciphertext.
//! A match proves both that the password derived the right key and that the
//! ciphertext was not altered.

use alloy_primitives::keccak256;
use subtle::ConstantTimeEq;

use crate::error::{AccountError, AccountResult};

/// MAC length in bytes
pub const MAC_LENGTH: usize = 32;

/// Compute keccak256(derived_key[16..32] || ciphertext)
pub fn compute_mac(derived_key: &[u8], ciphertext: &[u8]) -> AccountResult<[u8; MAC_LENGTH]> {
    if derived_key.len() < 32 {
        return Err(AccountError::InvalidKdfParams(format!(
            "derived key must be at least 32 bytes, got {}",
            derived_key.len()
        )));
    }

    let mut preimage = Vec::with_capacity(16 + ciphertext.len());
    preimage.extend_from_slice(&derived_key[16..32]);
    preimage.extend_from_slice(ciphertext);

    Ok(keccak256(&preimage).0)
}

/// Verify the stored MAC against the derived key and ciphertext
///
/// Returns `Err(WrongPassword)` on mismatch.
pub fn verify_mac(derived_key: &[u8], ciphertext: &[u8], expected: &[u8]) -> AccountResult<()> {
    let computed = compute_mac(derived_key, ciphertext)?;

    if constant_time_eq(&computed, expected) {
        Ok(())
    } else {
        Err(AccountError::WrongPassword)
    }
}

/// Constant-time comparison. Lengths are public; contents are not.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
