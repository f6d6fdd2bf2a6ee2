//! Password-to-key derivation.
//!
//! Stream format version 3 derives the envelope key with
//! PBKDF2-HMAC-SHA512 over the UTF-8 password, salted with the public IV.
//! Versions 0 through 2 use the fixed AES Crypt schedule: the 32-octet state
//! starts as `public IV ‖ 0x00 × 16` and is replaced by
//! `SHA-256(state ‖ password)` for 8192 rounds, with the password encoded as
//! UTF-16LE.

use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

use crate::format::KEY_SIZE;

/// Iteration count fixed by the legacy (version 0-2) key derivation schedule.
pub const LEGACY_KDF_ROUNDS: usize = 8192;

/// Checks the password constraints shared by encrypt and decrypt: at least
/// one octet, and short enough that the UTF-16LE expansion cannot overflow.
pub(crate) fn password_valid(password: &str) -> bool {
    !password.is_empty() && password.len() <= usize::MAX / 2
}

/// Derives a 256-bit key with PBKDF2-HMAC-SHA512 (stream version >= 3).
pub fn derive_key_pbkdf2(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations, &mut key[..]);
    key
}

/// Derives a 256-bit key with the legacy AES Crypt schedule (stream
/// versions 0 through 2).
pub fn derive_key_legacy(password: &str, iv: &[u8; 16]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut encoded = Zeroizing::new(Vec::with_capacity(password.len() * 2));
    for unit in password.encode_utf16() {
        encoded.extend_from_slice(&unit.to_le_bytes());
    }

    let mut state = Zeroizing::new([0u8; KEY_SIZE]);
    state[..16].copy_from_slice(iv);
    for _ in 0..LEGACY_KDF_ROUNDS {
        let mut sha = Sha256::new();
        sha.update(&state[..]);
        sha.update(&encoded[..]);
        state.copy_from_slice(&sha.finalize());
    }
    state
}
