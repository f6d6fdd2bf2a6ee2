//! Fixed constants of the AES Crypt stream format.

/// The three magic octets opening every AES Crypt stream.
pub const MAGIC: [u8; 3] = *b"AES";

/// The latest stream format version; all new output uses this version.
pub const LATEST_STREAM_VERSION: u8 = 3;

/// AES block size in octets.
pub const BLOCK_SIZE: usize = 16;

/// Session/derived key size in octets (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the encrypted session envelope (`session IV ‖ session key`).
pub const ENVELOPE_SIZE: usize = 48;

/// Output size of HMAC-SHA256, used for both the envelope and payload MACs.
pub const HMAC_SIZE: usize = 32;

/// Lower bound on the PBKDF2 iteration count, enforced on read and write.
pub const MIN_KDF_ITERATIONS: u32 = 1;

/// Upper bound on the PBKDF2 iteration count, enforced on read and write so a
/// hostile stream cannot stall the process for an arbitrarily long time.
pub const MAX_KDF_ITERATIONS: u32 = 5_000_000;

/// Recommended PBKDF2 iteration count for typical passwords.
pub const RECOMMENDED_KDF_ITERATIONS: u32 = 300_000;

/// Octets trailing the payload ciphertext: versions 1 and 2 carry a modulo
/// octet ahead of the 32-octet payload HMAC, the other versions do not.
pub(crate) fn trailer_len(version: u8) -> usize {
    match version {
        1 | 2 => HMAC_SIZE + 1,
        _ => HMAC_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailer_len_by_version() {
        assert_eq!(trailer_len(0), 32);
        assert_eq!(trailer_len(1), 33);
        assert_eq!(trailer_len(2), 33);
        assert_eq!(trailer_len(3), 32);
    }
}
