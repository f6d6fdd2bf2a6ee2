#![allow(dead_code)]

//! Builders for legacy (version 0-2) AES Crypt streams. The engine only ever
//! writes version 3, so the decode paths for older versions are exercised
//! against streams assembled here, byte by byte, per the published layout.

use aes::Aes256;
use cipher::block_padding::NoPadding;
use cipher::{BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use aescrypt_engine::kdf;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Deterministic key material for fixture streams (not intended to be secure).
pub struct LegacyParams {
    pub public_iv: [u8; 16],
    pub session_iv: [u8; 16],
    pub session_key: [u8; 32],
}

impl Default for LegacyParams {
    fn default() -> Self {
        Self {
            public_iv: *b"\x10\x11\x12\x13\x14\x15\x16\x17\x18\x19\x1A\x1B\x1C\x1D\x1E\x1F",
            session_iv: *b"\xA0\xA1\xA2\xA3\xA4\xA5\xA6\xA7\xA8\xA9\xAA\xAB\xAC\xAD\xAE\xAF",
            session_key: [0x5C; 32],
        }
    }
}

fn aes_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], buf: &mut [u8]) {
    assert_eq!(buf.len() % 16, 0, "AES-CBC requires full blocks");
    let enc = Aes256CbcEnc::new_from_slices(key, iv).expect("key/iv");
    let len = buf.len();
    enc.encrypt_padded_mut::<NoPadding>(buf, len).expect("encrypt");
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Pads to the next block boundary with zeros; legacy streams carry the real
/// length in the modulo octet instead of PKCS#7.
fn pad_zero(plaintext: &[u8]) -> Vec<u8> {
    let mut out = plaintext.to_vec();
    out.resize(plaintext.len().div_ceil(16) * 16, 0);
    out
}

/// Builds a version-0 stream: no extensions, no session envelope, the modulo
/// in the header's reserved octet, and the payload encrypted directly under
/// the password-derived key.
pub fn encrypt_v0(password: &str, plaintext: &[u8], params: &LegacyParams) -> Vec<u8> {
    let derived = kdf::derive_key_legacy(password, &params.public_iv);

    let mut out = vec![b'A', b'E', b'S', 0x00, (plaintext.len() % 16) as u8];
    out.extend_from_slice(&params.public_iv);

    let mut payload = pad_zero(plaintext);
    aes_cbc_encrypt(&derived, &params.public_iv, &mut payload);
    let tag = hmac_sha256(&derived[..], &payload);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&tag);
    out
}

/// Builds a version-1 or version-2 stream: session envelope (HMAC'd without
/// the version octet), zero-padded payload, and a `modulo ‖ HMAC` trailer.
/// Extensions are only legal for version 2.
pub fn encrypt_legacy(
    version: u8,
    password: &str,
    plaintext: &[u8],
    params: &LegacyParams,
    extensions: &[(&str, &str)],
    modulo_override: Option<u8>,
) -> Vec<u8> {
    assert!(version == 1 || version == 2, "legacy envelope versions only");
    assert!(extensions.is_empty() || version == 2, "extensions need version 2");

    let derived = kdf::derive_key_legacy(password, &params.public_iv);

    let mut out = vec![b'A', b'E', b'S', version, 0x00];
    if version == 2 {
        for (identifier, value) in extensions {
            let length = identifier.len() + 1 + value.len();
            out.extend_from_slice(&(length as u16).to_be_bytes());
            out.extend_from_slice(identifier.as_bytes());
            out.push(0x00);
            out.extend_from_slice(value.as_bytes());
        }
        out.extend_from_slice(&[0x00, 0x00]);
    }
    out.extend_from_slice(&params.public_iv);

    let mut envelope = [0u8; 48];
    envelope[..16].copy_from_slice(&params.session_iv);
    envelope[16..].copy_from_slice(&params.session_key);
    aes_cbc_encrypt(&derived, &params.public_iv, &mut envelope);
    out.extend_from_slice(&envelope);
    out.extend_from_slice(&hmac_sha256(&derived[..], &envelope));

    let mut payload = pad_zero(plaintext);
    aes_cbc_encrypt(&params.session_key, &params.session_iv, &mut payload);
    let tag = hmac_sha256(&params.session_key, &payload);
    out.extend_from_slice(&payload);
    out.push(modulo_override.unwrap_or((plaintext.len() % 16) as u8));
    out.extend_from_slice(&tag);
    out
}
