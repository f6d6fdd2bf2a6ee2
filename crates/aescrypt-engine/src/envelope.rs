//! Session envelope construction and recovery.
//!
//! Stream versions 1 and later never encrypt the payload under the
//! password-derived key. Instead a random session IV and key are drawn, and
//! the 48-octet pair `session IV ‖ session key` is AES-256-CBC encrypted
//! under the derived key with the public IV as the chaining start. An
//! HMAC-SHA256 keyed with the derived key covers the envelope ciphertext
//! (plus the version octet from format version 3 on), so a wrong password is
//! caught here before any payload block is touched.

use std::io::{Read, Write};

use aes::Aes256;
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{DecryptError, EncryptError};
use crate::format::{ENVELOPE_SIZE, HMAC_SIZE, KEY_SIZE, LATEST_STREAM_VERSION};
use crate::ioutil::read_structure;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// The random key and IV actually used to encrypt the payload.
#[derive(Debug)]
pub(crate) struct SessionSecrets {
    pub(crate) iv: Zeroizing<[u8; 16]>,
    pub(crate) key: Zeroizing<[u8; KEY_SIZE]>,
}

impl SessionSecrets {
    pub(crate) fn random() -> Self {
        let mut iv = Zeroizing::new([0u8; 16]);
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(&mut iv[..]);
        OsRng.fill_bytes(&mut key[..]);
        Self { iv, key }
    }
}

/// Writes the iterations field, public IV, encrypted session envelope, and
/// envelope HMAC (version-3 layout).
pub(crate) fn write_session_data<W: Write + ?Sized>(
    destination: &mut W,
    kdf_iterations: u32,
    public_iv: &[u8; 16],
    derived_key: &[u8; KEY_SIZE],
    session: &SessionSecrets,
) -> Result<(), EncryptError> {
    destination.write_all(&kdf_iterations.to_be_bytes())?;
    destination.write_all(public_iv)?;

    let mut envelope = Zeroizing::new([0u8; ENVELOPE_SIZE]);
    envelope[..16].copy_from_slice(&session.iv[..]);
    envelope[16..].copy_from_slice(&session.key[..]);

    let enc = Aes256CbcEnc::new_from_slices(derived_key, public_iv)
        .map_err(|_| EncryptError::Internal)?;
    enc.encrypt_padded_mut::<NoPadding>(&mut envelope[..], ENVELOPE_SIZE)
        .map_err(|_| EncryptError::Internal)?;

    let mut mac =
        HmacSha256::new_from_slice(derived_key).map_err(|_| EncryptError::Internal)?;
    mac.update(&envelope[..]);
    mac.update(&[LATEST_STREAM_VERSION]);

    destination.write_all(&envelope[..])?;
    destination.write_all(&mac.finalize().into_bytes())?;
    Ok(())
}

/// Reads and verifies the encrypted session envelope, returning the session
/// secrets. The version octet joins the HMAC input only from format
/// version 3 on. An HMAC mismatch — wrong password or tampered header —
/// surfaces as `AlteredMessage`.
pub(crate) fn read_session_data<R: Read + ?Sized>(
    source: &mut R,
    version: u8,
    public_iv: &[u8; 16],
    derived_key: &[u8; KEY_SIZE],
) -> Result<SessionSecrets, DecryptError> {
    let mut envelope = Zeroizing::new([0u8; ENVELOPE_SIZE]);
    read_structure(source, &mut envelope[..], "session envelope")?;

    let mut mac =
        HmacSha256::new_from_slice(derived_key).map_err(|_| DecryptError::Internal)?;
    mac.update(&envelope[..]);
    if version >= 3 {
        mac.update(&[version]);
    }

    let dec = Aes256CbcDec::new_from_slices(derived_key, public_iv)
        .map_err(|_| DecryptError::Internal)?;
    dec.decrypt_padded_mut::<NoPadding>(&mut envelope[..])
        .map_err(|_| DecryptError::Internal)?;

    let mut expected = [0u8; HMAC_SIZE];
    read_structure(source, &mut expected, "envelope HMAC")?;
    mac.verify_slice(&expected)
        .map_err(|_| DecryptError::AlteredMessage)?;

    let mut session = SessionSecrets {
        iv: Zeroizing::new([0u8; 16]),
        key: Zeroizing::new([0u8; KEY_SIZE]),
    };
    session.iv.copy_from_slice(&envelope[..16]);
    session.key.copy_from_slice(&envelope[16..]);
    Ok(session)
}
