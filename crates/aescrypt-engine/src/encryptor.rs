//! The encrypting half of the engine.

use std::io::{Read, Write};

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use log::{debug, error, warn};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::envelope::{self, SessionSecrets};
use crate::error::EncryptError;
use crate::format::{
    BLOCK_SIZE, MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS, RECOMMENDED_KDF_ITERATIONS,
};
use crate::header;
use crate::ioutil::read_fill;
use crate::kdf;
use crate::lifecycle::{BeginError, Lifecycle};
use crate::progress::{ProgressFn, ProgressMeter};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Options for [`Encryptor::encrypt`].
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// PBKDF2 iteration count, bounded `[1, 5_000_000]`.
    pub iterations: u32,
    /// `(identifier, value)` pairs emitted as header extensions. Identifiers
    /// must not contain a NUL octet.
    pub extensions: Vec<(String, String)>,
    /// Octets of input between progress callbacks; `0` disables reporting.
    pub progress_interval: usize,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            iterations: RECOMMENDED_KDF_ITERATIONS,
            extensions: Vec::new(),
            progress_interval: 0,
        }
    }
}

/// Turns a plaintext octet stream into a version-3 AES Crypt stream.
///
/// One `Encryptor` runs one operation at a time; a second call while one is
/// active fails with [`EncryptError::AlreadyEncrypting`]. Controller threads
/// may share the object (`&self` methods) to [`cancel`](Self::cancel) an
/// in-flight operation or [`activate`](Self::activate) a cancelled one.
#[derive(Debug)]
pub struct Encryptor {
    instance: String,
    lifecycle: Lifecycle,
}

impl Encryptor {
    /// Creates an encryptor. The instance label distinguishes objects sharing
    /// a progress callback and appears in log output; it carries no other
    /// meaning.
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Encrypts `source` into `destination` under `password`.
    ///
    /// The password must be non-empty UTF-8. Progress callbacks (if enabled
    /// via `options.progress_interval`) receive the instance label and the
    /// total octets of plaintext consumed so far.
    pub fn encrypt<R, W>(
        &self,
        password: &str,
        source: &mut R,
        destination: &mut W,
        options: &EncryptOptions,
        progress: Option<&ProgressFn>,
    ) -> Result<(), EncryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        if !kdf::password_valid(password) {
            error!("rejecting invalid password");
            return Err(EncryptError::InvalidPassword);
        }
        if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&options.iterations) {
            error!("rejecting iterations value {}", options.iterations);
            return Err(EncryptError::InvalidIterations {
                iterations: options.iterations,
            });
        }
        header::validate_extensions(&options.extensions)?;

        let _guard = self.lifecycle.begin().map_err(|e| match e {
            BeginError::Cancelled => EncryptError::Cancelled,
            BeginError::AlreadyActive => EncryptError::AlreadyEncrypting,
        })?;

        debug!("[{}] encrypting plaintext stream", self.instance);
        let result = self.run(password, source, destination, options, progress);
        match &result {
            Ok(()) => debug!("[{}] finished encrypting", self.instance),
            Err(EncryptError::Cancelled) => warn!("[{}] encryption cancelled", self.instance),
            Err(e) => error!("[{}] encryption failed: {e}", self.instance),
        }
        result
    }

    /// Requests that an in-flight `encrypt` stop, then blocks until the
    /// operation thread has exited. The object stays in a cancelled state —
    /// refusing new operations — until [`activate`](Self::activate).
    pub fn cancel(&self) {
        self.lifecycle.cancel();
    }

    /// Clears the cancelled state. Returns `false` if an operation is still
    /// active.
    pub fn activate(&self) -> bool {
        self.lifecycle.activate()
    }

    fn run<R, W>(
        &self,
        password: &str,
        source: &mut R,
        destination: &mut W,
        options: &EncryptOptions,
        progress: Option<&ProgressFn>,
    ) -> Result<(), EncryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        header::write_header(destination, &options.extensions)?;

        let mut public_iv = Zeroizing::new([0u8; 16]);
        OsRng.fill_bytes(&mut public_iv[..]);
        let session = SessionSecrets::random();

        debug!("[{}] deriving envelope key", self.instance);
        let derived_key = kdf::derive_key_pbkdf2(password, &public_iv[..], options.iterations);
        envelope::write_session_data(
            destination,
            options.iterations,
            &public_iv,
            &derived_key,
            &session,
        )?;

        let mut meter = ProgressMeter::new(&self.instance, progress, options.progress_interval);
        self.encrypt_stream(source, destination, &session, &mut meter)
    }

    /// CBC-encrypts the payload with PKCS#7 padding and appends the payload
    /// HMAC. A read shorter than one block is the final block; input ending
    /// on a block boundary gets a full padding block so the modulo is always
    /// recoverable.
    fn encrypt_stream<R, W>(
        &self,
        source: &mut R,
        destination: &mut W,
        session: &SessionSecrets,
        meter: &mut ProgressMeter<'_>,
    ) -> Result<(), EncryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut mac =
            HmacSha256::new_from_slice(&session.key[..]).map_err(|_| EncryptError::Internal)?;
        let mut enc = Aes256CbcEnc::new_from_slices(&session.key[..], &session.iv[..])
            .map_err(|_| EncryptError::Internal)?;

        let mut block = Zeroizing::new([0u8; BLOCK_SIZE]);

        meter.checkpoint().map_err(|_| EncryptError::Internal)?;
        loop {
            let read = read_fill(source, &mut block[..])?;
            if read < BLOCK_SIZE {
                let padding = (BLOCK_SIZE - read) as u8;
                block[read..].fill(padding);
            }

            enc.encrypt_block_mut(GenericArray::from_mut_slice(&mut block[..]));
            mac.update(&block[..]);
            destination.write_all(&block[..])?;

            if self.lifecycle.is_cancelled() {
                return Err(EncryptError::Cancelled);
            }
            meter
                .consume(read as u64)
                .map_err(|_| EncryptError::Internal)?;

            if read < BLOCK_SIZE {
                break;
            }
        }

        destination.write_all(&mac.finalize().into_bytes())?;
        meter.checkpoint().map_err(|_| EncryptError::Internal)?;
        Ok(())
    }
}
