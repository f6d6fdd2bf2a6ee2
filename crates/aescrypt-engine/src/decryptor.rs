//! The decrypting half of the engine.

use std::io::{Read, Write};

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use log::{debug, error, warn};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::envelope::{self, SessionSecrets};
use crate::error::DecryptError;
use crate::format::{trailer_len, BLOCK_SIZE, ENVELOPE_SIZE, HMAC_SIZE};
use crate::header;
use crate::ioutil::read_structure;
use crate::kdf;
use crate::lifecycle::{BeginError, Lifecycle};
use crate::progress::{ProgressFn, ProgressMeter};
use crate::ring::{TrailerRing, INITIAL_FILL};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Turns an AES Crypt stream (any version 0 through 3) back into plaintext.
///
/// One `Decryptor` runs one operation at a time; a second call while one is
/// active fails with [`DecryptError::AlreadyDecrypting`]. Controller threads
/// may share the object (`&self` methods) to [`cancel`](Self::cancel) an
/// in-flight operation or [`activate`](Self::activate) a cancelled one.
#[derive(Debug)]
pub struct Decryptor {
    instance: String,
    lifecycle: Lifecycle,
}

impl Decryptor {
    /// Creates a decryptor. The instance label distinguishes objects sharing
    /// a progress callback and appears in log output.
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Decrypts the AES Crypt stream in `source` into `destination` under
    /// `password`.
    ///
    /// A tampered stream and a wrong password both surface as
    /// [`DecryptError::AlteredMessage`]; the two causes are deliberately not
    /// distinguishable, and the HMAC comparison is constant-time. No part of
    /// the final plaintext block is written before the payload HMAC has been
    /// verified.
    pub fn decrypt<R, W>(
        &self,
        password: &str,
        source: &mut R,
        destination: &mut W,
        progress: Option<&ProgressFn>,
        progress_interval: usize,
    ) -> Result<(), DecryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        if !kdf::password_valid(password) {
            error!("rejecting invalid password");
            return Err(DecryptError::InvalidPassword);
        }

        let _guard = self.lifecycle.begin().map_err(|e| match e {
            BeginError::Cancelled => DecryptError::Cancelled,
            BeginError::AlreadyActive => DecryptError::AlreadyDecrypting,
        })?;

        debug!("[{}] decrypting AES Crypt stream", self.instance);
        let mut meter = ProgressMeter::new(&self.instance, progress, progress_interval);
        let result = self.run(password, source, destination, &mut meter);
        match &result {
            Ok(()) => debug!("[{}] finished decrypting", self.instance),
            Err(DecryptError::Cancelled) => warn!("[{}] decryption cancelled", self.instance),
            Err(e) => error!("[{}] decryption failed: {e}", self.instance),
        }
        result
    }

    /// Requests that an in-flight `decrypt` stop, then blocks until the
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
        meter: &mut ProgressMeter<'_>,
    ) -> Result<(), DecryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let version = header::read_version(source)?;
        debug!("[{}] stream format version {version}", self.instance);

        // The reserved octet carries the final-block modulo in version 0 and
        // is ignored otherwise.
        let mut reserved = [0u8; 1];
        read_structure(source, &mut reserved, "reserved octet")?;
        meter.consume(5).map_err(|_| DecryptError::Internal)?;

        // Extensions first appear in format version 2.
        if version >= 2 {
            let skipped = header::skip_extensions(source)?;
            meter.consume(skipped).map_err(|_| DecryptError::Internal)?;
        }

        let kdf_iterations = if version >= 3 {
            let iterations = header::read_iterations(source)?;
            meter.consume(4).map_err(|_| DecryptError::Internal)?;
            iterations
        } else {
            0
        };

        let mut public_iv = Zeroizing::new([0u8; 16]);
        read_structure(source, &mut public_iv[..], "public IV")?;
        meter.consume(16).map_err(|_| DecryptError::Internal)?;

        debug!("[{}] deriving decryption key", self.instance);
        let derived_key = if version <= 2 {
            kdf::derive_key_legacy(password, &public_iv)
        } else {
            kdf::derive_key_pbkdf2(password, &public_iv[..], kdf_iterations)
        };

        // Version 0 has no envelope: the derived key and public IV are used
        // on the payload directly.
        let session = if version == 0 {
            SessionSecrets {
                iv: public_iv.clone(),
                key: derived_key,
            }
        } else {
            let session =
                envelope::read_session_data(source, version, &public_iv, &derived_key)?;
            meter
                .consume((ENVELOPE_SIZE + HMAC_SIZE) as u64)
                .map_err(|_| DecryptError::Internal)?;
            session
        };

        self.decrypt_stream(source, destination, version, reserved[0], &session, meter)
    }

    /// Streams the payload through AES-256-CBC decryption while separating
    /// the trailer via the lookahead ring, then verifies the payload HMAC
    /// and flushes the withheld final block.
    fn decrypt_stream<R, W>(
        &self,
        source: &mut R,
        destination: &mut W,
        version: u8,
        reserved: u8,
        session: &SessionSecrets,
        meter: &mut ProgressMeter<'_>,
    ) -> Result<(), DecryptError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut mac =
            HmacSha256::new_from_slice(&session.key[..]).map_err(|_| DecryptError::Internal)?;
        let mut dec = Aes256CbcDec::new_from_slices(&session.key[..], &session.iv[..])
            .map_err(|_| DecryptError::Internal)?;

        let mut ring = TrailerRing::new();
        let filled = ring.fill_initial(source)?;
        meter
            .consume(filled as u64)
            .map_err(|_| DecryptError::Internal)?;
        meter.checkpoint().map_err(|_| DecryptError::Internal)?;

        // The most recently decrypted block is held back one iteration: it is
        // only written out once the next read proves it was not the start of
        // the trailer, and the very last block only after the HMAC verifies.
        let mut plaintext = Zeroizing::new([0u8; BLOCK_SIZE]);
        let mut withheld = false;
        let mut eof = filled < INITIAL_FILL;

        while !eof {
            if withheld {
                destination.write_all(&plaintext[..])?;
            }

            mac.update(ring.block());
            dec.decrypt_block_b2b_mut(
                GenericArray::from_slice(ring.block()),
                GenericArray::from_mut_slice(&mut plaintext[..]),
            );
            withheld = true;

            if self.lifecycle.is_cancelled() {
                return Err(DecryptError::Cancelled);
            }

            ring.advance_block();
            let read = ring.read_next(source)?;
            meter
                .consume(read as u64)
                .map_err(|_| DecryptError::Internal)?;
            if read < BLOCK_SIZE {
                eof = true;
            }
        }

        // Whatever is left between the block cursor and the head must be
        // exactly the trailer for this stream version.
        if ring.pending() != trailer_len(version) {
            return Err(DecryptError::InvalidStream {
                context: "trailer length",
            });
        }
        let mut trailer = [0u8; HMAC_SIZE + 1];
        ring.copy_pending(&mut trailer[..ring.pending()]);

        let expected_hmac = if trailer_len(version) == HMAC_SIZE + 1 {
            &trailer[1..=HMAC_SIZE]
        } else {
            &trailer[..HMAC_SIZE]
        };
        mac.verify_slice(expected_hmac)
            .map_err(|_| DecryptError::AlteredMessage)?;

        self.emit_final_block(destination, version, reserved, &trailer, withheld, &plaintext)?;
        meter.checkpoint().map_err(|_| DecryptError::Internal)?;
        Ok(())
    }

    /// Applies the per-version modulo rules to the withheld final block. A
    /// modulo of zero means the block is all padding; values 16 and up never
    /// occur in a well-formed stream.
    fn emit_final_block<W>(
        &self,
        destination: &mut W,
        version: u8,
        reserved: u8,
        trailer: &[u8],
        withheld: bool,
        plaintext: &[u8; BLOCK_SIZE],
    ) -> Result<(), DecryptError>
    where
        W: Write + ?Sized,
    {
        let modulo = if version >= 3 {
            if !withheld {
                // A version-3 payload always carries at least the padding
                // block, so an empty payload is a forgery or a logic error.
                return Err(DecryptError::InvalidStream {
                    context: "missing final block",
                });
            }
            let padding = plaintext[BLOCK_SIZE - 1];
            if padding == 0 || padding as usize > BLOCK_SIZE {
                return Err(DecryptError::InvalidStream {
                    context: "final block padding",
                });
            }
            (BLOCK_SIZE - padding as usize) as u8
        } else if !withheld {
            // Legacy stream with an empty payload: nothing to emit.
            return Ok(());
        } else if version == 0 {
            reserved
        } else {
            trailer[0]
        };

        match usize::from(modulo) {
            0 => Ok(()), // the whole block is padding
            n if n < BLOCK_SIZE => {
                destination.write_all(&plaintext[..n])?;
                Ok(())
            }
            _ => Err(DecryptError::InvalidStream {
                context: "final block modulo",
            }),
        }
    }
}
