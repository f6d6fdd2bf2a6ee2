//! Stream header codec: magic, version, reserved octet, the extension TLV
//! list, and the iterations field.

use std::io::{self, Read, Write};

use crate::error::{DecryptError, EncryptError};
use crate::format::{LATEST_STREAM_VERSION, MAGIC, MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS};
use crate::ioutil::read_structure;

/// Largest value the extension's 16-bit length field can carry:
/// `identifier ‖ 0x00 ‖ value` must fit.
const MAX_EXTENSION_LEN: usize = u16::MAX as usize;

/// Checks every extension pair before anything is written, so a bad
/// extension never leaves a partial header behind.
pub(crate) fn validate_extensions(extensions: &[(String, String)]) -> Result<(), EncryptError> {
    for (identifier, value) in extensions {
        if identifier.as_bytes().contains(&0x00) {
            return Err(EncryptError::InvalidExtension);
        }
        if identifier.len() > MAX_EXTENSION_LEN || value.len() > MAX_EXTENSION_LEN {
            return Err(EncryptError::InvalidExtension);
        }
        if identifier.len() + 1 + value.len() > MAX_EXTENSION_LEN {
            return Err(EncryptError::InvalidExtension);
        }
    }
    Ok(())
}

/// Writes the five fixed header octets followed by the extension list and its
/// zero-length terminator. Extensions must already have been validated.
pub(crate) fn write_header<W: Write + ?Sized>(
    destination: &mut W,
    extensions: &[(String, String)],
) -> Result<(), EncryptError> {
    destination.write_all(&MAGIC)?;
    destination.write_all(&[LATEST_STREAM_VERSION, 0x00])?;

    for (identifier, value) in extensions {
        let length = identifier.len() + 1 + value.len();
        destination.write_all(&(length as u16).to_be_bytes())?;
        destination.write_all(identifier.as_bytes())?;
        destination.write_all(&[0x00])?;
        destination.write_all(value.as_bytes())?;
    }
    destination.write_all(&[0x00, 0x00])?;
    Ok(())
}

/// Reads the magic and version octets. Versions beyond the latest are
/// rejected rather than guessed at.
pub(crate) fn read_version<R: Read + ?Sized>(source: &mut R) -> Result<u8, DecryptError> {
    let mut header = [0u8; 4];
    read_structure(source, &mut header, "stream header")?;
    if header[..3] != MAGIC {
        return Err(DecryptError::InvalidStream {
            context: "bad magic",
        });
    }
    let version = header[3];
    if version > LATEST_STREAM_VERSION {
        return Err(DecryptError::UnsupportedVersion { version });
    }
    Ok(version)
}

/// Skips the extension list without parsing the blobs. Returns the octets
/// consumed. End-of-stream inside the list means a malformed stream.
pub(crate) fn skip_extensions<R: Read + ?Sized>(source: &mut R) -> Result<u64, DecryptError> {
    let mut consumed = 0u64;
    loop {
        let mut length = [0u8; 2];
        read_structure(source, &mut length, "extension length")?;
        consumed += 2;

        let length = u64::from(u16::from_be_bytes(length));
        if length == 0 {
            return Ok(consumed);
        }

        let skipped = io::copy(&mut (&mut *source).take(length), &mut io::sink())?;
        consumed += skipped;
        if skipped < length {
            return Err(DecryptError::InvalidStream {
                context: "extension body",
            });
        }
    }
}

/// Reads the 4-octet big-endian iterations field (version >= 3) and bounds it.
pub(crate) fn read_iterations<R: Read + ?Sized>(source: &mut R) -> Result<u32, DecryptError> {
    let mut field = [0u8; 4];
    read_structure(source, &mut field, "iterations field")?;
    let iterations = u32::from_be_bytes(field);
    if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&iterations) {
        return Err(DecryptError::InvalidIterations { iterations });
    }
    Ok(iterations)
}
