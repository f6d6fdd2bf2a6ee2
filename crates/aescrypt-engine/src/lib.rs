//! Streaming encryption engine for the AES Crypt container format.
//!
//! The engine turns an octet stream into a password-protected, HMAC-authenticated
//! AES Crypt stream and back. Output always uses stream format version 3; input
//! streams may use any version from 0 through 3.
//!
//! # Stream layout (version 3)
//!
//! | Offset | Size | Description |
//! |--------|------|-------------|
//! | 0      | 3    | Magic `"AES"` |
//! | 3      | 1    | Stream version (`0x03`) |
//! | 4      | 1    | Reserved (`0x00`) |
//! | 5      | n    | Extension list, terminated by a zero-length extension |
//! | 5+n    | 4    | PBKDF2 iteration count (big-endian) |
//! | 9+n    | 16   | Public IV (KDF salt and envelope CBC IV) |
//! | 25+n   | 48   | Encrypted session envelope (`session IV ‖ session key`) |
//! | 73+n   | 32   | HMAC-SHA256 over the envelope (keyed with the derived key) |
//! | 105+n  | 16k  | Payload ciphertext, AES-256-CBC under the session key |
//! | ...    | 32   | HMAC-SHA256 over the payload ciphertext (keyed with the session key) |
//!
//! The payload is PKCS#7 padded, so the ciphertext is always a positive multiple
//! of sixteen octets. Older stream versions differ in the trailer: versions 1 and
//! 2 carry a lone "modulo" octet ahead of the payload HMAC, and version 0 has no
//! session envelope at all (the password-derived key encrypts the payload
//! directly, with the final-block length carried in the header's reserved octet).
//!
//! Both [`Encryptor`] and [`Decryptor`] process one 16-octet block at a time, so
//! they handle streams of unknown and unbounded length in constant memory. A
//! concurrent controller thread may call [`Encryptor::cancel`] /
//! [`Decryptor::cancel`] to stop an in-flight operation at block granularity.
//! All key material, password expansions, and plaintext staging buffers are
//! zeroized on every exit path.

mod decryptor;
mod encryptor;
mod envelope;
mod error;
mod header;
mod ioutil;
mod lifecycle;
mod progress;
mod ring;

pub mod format;
pub mod kdf;

pub use decryptor::Decryptor;
pub use encryptor::{EncryptOptions, Encryptor};
pub use error::{DecryptError, EncryptError};
pub use progress::ProgressFn;
