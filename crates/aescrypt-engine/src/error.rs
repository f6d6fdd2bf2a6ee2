use thiserror::Error;

/// Errors surfaced by [`crate::Encryptor::encrypt`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncryptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An extension identifier contains a NUL octet, or an identifier/value
    /// pair does not fit the 16-bit length field.
    #[error("invalid extension")]
    InvalidExtension,

    /// The password is empty or too long to convert safely.
    #[error("invalid password provided")]
    InvalidPassword,

    /// The requested PBKDF2 iteration count is outside the permitted range.
    #[error("invalid iterations value: {iterations}")]
    InvalidIterations { iterations: u32 },

    /// Another thread is already encrypting with this object.
    #[error("another thread is already encrypting")]
    AlreadyEncrypting,

    /// The operation was cancelled, or the object is latched cancelled and
    /// [`crate::Encryptor::activate`] has not been called.
    #[error("encryption operation was cancelled")]
    Cancelled,

    /// A cryptographic primitive failed or an internal invariant broke.
    #[error("internal error")]
    Internal,
}

/// Errors surfaced by [`crate::Decryptor::decrypt`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecryptError {
    /// The input is not a well-formed AES Crypt stream.
    #[error("invalid AES Crypt stream ({context})")]
    InvalidStream { context: &'static str },

    /// The stream advertises a format version newer than this engine knows.
    #[error("unsupported AES Crypt stream version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The password is empty or too long to convert safely.
    #[error("invalid password provided")]
    InvalidPassword,

    /// The iteration count recorded in the stream is outside the permitted range.
    #[error("invalid iterations value: {iterations}")]
    InvalidIterations { iterations: u32 },

    /// An HMAC check failed. Covers both a tampered stream and a wrong
    /// password; the two are deliberately indistinguishable.
    #[error("message has been altered or password is incorrect")]
    AlteredMessage,

    /// Another thread is already decrypting with this object.
    #[error("another thread is already decrypting")]
    AlreadyDecrypting,

    /// The operation was cancelled, or the object is latched cancelled and
    /// [`crate::Decryptor::activate`] has not been called.
    #[error("decryption operation was cancelled")]
    Cancelled,

    /// A cryptographic primitive failed or an internal invariant broke.
    #[error("internal error")]
    Internal,
}
