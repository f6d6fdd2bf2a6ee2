use std::io::{self, ErrorKind, Read};

use crate::error::DecryptError;

/// Reads from `source` until `buf` is full or the stream ends, retrying
/// interrupted reads. Returns the number of octets placed in `buf`; anything
/// short of `buf.len()` means end-of-stream.
pub(crate) fn read_fill<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads exactly `buf.len()` octets of stream structure. Hitting end-of-stream
/// inside a structural field means the stream is malformed rather than an I/O
/// failure, so it maps to `InvalidStream` with the caller's context.
pub(crate) fn read_structure<R: Read + ?Sized>(
    source: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<(), DecryptError> {
    let n = read_fill(source, buf)?;
    if n < buf.len() {
        return Err(DecryptError::InvalidStream { context });
    }
    Ok(())
}
