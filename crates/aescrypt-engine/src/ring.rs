//! Lookahead ring for trailer separation on decrypt.
//!
//! The payload ciphertext ends with a 32- or 33-octet trailer, and the total
//! stream length is not known in advance. The decryptor therefore reads
//! through a fixed 64-octet ring: a block is only decrypted once enough
//! octets have been read past it to prove it cannot be part of the trailer,
//! and whatever remains between the block cursor and the fill head at
//! end-of-stream *is* the trailer.

use std::io::{self, Read};

use zeroize::Zeroizing;

use crate::format::BLOCK_SIZE;
use crate::ioutil::read_fill;

const RING_SIZE: usize = 64;

/// Initial fill depth: one block of lookahead beyond the largest trailer.
pub(crate) const INITIAL_FILL: usize = RING_SIZE - BLOCK_SIZE;

pub(crate) struct TrailerRing {
    buf: Zeroizing<[u8; RING_SIZE]>,
    /// Offset of the next unprocessed block. Always 16-aligned.
    block: usize,
    /// Offset where the next read lands. 16-aligned until the final short
    /// read, after which no further reads occur.
    head: usize,
    /// Octets between `block` and `head`.
    pending: usize,
}

impl TrailerRing {
    pub(crate) fn new() -> Self {
        Self {
            buf: Zeroizing::new([0u8; RING_SIZE]),
            block: 0,
            head: 0,
            pending: 0,
        }
    }

    /// Performs the initial 48-octet fill. Returns the octets read; fewer
    /// than 48 means the stream ended inside the fill.
    pub(crate) fn fill_initial<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        debug_assert_eq!(self.pending, 0);
        let n = read_fill(source, &mut self.buf[..INITIAL_FILL])?;
        self.head = n % RING_SIZE;
        self.pending = n;
        Ok(n)
    }

    /// Reads the next 16 octets at the head. Returns the octets read; fewer
    /// than 16 means the stream ended.
    pub(crate) fn read_next<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        debug_assert_eq!(self.head % BLOCK_SIZE, 0);
        let start = self.head;
        let n = read_fill(source, &mut self.buf[start..start + BLOCK_SIZE])?;
        self.head = (start + n) % RING_SIZE;
        self.pending += n;
        Ok(n)
    }

    /// The unprocessed block at the block cursor. Only meaningful while the
    /// caller knows at least one full block is pending.
    pub(crate) fn block(&self) -> &[u8] {
        &self.buf[self.block..self.block + BLOCK_SIZE]
    }

    /// Marks the block at the cursor as consumed.
    pub(crate) fn advance_block(&mut self) {
        debug_assert!(self.pending >= BLOCK_SIZE);
        self.block = (self.block + BLOCK_SIZE) % RING_SIZE;
        self.pending -= BLOCK_SIZE;
    }

    /// Octets between the block cursor and the head; at end-of-stream this is
    /// the trailer length.
    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    /// Copies the pending octets (the trailer) into `out`, unwrapping the
    /// ring as needed. `out` must be exactly `pending()` octets.
    pub(crate) fn copy_pending(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.pending);
        for (i, octet) in out.iter_mut().enumerate() {
            *octet = self.buf[(self.block + i) % RING_SIZE];
        }
    }
}
