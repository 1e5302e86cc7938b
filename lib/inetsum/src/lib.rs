// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RFC 1071 Internet checksum arithmetic.
//!
//! Transport checksums frequently have to cover data that is *logically*
//! contiguous but *physically* split -- a pseudo-header that exists only as
//! loose fields, a transport header sitting in a packet buffer, and payload
//! living at a different offset. Rather than making callers copy everything
//! into one slice, this crate centers on [`Summer`], a streaming accumulator
//! you feed regions one at a time. The result is byte-identical to summing
//! the concatenation.
//!
//! The one-shot [`checksum`] function and the 32-bit network-order
//! [`add32`] helper (used by TCP sequence/window arithmetic) round out the
//! set. Everything here is pure arithmetic: no allocation, no I/O, suitable
//! for interrupt-context use.

#![cfg_attr(not(test), no_std)]

/// Streaming one's-complement sum.
///
/// Feed it byte regions with [`Summer::add_bytes`] (and loose 16-bit fields
/// with [`Summer::add_word`]) in logical-stream order; the running sum is
/// identical no matter where the region boundaries fall, including
/// boundaries that split a 16-bit word. Call [`Summer::finish`] for the
/// complemented checksum, or [`Summer::fold`] for the raw folded sum.
#[derive(Clone, Debug, Default)]
pub struct Summer {
    /// Running sum. Carries are folded lazily in `fold`, so this can hold
    /// quite a lot of input before overflowing; `add_bytes` folds eagerly
    /// enough that it never does.
    acc: u32,
    /// A dangling high-order byte from a region that ended mid-word. It
    /// pairs with the first byte of the next region.
    pending: Option<u8>,
}

impl Summer {
    pub const fn new() -> Self {
        Self {
            acc: 0,
            pending: None,
        }
    }

    /// Appends `bytes` to the logical stream being summed.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        let mut bytes = bytes;

        // Complete a word left dangling by a previous odd-length region.
        if let Some(hi) = self.pending.take() {
            match bytes.split_first() {
                Some((&lo, rest)) => {
                    self.acc += u32::from(u16::from_be_bytes([hi, lo]));
                    bytes = rest;
                }
                None => {
                    // Empty region; the byte stays dangling.
                    self.pending = Some(hi);
                    return;
                }
            }
        }

        let mut chunks = bytes.chunks_exact(2);
        for pair in &mut chunks {
            self.acc += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
            // Keep the accumulator well clear of overflow. This triggers at
            // most once every ~64KiB of input.
            if self.acc >= 0xFFFF_0000 {
                self.acc = (self.acc & 0xFFFF) + (self.acc >> 16);
            }
        }
        if let [odd] = *chunks.remainder() {
            self.pending = Some(odd);
        }
    }

    /// Adds a single 16-bit value (host order) as if its big-endian bytes
    /// were appended to the stream. Useful for pseudo-header fields.
    ///
    /// Must not be called while a dangling odd byte is outstanding; in
    /// practice pseudo-header fields are summed first, before any byte
    /// regions, so this doesn't come up.
    pub fn add_word(&mut self, word: u16) {
        debug_assert!(self.pending.is_none());
        self.acc += u32::from(word);
    }

    /// Folds carries and returns the 16-bit one's-complement sum of
    /// everything added so far. A trailing odd byte is treated as the high
    /// byte of a zero-padded word.
    pub fn fold(&self) -> u16 {
        let mut sum = self.acc;
        if let Some(hi) = self.pending {
            sum += u32::from(u16::from_be_bytes([hi, 0]));
        }
        while sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
        sum as u16
    }

    /// Returns the Internet checksum: the complement of [`Summer::fold`].
    pub fn finish(&self) -> u16 {
        !self.fold()
    }
}

/// Computes the RFC 1071 Internet checksum of `data` in one shot: the one's
/// complement of the one's-complement sum of its big-endian 16-bit words,
/// with an odd trailing byte zero-padded on the right.
///
/// An all-zero buffer sums to 0, so its checksum is `0xFFFF`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut s = Summer::new();
    s.add_bytes(data);
    s.finish()
}

/// Adds a host-order 16-bit value into a 32-bit accumulator kept in network
/// byte order, wrapping on overflow of the 32-bit result.
///
/// TCP sequence and window arithmetic keeps these values in wire order to
/// avoid repeated byte swapping on big- and little-endian hosts alike; this
/// does the addition without the caller ever converting.
pub fn add32(acc: [u8; 4], addend: u16) -> [u8; 4] {
    u32::from_be_bytes(acc)
        .wrapping_add(u32::from(addend))
        .to_be_bytes()
}
