// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The packet buffer shared between a network interface driver and the
//! TCP/IP engine.
//!
//! A [`PacketBuf`] holds exactly one packet at a time -- inbound or
//! outbound -- and is reused for every packet the interface handles, for the
//! lifetime of the interface. The driver places a received frame at the
//! front and records its length; the engine overwrites the same region with
//! any reply. `len() == 0` is the universal "nothing to send, nothing to
//! process" state.
//!
//! The application-data and send-data views (`app`/`snd`) are *offsets*
//! into the backing array, never independent pointers. They are only
//! meaningful for the packet currently in the buffer, and [`PacketBuf::clear`]
//! invalidates them; reading an invalidated view panics rather than handing
//! out stale bytes. The contract checks panic on misuse because nothing at
//! this boundary returns error codes.
//!
//! Exclusive ownership is enforced by the type: every mutating entry takes
//! `&mut self`, so two events can't race on one buffer without the borrow
//! checker noticing.

#![cfg_attr(not(test), no_std)]

/// Backing size for a buffer with a `link_len`-byte link-level header
/// reserve and an `mtu`-byte maximum transport unit. Two guard bytes are
/// included so that word-at-a-time checksum code can read the final odd
/// byte's partner without running off the end.
pub const fn bufsize(link_len: usize, mtu: usize) -> usize {
    link_len + mtu + 2
}

/// A fixed-capacity single-packet buffer. `N` is the full backing size,
/// normally computed with [`bufsize`].
#[derive(Debug)]
pub struct PacketBuf<const N: usize> {
    data: [u8; N],
    /// Bytes reserved at the front for the link-level header (14 for
    /// Ethernet, 0 for point-to-point links). Fixed for the lifetime of the
    /// buffer.
    link_len: usize,
    /// Length of the packet currently held; 0 means none.
    len: usize,
    /// Offset where transport-layer payload begins, set by the engine
    /// before it hands the packet to higher layers.
    app: Option<usize>,
    /// Offset where an application may append outgoing payload, plus how
    /// much it has appended.
    snd: Option<usize>,
    snd_len: usize,
}

impl<const N: usize> PacketBuf<N> {
    /// Creates an empty buffer with the given link-header reserve.
    ///
    /// # Panics
    ///
    /// Panics (at compile time, in const contexts) if the reserve doesn't
    /// leave room for any packet data.
    pub const fn new(link_len: usize) -> Self {
        assert!(link_len < N);
        Self {
            data: [0; N],
            link_len,
            len: 0,
            app: None,
            snd: None,
            snd_len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn link_len(&self) -> usize {
        self.link_len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records that the buffer now holds a `len`-byte packet. Called by the
    /// driver after writing a received frame, and by the engine after
    /// building a reply in place.
    ///
    /// # Panics
    ///
    /// Panics if `len > N`.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= N);
        self.len = len;
    }

    /// Empties the buffer and invalidates the `app`/`snd` views.
    pub fn clear(&mut self) {
        self.len = 0;
        self.app = None;
        self.snd = None;
        self.snd_len = 0;
    }

    /// The packet currently held, `[0..len)`.
    pub fn packet(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole backing array, for the driver to write a received frame
    /// into (followed by [`PacketBuf::set_len`]).
    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The IP packet region of the current packet: everything past the
    /// link-level header.
    pub fn ip(&self) -> &[u8] {
        &self.data[self.link_len.min(self.len)..self.len]
    }

    pub fn ip_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.link_len.min(self.len)..self.len]
    }

    /// Marks where transport payload begins in the current packet.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the backing array.
    pub fn set_app(&mut self, offset: usize) {
        assert!(offset <= N);
        self.app = Some(offset);
    }

    /// Offset of the transport payload, if one has been marked for the
    /// current packet.
    pub fn app_offset(&self) -> Option<usize> {
        self.app
    }

    /// Transport payload of the current packet, `[app..len)`.
    ///
    /// # Panics
    ///
    /// Panics if no app offset has been set since the buffer was last
    /// cleared -- the view would be dangling.
    pub fn app_data(&self) -> &[u8] {
        let app = self.app.expect("app view read while invalidated");
        &self.data[app.min(self.len)..self.len]
    }

    pub fn app_data_mut(&mut self) -> &mut [u8] {
        let app = self.app.expect("app view read while invalidated");
        &mut self.data[app.min(self.len)..self.len]
    }

    /// Marks where an application may append outgoing payload. Resets the
    /// appended count.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the backing array.
    pub fn set_snd(&mut self, offset: usize) {
        assert!(offset <= N);
        self.snd = Some(offset);
        self.snd_len = 0;
    }

    /// Room available for appending outgoing payload, `[snd..N)`.
    ///
    /// # Panics
    ///
    /// Panics if no send offset has been set since the last clear.
    pub fn snd_room_mut(&mut self) -> &mut [u8] {
        let snd = self.snd.expect("snd view read while invalidated");
        &mut self.data[snd..]
    }

    /// Records that `len` bytes of application payload now follow the send
    /// offset.
    ///
    /// # Panics
    ///
    /// Panics if no send offset is set, or the payload would overrun the
    /// backing array.
    pub fn set_snd_len(&mut self, len: usize) {
        let snd = self.snd.expect("snd view read while invalidated");
        assert!(snd + len <= N);
        self.snd_len = len;
    }

    pub fn snd_len(&self) -> usize {
        self.snd_len
    }

    /// Appended application payload, `[snd..snd + snd_len)`.
    pub fn snd_data(&self) -> &[u8] {
        let snd = self.snd.expect("snd view read while invalidated");
        &self.data[snd..snd + self.snd_len]
    }

    /// The outgoing packet as the two regions the driver transmits
    /// back-to-back: link + protocol headers from the front of the buffer,
    /// then transport payload from the app offset.
    ///
    /// When no app offset is set, or the packet ends before it, the whole
    /// packet is in the first region and the second is empty. Transmitting
    /// `first` then `second` always sends exactly `packet()`.
    pub fn tx_regions(&self) -> (&[u8], &[u8]) {
        match self.app {
            Some(app) if app < self.len => {
                (&self.data[..app], &self.data[app..self.len])
            }
            _ => (&self.data[..self.len], &[]),
        }
    }
}
