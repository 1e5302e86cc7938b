// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packet exchange between a network interface driver and a TCP/IP engine.
//!
//! This crate owns the *contract* at that boundary, not the protocols: one
//! shared [`PacketBuf`] per interface, a handful of driver-facing entry
//! points ([`Coordinator`]), and the checksum seam ([`csum::ChecksumOps`]).
//! The protocol engine itself lives behind the [`ProtocolEngine`] trait and
//! is somebody else's crate.
//!
//! # The contract
//!
//! Each entry point is an atomic transformation: "input packet present or
//! timer fired" in, "output packet present or absent" out. `buf.len() > 0`
//! on return means the driver must transmit immediately, reading the two
//! transmit regions from [`PacketBuf::tx_regions`]. `len() == 0` means
//! nothing to send. No entry point blocks, allocates, or runs unbounded;
//! all are fit for interrupt-synchronized contexts.
//!
//! Receive and timer events must never run concurrently against one buffer.
//! That discipline is compile-time here: every entry point takes the buffer
//! by `&mut`, so the driver physically cannot overlap two events without
//! its own unsafe code.
//!
//! # Driving an interface
//!
//! ```
//! use netmux::{Coordinator, Event, ProtocolEngine};
//! use pktbuf::PacketBuf;
//!
//! struct NullEngine;
//! impl<const N: usize> ProtocolEngine<N> for NullEngine {
//!     fn process(&mut self, _buf: &mut PacketBuf<N>, _event: Event) {}
//! }
//!
//! const SIZE: usize = pktbuf::bufsize(14, 1500);
//! let mut buf = PacketBuf::<SIZE>::new(14);
//! let mut coord = Coordinator::new(NullEngine);
//!
//! // Receive path: driver writes the frame, then hands it in.
//! let frame = [0u8; 60];
//! buf.frame_mut()[..frame.len()].copy_from_slice(&frame);
//! buf.set_len(frame.len());
//! if coord.process_inbound(&mut buf) {
//!     let (_hdrs, _payload) = buf.tx_regions();
//!     // driver transmits hdrs, then payload
//! }
//!
//! // Timer path: give every connection a chance to make progress,
//! // open or closed -- closed connections still need their cleanup
//! // timers run.
//! for conn in 0..8 {
//!     if coord.periodic_poll(&mut buf, conn) {
//!         // driver transmits as above
//!     }
//! }
//! ```
//!
//! Drivers for links that need ARP run their ARP processing *around* these
//! calls, exactly as they would around the raw engine: decode inbound ARP
//! frames before `process_inbound`, and fix up the link header of any
//! outbound packet (the `len > 0` case) before transmitting. ARP, like the
//! rest of the protocol work, is a collaborator of this crate, not part of
//! it.

#![cfg_attr(not(test), no_std)]

pub mod csum;
pub mod wire;

use pktbuf::PacketBuf;

/// Why the engine is being invoked. One opcode per driver-facing entry
/// point; the engine sees the tag alongside the shared buffer rather than
/// five separate entry points.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// A received frame is in the buffer (`len > 0`); process it.
    Inbound,
    /// The periodic TCP timer fired for connection `conn`.
    Timer { conn: usize },
    /// Connection `conn` should be polled for pending work now.
    PollRequest { conn: usize },
    /// The periodic UDP timer fired for connection `conn`.
    UdpTimer { conn: usize },
    /// An outgoing UDP datagram should be constructed for connection
    /// `conn`.
    UdpSend { conn: usize },
}

/// The protocol engine behind the coordinator.
///
/// `process` reads the inbound packet (for [`Event::Inbound`]) from the
/// buffer and writes any outbound packet back into the same buffer,
/// setting its length before returning. Leaving `len == 0` means "nothing
/// to send" -- including for malformed input, which engines drop rather
/// than report.
pub trait ProtocolEngine<const N: usize> {
    fn process(&mut self, buf: &mut PacketBuf<N>, event: Event);
}

/// Event and packet counts, for the surrounding driver's diagnostics.
/// Saturating: a counter pegged at `u32::MAX` beats a panic in a path that
/// must not fail.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    /// Inbound frames dispatched to the engine.
    pub rx_frames: u32,
    /// `process_inbound` calls with an empty buffer -- caller contract
    /// violations, tolerated as no-ops.
    pub rx_empty: u32,
    /// Entry points that returned with an outbound packet ready.
    pub tx_frames: u32,
    /// TCP periodic timer polls.
    pub timer_polls: u32,
    /// On-demand connection polls.
    pub poll_requests: u32,
    /// UDP periodic timer polls.
    pub udp_timer_polls: u32,
    /// UDP datagram construction requests.
    pub udp_send_requests: u32,
}

impl Counters {
    fn bump(field: &mut u32) {
        *field = field.saturating_add(1);
    }
}

/// Mediates all traffic between one driver and one protocol engine through
/// one shared buffer.
///
/// The buffer is passed into each entry point rather than owned here so
/// that the driver can keep it wherever its receive path needs it (a
/// static, a DMA-adjacent region) while the borrow checker still rules out
/// overlapping events.
pub struct Coordinator<E> {
    engine: E,
    counters: Counters,
}

impl<E> Coordinator<E> {
    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            counters: Counters {
                rx_frames: 0,
                rx_empty: 0,
                tx_frames: 0,
                timer_polls: 0,
                poll_requests: 0,
                udp_timer_polls: 0,
                udp_send_requests: 0,
            },
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Processes a received frame.
    ///
    /// The driver must have placed the frame in the buffer and set its
    /// length first. Returns `true` if a reply is waiting in the buffer and
    /// must be transmitted now.
    ///
    /// Calling this with an empty buffer is a contract violation by the
    /// caller; it is counted and ignored rather than dispatched.
    pub fn process_inbound<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        if buf.is_empty() {
            Counters::bump(&mut self.counters.rx_empty);
            return false;
        }
        Counters::bump(&mut self.counters.rx_frames);
        self.engine.process(buf, Event::Inbound);
        self.note_tx(buf)
    }

    /// Periodic TCP processing for connection `conn`: retransmissions,
    /// timeouts, state cleanup. Call once per connection per timer tick,
    /// for every connection regardless of open/closed state. Produces at
    /// most one outbound packet; returns `true` if one is waiting.
    pub fn periodic_poll<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
        conn: usize,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        Counters::bump(&mut self.counters.timer_polls);
        self.dispatch_poll(buf, Event::Timer { conn })
    }

    /// On-demand poll of connection `conn`, outside the periodic timer.
    pub fn poll_request<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
        conn: usize,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        Counters::bump(&mut self.counters.poll_requests);
        self.dispatch_poll(buf, Event::PollRequest { conn })
    }

    /// Periodic UDP processing for connection `conn`; the UDP analog of
    /// [`Coordinator::periodic_poll`].
    pub fn udp_periodic_poll<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
        conn: usize,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        Counters::bump(&mut self.counters.udp_timer_polls);
        self.dispatch_poll(buf, Event::UdpTimer { conn })
    }

    /// Asks the engine to construct an outgoing UDP datagram for
    /// connection `conn` in the buffer. Returns `true` if it did.
    pub fn udp_send_request<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
        conn: usize,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        Counters::bump(&mut self.counters.udp_send_requests);
        self.dispatch_poll(buf, Event::UdpSend { conn })
    }

    /// Poll-style events start from an empty buffer: whatever packet was in
    /// it has been handled (or abandoned) by now, and its `app`/`snd` views
    /// must not leak into the new event.
    fn dispatch_poll<const N: usize>(
        &mut self,
        buf: &mut PacketBuf<N>,
        event: Event,
    ) -> bool
    where
        E: ProtocolEngine<N>,
    {
        buf.clear();
        self.engine.process(buf, event);
        self.note_tx(buf)
    }

    fn note_tx<const N: usize>(&mut self, buf: &PacketBuf<N>) -> bool {
        let tx = !buf.is_empty();
        if tx {
            Counters::bump(&mut self.counters.tx_frames);
        }
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LLH: usize = 14;
    const SIZE: usize = pktbuf::bufsize(LLH, 400);

    /// Records every event it sees; optionally produces a canned reply of
    /// `reply_len` bytes on the next event.
    #[derive(Default)]
    struct MockEngine {
        events: Vec<Event>,
        reply_len: Option<usize>,
    }

    impl<const N: usize> ProtocolEngine<N> for MockEngine {
        fn process(&mut self, buf: &mut PacketBuf<N>, event: Event) {
            self.events.push(event);
            match self.reply_len.take() {
                Some(n) => {
                    for b in &mut buf.frame_mut()[..n] {
                        *b = 0xEE;
                    }
                    buf.set_len(n);
                }
                None => buf.clear(),
            }
        }
    }

    fn rx_frame(buf: &mut PacketBuf<SIZE>, n: usize) {
        for (i, b) in buf.frame_mut()[..n].iter_mut().enumerate() {
            *b = i as u8;
        }
        buf.set_len(n);
    }

    #[test]
    fn inbound_dispatches_and_reports_reply() {
        let mut buf = PacketBuf::new(LLH);
        let mut coord = Coordinator::new(MockEngine {
            reply_len: Some(42),
            ..Default::default()
        });

        rx_frame(&mut buf, 60);
        assert!(coord.process_inbound(&mut buf));
        assert_eq!(buf.len(), 42);
        assert_eq!(coord.engine().events, [Event::Inbound]);
        assert_eq!(coord.counters().rx_frames, 1);
        assert_eq!(coord.counters().tx_frames, 1);
    }

    #[test]
    fn inbound_without_reply_leaves_nothing_to_send() {
        let mut buf = PacketBuf::new(LLH);
        let mut coord = Coordinator::new(MockEngine::default());

        rx_frame(&mut buf, 60);
        assert!(!coord.process_inbound(&mut buf));
        assert!(buf.is_empty());
        assert_eq!(coord.counters().tx_frames, 0);
    }

    #[test]
    fn empty_inbound_is_counted_noop() {
        let mut buf = PacketBuf::<SIZE>::new(LLH);
        let mut coord = Coordinator::new(MockEngine::default());

        assert!(!coord.process_inbound(&mut buf));
        // Never reached the engine.
        assert!(coord.engine().events.is_empty());
        assert_eq!(coord.counters().rx_empty, 1);
        assert_eq!(coord.counters().rx_frames, 0);
    }

    #[test]
    fn each_entry_point_delivers_its_event() {
        let mut buf = PacketBuf::new(LLH);
        let mut coord = Coordinator::new(MockEngine::default());

        rx_frame(&mut buf, 20);
        coord.process_inbound(&mut buf);
        coord.periodic_poll(&mut buf, 3);
        coord.poll_request(&mut buf, 4);
        coord.udp_periodic_poll(&mut buf, 5);
        coord.udp_send_request(&mut buf, 6);

        assert_eq!(
            coord.engine().events,
            [
                Event::Inbound,
                Event::Timer { conn: 3 },
                Event::PollRequest { conn: 4 },
                Event::UdpTimer { conn: 5 },
                Event::UdpSend { conn: 6 },
            ]
        );
        let c = coord.counters();
        assert_eq!(c.timer_polls, 1);
        assert_eq!(c.poll_requests, 1);
        assert_eq!(c.udp_timer_polls, 1);
        assert_eq!(c.udp_send_requests, 1);
    }

    #[test]
    fn idle_poll_leaves_buffer_empty_and_contents_untouched() {
        let mut buf = PacketBuf::new(LLH);
        let mut coord = Coordinator::new(MockEngine::default());

        // Leave a recognizable pattern in the backing array.
        rx_frame(&mut buf, 100);
        let before: Vec<u8> = buf.packet().to_vec();
        buf.clear();

        assert!(!coord.periodic_poll(&mut buf, 0));
        assert!(buf.is_empty());
        // dispatch cleared the length, not the bytes.
        buf.set_len(100);
        assert_eq!(buf.packet(), before);
    }

    #[test]
    fn poll_produces_at_most_one_packet() {
        let mut buf = PacketBuf::<SIZE>::new(LLH);
        let mut coord = Coordinator::new(MockEngine {
            reply_len: Some(64),
            ..Default::default()
        });

        assert!(coord.periodic_poll(&mut buf, 1));
        assert_eq!(buf.len(), 64);
        // Reply consumed; the next poll has nothing.
        assert!(!coord.periodic_poll(&mut buf, 1));
        assert!(buf.is_empty());
    }

    #[test]
    fn poll_invalidates_previous_views() {
        let mut buf = PacketBuf::new(LLH);
        let mut coord = Coordinator::new(MockEngine::default());

        rx_frame(&mut buf, 80);
        buf.set_app(LLH + 40);
        coord.periodic_poll(&mut buf, 0);
        assert!(buf.app_offset().is_none());
    }

    #[test]
    fn counters_saturate() {
        let mut c = Counters {
            rx_frames: u32::MAX,
            ..Default::default()
        };
        Counters::bump(&mut c.rx_frames);
        assert_eq!(c.rx_frames, u32::MAX);
    }
}
