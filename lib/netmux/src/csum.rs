// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Checksum operations over the packet buffer, and the seam through which a
//! driver substitutes hardware-assisted versions.
//!
//! All of these return the complemented RFC 1071 checksum: the value that
//! goes on the wire, and the value that recomputes to 0 over a correctly
//! checksummed region. Truncated input degrades to 0 -- nothing at this
//! boundary faults (the engine treats a 0/invalid result as a drop).

use inetsum::Summer;
use pktbuf::PacketBuf;
use zerocopy::FromBytes;

use crate::wire::{
    Ipv4Header, IPV4_HDR_LEN, PROTO_TCP, PROTO_UDP, TCP_HDR_LEN, UDP_HDR_LEN,
};

/// Checksum of the fixed-size IPv4 header at the front of the IP region.
///
/// Returns 0 if the buffer doesn't hold a complete header. Computed over a
/// header whose checksum field carries the correct value, the result is 0.
pub fn ip_checksum<const N: usize>(buf: &PacketBuf<N>) -> u16 {
    let ip = buf.ip();
    if ip.len() < IPV4_HDR_LEN {
        return 0;
    }
    inetsum::checksum(&ip[..IPV4_HDR_LEN])
}

/// TCP checksum of the segment in the buffer: RFC 793 pseudo-header, then
/// the TCP header from the packet buffer, then payload from the app view.
pub fn tcp_checksum<const N: usize>(buf: &PacketBuf<N>) -> u16 {
    transport_checksum(buf, PROTO_TCP, TCP_HDR_LEN)
}

/// UDP checksum of the datagram in the buffer, per RFC 768.
pub fn udp_checksum<const N: usize>(buf: &PacketBuf<N>) -> u16 {
    transport_checksum(buf, PROTO_UDP, UDP_HDR_LEN)
}

/// Shared pseudo-header + two-region accumulation.
///
/// The transport header always sits right after the IP header in the packet
/// buffer. The payload is wherever the app view says it is -- the two are
/// summed as one logical byte stream without being physically adjacent.
/// When no app view is set, the whole transport region is the segment.
fn transport_checksum<const N: usize>(
    buf: &PacketBuf<N>,
    proto: u8,
    hdr_len: usize,
) -> u16 {
    let Ok((ip, transport)) = Ipv4Header::ref_from_prefix(buf.ip()) else {
        return 0;
    };
    if transport.len() < hdr_len {
        return 0;
    }

    let (head, payload) = match buf.app_offset() {
        Some(_) => (&transport[..hdr_len], buf.app_data()),
        None => (transport, &[] as &[u8]),
    };

    // The pseudo-header length field is 16 bits; a segment that can't be
    // described by it can't be a valid packet, so decline to sum it.
    let Ok(seg_len) = u16::try_from(head.len() + payload.len()) else {
        return 0;
    };

    let mut s = Summer::new();
    s.add_bytes(&ip.src);
    s.add_bytes(&ip.dst);
    s.add_word(u16::from(proto));
    s.add_word(seg_len);
    s.add_bytes(head);
    s.add_bytes(payload);
    s.finish()
}

/// The checksum primitives a driver may replace with hardware-assisted
/// versions.
///
/// Every method has a software default; an accelerator overrides whichever
/// subset its hardware covers. Substitutes must be synchronous and
/// byte-identical to the defaults -- any divergence is a correctness bug,
/// not a tolerable approximation.
pub trait ChecksumOps {
    /// RFC 1071 Internet checksum of `data`.
    fn checksum(&self, data: &[u8]) -> u16 {
        inetsum::checksum(data)
    }

    /// 32-bit network-order accumulate; see [`inetsum::add32`].
    fn add32(&self, acc: [u8; 4], addend: u16) -> [u8; 4] {
        inetsum::add32(acc, addend)
    }

    fn ip_checksum<const N: usize>(&self, buf: &PacketBuf<N>) -> u16 {
        ip_checksum(buf)
    }

    fn tcp_checksum<const N: usize>(&self, buf: &PacketBuf<N>) -> u16 {
        tcp_checksum(buf)
    }

    fn udp_checksum<const N: usize>(&self, buf: &PacketBuf<N>) -> u16 {
        udp_checksum(buf)
    }
}

/// The all-software implementation: every operation is the default.
pub struct SoftChecksum;

impl ChecksumOps for SoftChecksum {}
