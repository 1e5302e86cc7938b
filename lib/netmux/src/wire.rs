// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zero-copy views of the IPv4/TCP/UDP headers the checksum operations need
//! to read out of the packet buffer.
//!
//! These are deliberately minimal: the protocol engine behind
//! [`ProtocolEngine`](crate::ProtocolEngine) owns real header processing.
//! We only need addresses, protocol numbers, lengths, and checksum fields.

use static_assertions::const_assert_eq;
use zerocopy::byteorder::network_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const IPV4_HDR_LEN: usize = 20;
pub const TCP_HDR_LEN: usize = 20;
pub const UDP_HDR_LEN: usize = 8;

/// Combined IP + TCP header length: the threshold below which an outgoing
/// packet is known to have no separately-placed application payload.
pub const TCPIP_HDR_LEN: usize = IPV4_HDR_LEN + TCP_HDR_LEN;

pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

/// Fixed 20-byte IPv4 header (options are the engine's problem).
#[derive(FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout, Debug)]
#[repr(C)]
pub struct Ipv4Header {
    pub ver_ihl: u8,
    pub tos: u8,
    pub total_len: U16,
    pub ident: U16,
    pub frag_off: U16,
    pub ttl: u8,
    pub proto: u8,
    pub checksum: U16,
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

const_assert_eq!(core::mem::size_of::<Ipv4Header>(), IPV4_HDR_LEN);

impl Ipv4Header {
    pub fn version(&self) -> u8 {
        self.ver_ihl >> 4
    }

    /// Header length in bytes as claimed by the IHL field.
    pub fn header_len(&self) -> usize {
        usize::from(self.ver_ihl & 0x0F) * 4
    }
}

#[derive(FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout, Debug)]
#[repr(C)]
pub struct TcpHeader {
    pub src_port: U16,
    pub dst_port: U16,
    /// Sequence/ack numbers stay as raw network-order bytes; TCP arithmetic
    /// on them goes through [`inetsum::add32`].
    pub seq: [u8; 4],
    pub ack: [u8; 4],
    pub data_off: u8,
    pub flags: u8,
    pub window: U16,
    pub checksum: U16,
    pub urgent: U16,
}

const_assert_eq!(core::mem::size_of::<TcpHeader>(), TCP_HDR_LEN);

#[derive(FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout, Debug)]
#[repr(C)]
pub struct UdpHeader {
    pub src_port: U16,
    pub dst_port: U16,
    pub length: U16,
    pub checksum: U16,
}

const_assert_eq!(core::mem::size_of::<UdpHeader>(), UDP_HDR_LEN);
