// SPDX-License-Identifier: MIT OR Apache-2.0

//! IPv4 packet framing.
//!
//! Only what a boot transport needs: fixed 20-byte headers on transmit,
//! option-tolerant parsing on receive, and no fragment reassembly.
//! Fragmented datagrams are rejected by [`Header::parse`].

use super::checksum;
use pxenv_raw::Ipv4Address;

/// Length of the header the engine transmits (no options).
pub const HEADER_LEN: usize = 20;

/// Protocol number of UDP.
pub const PROTOCOL_UDP: u8 = 17;

const VERSION_IHL: u8 = 0x45;
const FLAG_DONT_FRAGMENT: u8 = 0x40;
const FLAG_MORE_FRAGMENTS: u8 = 0x20;
const DEFAULT_TTL: u8 = 64;

/// One parsed IPv4 header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Payload protocol number.
    pub protocol: u8,
    /// Source address.
    pub src: Ipv4Address,
    /// Destination address.
    pub dest: Ipv4Address,
}

impl Header {
    /// Split `packet` into its header and payload.
    ///
    /// Validates version, header length, total length, and the header
    /// checksum. Options are skipped. Fragments (offset set or more
    /// fragments flagged) return `None`; the engine never reassembles.
    #[must_use]
    pub fn parse(packet: &[u8]) -> Option<(Self, &[u8])> {
        let first = *packet.first()?;
        if first >> 4 != 4 {
            return None;
        }
        let header_len = usize::from(first & 0x0f) * 4;
        if header_len < HEADER_LEN || packet.len() < header_len {
            return None;
        }
        let total_len = usize::from(u16::from_be_bytes([packet[2], packet[3]]));
        if total_len < header_len || total_len > packet.len() {
            return None;
        }
        if packet[6] & FLAG_MORE_FRAGMENTS != 0 || fragment_offset(packet) != 0 {
            return None;
        }
        if checksum::finish(checksum::add(0, &packet[..header_len])) != 0 {
            return None;
        }
        let header = Self {
            protocol: packet[9],
            src: Ipv4Address([packet[12], packet[13], packet[14], packet[15]]),
            dest: Ipv4Address([packet[16], packet[17], packet[18], packet[19]]),
        };
        Some((header, &packet[header_len..total_len]))
    }

    /// Write a header for `payload_len` bytes of payload into the first
    /// [`HEADER_LEN`] bytes of `packet`.
    ///
    /// # Panics
    ///
    /// Panics if `packet` is shorter than a header.
    pub fn write(&self, packet: &mut [u8], ident: u16, payload_len: usize) {
        let total_len = (HEADER_LEN + payload_len) as u16;
        packet[0] = VERSION_IHL;
        packet[1] = 0;
        packet[2..4].copy_from_slice(&total_len.to_be_bytes());
        packet[4..6].copy_from_slice(&ident.to_be_bytes());
        packet[6] = FLAG_DONT_FRAGMENT;
        packet[7] = 0;
        packet[8] = DEFAULT_TTL;
        packet[9] = self.protocol;
        packet[10..12].fill(0);
        packet[12..16].copy_from_slice(&self.src.octets());
        packet[16..20].copy_from_slice(&self.dest.octets());
        let ck = checksum::finish(checksum::add(0, &packet[..HEADER_LEN]));
        packet[10..12].copy_from_slice(&ck.to_be_bytes());
    }
}

fn fragment_offset(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[6] & 0x1f, packet[7]])
}

/// Maps a class D address to its Ethernet multicast address: `01:00:5e`
/// followed by the low 23 bits of the group.
#[must_use]
pub fn multicast_mac(group: Ipv4Address) -> [u8; 6] {
    let [_, b, c, d] = group.octets();
    [0x01, 0x00, 0x5e, b & 0x7f, c, d]
}
