// SPDX-License-Identifier: MIT OR Apache-2.0

//! UDP datagram framing.

use super::{checksum, ipv4};
use pxenv_raw::Ipv4Address;

/// Length of the UDP header.
pub const HEADER_LEN: usize = 8;

/// One parsed UDP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dest_port: u16,
}

impl Header {
    /// Split `segment` into its header and payload, verifying the
    /// checksum against the pseudo-header for `src`/`dest`.
    ///
    /// A transmitted checksum of zero means "not computed" and is
    /// accepted as-is.
    #[must_use]
    pub fn parse(src: Ipv4Address, dest: Ipv4Address, segment: &[u8]) -> Option<(Self, &[u8])> {
        if segment.len() < HEADER_LEN {
            return None;
        }
        let length = usize::from(u16::from_be_bytes([segment[4], segment[5]]));
        if length < HEADER_LEN || length > segment.len() {
            return None;
        }
        let transmitted = u16::from_be_bytes([segment[6], segment[7]]);
        if transmitted != 0 {
            let sum = pseudo_header_sum(src, dest, length as u16);
            if checksum::finish(checksum::add(sum, &segment[..length])) != 0 {
                return None;
            }
        }
        let header = Self {
            src_port: u16::from_be_bytes([segment[0], segment[1]]),
            dest_port: u16::from_be_bytes([segment[2], segment[3]]),
        };
        Some((header, &segment[HEADER_LEN..length]))
    }

    /// Write a header for the `payload_len` bytes that follow it into
    /// the first [`HEADER_LEN`] bytes of `segment`, checksumming header
    /// and payload together.
    ///
    /// A computed checksum of zero is sent as `0xffff`; zero on the wire
    /// is reserved for "not computed".
    ///
    /// # Panics
    ///
    /// Panics if `segment` is shorter than header plus payload.
    pub fn write(&self, src: Ipv4Address, dest: Ipv4Address, segment: &mut [u8], payload_len: usize) {
        let length = (HEADER_LEN + payload_len) as u16;
        segment[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        segment[2..4].copy_from_slice(&self.dest_port.to_be_bytes());
        segment[4..6].copy_from_slice(&length.to_be_bytes());
        segment[6..8].fill(0);
        let sum = pseudo_header_sum(src, dest, length);
        let ck = match checksum::finish(checksum::add(sum, &segment[..usize::from(length)])) {
            0 => 0xffff,
            ck => ck,
        };
        segment[6..8].copy_from_slice(&ck.to_be_bytes());
    }
}

fn pseudo_header_sum(src: Ipv4Address, dest: Ipv4Address, length: u16) -> u32 {
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(&src.octets());
    pseudo[4..8].copy_from_slice(&dest.octets());
    pseudo[9] = ipv4::PROTOCOL_UDP;
    pseudo[10..12].copy_from_slice(&length.to_be_bytes());
    checksum::add(0, &pseudo)
}
