// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ethernet II framing.

/// Length of the Ethernet II header.
pub const HEADER_LEN: usize = 14;

/// EtherType of IPv4.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// EtherType of ARP.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// EtherType of RARP.
pub const ETHERTYPE_RARP: u16 = 0x8035;

/// The all-stations broadcast address.
pub const BROADCAST: [u8; 6] = [0xff; 6];

/// One parsed Ethernet II header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Destination station address.
    pub dest: [u8; 6],
    /// Source station address.
    pub src: [u8; 6],
    /// EtherType of the payload.
    pub ethertype: u16,
}

impl Header {
    /// Split `frame` into its header and payload.
    ///
    /// Returns `None` if the frame is shorter than a header.
    #[must_use]
    pub fn parse(frame: &[u8]) -> Option<(Self, &[u8])> {
        let (hdr, payload) = frame.split_at_checked(HEADER_LEN)?;
        let mut dest = [0; 6];
        let mut src = [0; 6];
        dest.copy_from_slice(&hdr[0..6]);
        src.copy_from_slice(&hdr[6..12]);
        let ethertype = u16::from_be_bytes([hdr[12], hdr[13]]);
        Some((Self { dest, src, ethertype }, payload))
    }

    /// Write this header into the first [`HEADER_LEN`] bytes of `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is shorter than a header.
    pub fn write(&self, frame: &mut [u8]) {
        frame[0..6].copy_from_slice(&self.dest);
        frame[6..12].copy_from_slice(&self.src);
        frame[12..14].copy_from_slice(&self.ethertype.to_be_bytes());
    }
}
