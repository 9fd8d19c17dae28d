// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network address types carried in parameter blocks.
//!
//! The main exports of this module are:
//! - [`MacAddress`]
//! - [`Ipv4Address`]
//! - [`UdpPort`]
//!
//! All three keep wire byte order in memory, so they can sit directly inside
//! the packed parameter block layouts.

use core::fmt::{self, Display, Formatter};

/// An IPv4 internet protocol address, in network byte order.
///
/// # Conversions and Relation to [`core::net`]
///
/// The following [`From`] implementations exist:
///   - `[u8; 4]` -> [`Ipv4Address`]
///   - [`core::net::Ipv4Addr`] -> [`Ipv4Address`]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ipv4Address(pub [u8; 4]);

impl Ipv4Address {
    /// The all-zero address, used to mean "not set" in parameter blocks.
    pub const UNSPECIFIED: Self = Self([0; 4]);

    /// The limited broadcast address 255.255.255.255.
    pub const BROADCAST: Self = Self([255; 4]);

    /// Returns the octets of the IP address.
    #[must_use]
    pub const fn octets(self) -> [u8; 4] {
        self.0
    }

    /// Returns true for the all-zero address.
    #[must_use]
    pub const fn is_unspecified(self) -> bool {
        matches!(self.0, [0, 0, 0, 0])
    }

    /// Returns true for the limited broadcast address.
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        matches!(self.0, [255, 255, 255, 255])
    }

    /// Returns true for class D (multicast) addresses.
    #[must_use]
    pub const fn is_multicast(self) -> bool {
        self.0[0] & 0xf0 == 0xe0
    }
}

impl From<core::net::Ipv4Addr> for Ipv4Address {
    fn from(ip: core::net::Ipv4Addr) -> Self {
        Self(ip.octets())
    }
}

impl From<Ipv4Address> for core::net::Ipv4Addr {
    fn from(ip: Ipv4Address) -> Self {
        Self::from(ip.0)
    }
}

impl From<[u8; 4]> for Ipv4Address {
    fn from(octets: [u8; 4]) -> Self {
        Self(octets)
    }
}

impl Display for Ipv4Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// A UDP port in network byte order.
///
/// Parameter blocks carry ports exactly as they appear in the UDP header.
/// Use [`UdpPort::new`] and [`UdpPort::value`] to cross between wire and
/// host order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UdpPort(pub [u8; 2]);

impl UdpPort {
    /// The zero port, used to mean "not set" in parameter blocks.
    pub const UNSPECIFIED: Self = Self([0; 2]);

    /// Builds a port from a host-order number.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self(port.to_be_bytes())
    }

    /// Returns the port as a host-order number.
    #[must_use]
    pub const fn value(self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    /// Returns true for the zero port.
    #[must_use]
    pub const fn is_unspecified(self) -> bool {
        matches!(self.0, [0, 0])
    }
}

impl From<u16> for UdpPort {
    fn from(port: u16) -> Self {
        Self::new(port)
    }
}

impl From<UdpPort> for u16 {
    fn from(port: UdpPort) -> Self {
        port.value()
    }
}

impl Display for UdpPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A media access control address.
///
/// Sized for the widest hardware address the API admits. Ethernet uses the
/// first six bytes and leaves the rest zero.
///
/// # Conversions
///
/// The following [`From`] implementations exist:
///   - `[u8; 6]` -> [`MacAddress`] (zero-extended)
///   - `[u8; 16]` -> [`MacAddress`]
///   - [`MacAddress`] -> `[u8; 6]` (truncated)
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct MacAddress(pub [u8; 16]);

impl MacAddress {
    /// The Ethernet broadcast address.
    pub const BROADCAST: Self = {
        let mut octets = [0; 16];
        let mut i = 0;
        while i < 6 {
            octets[i] = 0xff;
            i += 1;
        }
        Self(octets)
    };

    /// Returns the octets of the MAC address.
    #[must_use]
    pub const fn octets(self) -> [u8; 16] {
        self.0
    }

    /// Returns the six Ethernet octets.
    #[must_use]
    pub const fn ethernet(self) -> [u8; 6] {
        [self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]]
    }

    /// Returns true if the group bit is set. Covers broadcast too.
    #[must_use]
    pub const fn is_multicast(self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        let mut buffer = [0; 16];
        buffer[..6].copy_from_slice(&octets);
        Self(buffer)
    }
}

impl From<[u8; 16]> for MacAddress {
    fn from(octets: [u8; 16]) -> Self {
        Self(octets)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(mac: MacAddress) -> Self {
        mac.ethernet()
    }
}
