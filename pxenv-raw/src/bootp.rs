// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boot negotiation packet layout.
//!
//! The stack caches the packets that configured it (discover, acknowledge,
//! boot reply) and serves copies of them on request. They all share this
//! classic BOOTP shape with a DHCP-sized vendor area.

use crate::{Ipv4Address, MacAddress};
use core::fmt::{self, Debug, Formatter};
use core::mem::size_of;
use core::slice;

/// `opcode` value of a request packet.
pub const BOOTP_REQUEST: u8 = 1;
/// `opcode` value of a reply packet.
pub const BOOTP_REPLY: u8 = 2;

/// `flags` bit asking the server to answer by broadcast.
pub const BOOTP_BCAST: u16 = 0x8000;

/// Size of the vendor area, DHCP-sized rather than the BOOTP minimum.
pub const VENDOR_LEN: usize = 1024;

/// Magic cookie opening an RFC 1048 style vendor area.
pub const VM_RFC1048: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Leading fields of an RFC 1048 style vendor area.
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct VendorHeader {
    /// [`VM_RFC1048`] when options follow.
    pub magic: [u8; 4],
    /// Reserved flag bits.
    pub flags: u32,
    /// Start of the option bytes.
    pub pad: [u8; 56],
}

impl Default for VendorHeader {
    fn default() -> Self {
        Self {
            magic: [0; 4],
            flags: 0,
            pad: [0; 56],
        }
    }
}

/// Vendor area of a boot packet.
///
/// Either raw option bytes or the structured header view of the same bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub union VendorArea {
    /// The raw option bytes.
    pub data: [u8; VENDOR_LEN],
    /// Structured view of the leading bytes.
    pub header: VendorHeader,
}

impl Debug for VendorArea {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorArea").finish()
    }
}

impl Default for VendorArea {
    fn default() -> Self {
        Self {
            data: [0; VENDOR_LEN],
        }
    }
}

/// One cached boot negotiation packet.
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct BootPacket {
    /// [`BOOTP_REQUEST`] or [`BOOTP_REPLY`].
    pub opcode: u8,
    /// Hardware type, as in ARP.
    pub hw_type: u8,
    /// Hardware address length in bytes.
    pub hw_len: u8,
    /// Hop count, incremented by relays.
    pub gate_hops: u8,
    /// Transaction identifier.
    pub ident: u32,
    /// Seconds since the client started booting.
    pub seconds: u16,
    /// Flag bits, [`BOOTP_BCAST`] among them.
    pub flags: u16,
    /// Client's own address, when it already knows one.
    pub client_ip: Ipv4Address,
    /// Address the server assigned.
    pub your_ip: Ipv4Address,
    /// Next server to use in the boot sequence.
    pub server_ip: Ipv4Address,
    /// Relay that forwarded the packet.
    pub gateway_ip: Ipv4Address,
    /// Client hardware address.
    pub client_hw_addr: MacAddress,
    /// Server host name, NUL-terminated.
    pub server_name: [u8; 64],
    /// Boot file name, NUL-terminated.
    pub boot_file: [u8; 128],
    /// DHCP options.
    pub vendor: VendorArea,
}

impl BootPacket {
    /// The packet as raw bytes, the form the cache serves it in.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: packed layout leaves no padding, and every field is plain
        // data initialized at construction.
        unsafe { slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>()) }
    }
}

impl Default for BootPacket {
    fn default() -> Self {
        Self {
            opcode: 0,
            hw_type: 0,
            hw_len: 0,
            gate_hops: 0,
            ident: 0,
            seconds: 0,
            flags: 0,
            client_ip: Ipv4Address::default(),
            your_ip: Ipv4Address::default(),
            server_ip: Ipv4Address::default(),
            gateway_ip: Ipv4Address::default(),
            client_hw_addr: MacAddress::default(),
            server_name: [0; 64],
            boot_file: [0; 128],
            vendor: VendorArea::default(),
        }
    }
}
