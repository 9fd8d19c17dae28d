// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preboot (stack management) parameter blocks.

use super::ParamBlock;
use crate::{SegOff16, Status};

/// Cached packet selector: the initial DHCP discover.
pub const PACKET_TYPE_DHCP_DISCOVER: u16 = 1;
/// Cached packet selector: the DHCP acknowledgement.
pub const PACKET_TYPE_DHCP_ACK: u16 = 2;
/// Cached packet selector: the boot server's reply.
pub const PACKET_TYPE_CACHED_REPLY: u16 = 3;

/// Parameter block for bringing the device layer out of reset.
///
/// The register fields carry what the loader left behind: the PnP BIOS entry
/// check in `ax`, bus identity in `bx`/`dx`, and a far pointer to the PnP
/// structure in `es:di`.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct StartUndi {
    /// Outcome of the call.
    pub status: Status,
    /// Loader `AX` register.
    pub ax: u16,
    /// Loader `BX` register.
    pub bx: u16,
    /// Loader `DX` register.
    pub dx: u16,
    /// Loader `DI` register.
    pub di: u16,
    /// Loader `ES` register.
    pub es: u16,
}

/// Parameter block for undoing the start call.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct StopUndi {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for asking the stack to remove itself.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UnloadStack {
    /// Outcome of the call.
    pub status: Status,
    /// Reserved, must be zero.
    pub reserved: [u8; 10],
}

/// Parameter block for copying a cached boot negotiation packet.
///
/// With a null `buffer`, the call reports the packet's address and size
/// instead of copying, letting callers peek at the cache in place.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct GetCachedInfo {
    /// Outcome of the call.
    pub status: Status,
    /// One of the `PACKET_TYPE_*` selectors.
    pub packet_type: u16,
    /// Capacity of `buffer` in, bytes copied out.
    pub buffer_size: u16,
    /// Caller buffer for the packet, or null to query.
    pub buffer: SegOff16,
    /// Size of the cached packet, reported back.
    pub buffer_limit: u16,
}

/// Parameter block for downloading a new boot file and restarting.
///
/// Same layout as a whole-file read; the request is a read whose success
/// hands control to the downloaded image.
pub type RestartTftp = super::tftp::TftpReadFile;

/// Parameter block for starting the base code.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct StartBase {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for stopping the base code.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct StopBase {
    /// Outcome of the call.
    pub status: Status,
}

unsafe impl ParamBlock for StartUndi {}
unsafe impl ParamBlock for StopUndi {}
unsafe impl ParamBlock for UnloadStack {}
unsafe impl ParamBlock for GetCachedInfo {}
unsafe impl ParamBlock for StartBase {}
unsafe impl ParamBlock for StopBase {}
