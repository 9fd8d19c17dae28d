// SPDX-License-Identifier: MIT OR Apache-2.0

//! UDP API parameter blocks.

use super::ParamBlock;
use crate::{Ipv4Address, SegOff16, Status, UdpPort};

/// Parameter block for opening the UDP endpoint.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UdpOpen {
    /// Outcome of the call.
    pub status: Status,
    /// Source address datagrams will carry, normally this station's address.
    pub src_ip: Ipv4Address,
}

/// Parameter block for closing the UDP endpoint.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UdpClose {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for sending one datagram.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UdpWrite {
    /// Outcome of the call.
    pub status: Status,
    /// Destination address.
    pub ip: Ipv4Address,
    /// Relay to route through when the destination is off-subnet, or zero.
    pub gateway: Ipv4Address,
    /// Source port. Zero selects the DHCP client port.
    pub src_port: UdpPort,
    /// Destination port.
    pub dst_port: UdpPort,
    /// Number of payload bytes at `buffer`.
    pub buffer_size: u16,
    /// Caller buffer holding the payload.
    pub buffer: SegOff16,
}

/// Parameter block for receiving one datagram.
///
/// `src_ip`, `dest_ip`, `src_port` and `dest_port` are read as filters
/// (zero means "any") and written back with what actually arrived.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UdpRead {
    /// Outcome of the call.
    pub status: Status,
    /// Filter on / report of the sender's address.
    pub src_ip: Ipv4Address,
    /// Filter on / report of the destination address.
    pub dest_ip: Ipv4Address,
    /// Filter on / report of the sender's port.
    pub src_port: UdpPort,
    /// Filter on / report of the destination port.
    pub dest_port: UdpPort,
    /// Capacity of `buffer` in. Payload length out.
    pub buffer_size: u16,
    /// Caller buffer the payload is copied into.
    pub buffer: SegOff16,
}

unsafe impl ParamBlock for UdpOpen {}
unsafe impl ParamBlock for UdpClose {}
unsafe impl ParamBlock for UdpWrite {}
unsafe impl ParamBlock for UdpRead {}
