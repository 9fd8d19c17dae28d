// SPDX-License-Identifier: MIT OR Apache-2.0

//! TFTP API parameter blocks.

use super::ParamBlock;
use crate::{Addr32, Ipv4Address, SegOff16, Status, UdpPort};

/// Length of the file name field. Names are NUL-terminated within it.
pub const FILENAME_LEN: usize = 128;

/// Parameter block for opening a TFTP session.
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct TftpOpen {
    /// Outcome of the call.
    pub status: Status,
    /// Server to fetch from.
    pub server_ip: Ipv4Address,
    /// Relay to route through when the server is off-subnet, or zero.
    pub gateway_ip: Ipv4Address,
    /// NUL-terminated file name.
    pub file_name: [u8; FILENAME_LEN],
    /// Server port. Zero selects the well-known TFTP port.
    pub port: UdpPort,
    /// Requested block size in, negotiated block size out.
    pub packet_size: u16,
}

impl Default for TftpOpen {
    fn default() -> Self {
        Self {
            status: Status::default(),
            server_ip: Ipv4Address::default(),
            gateway_ip: Ipv4Address::default(),
            file_name: [0; FILENAME_LEN],
            port: UdpPort::default(),
            packet_size: 0,
        }
    }
}

/// Parameter block for closing the TFTP session.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct TftpClose {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for reading the next block of the open session.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct TftpRead {
    /// Outcome of the call.
    pub status: Status,
    /// Sequence number of the block just delivered.
    pub packet_number: u16,
    /// Number of bytes copied into `buffer`.
    pub buffer_size: u16,
    /// Caller buffer, at least one negotiated block size long.
    pub buffer: SegOff16,
}

/// Parameter block for downloading a whole file into one caller buffer.
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct TftpReadFile {
    /// Outcome of the call.
    pub status: Status,
    /// NUL-terminated file name.
    pub file_name: [u8; FILENAME_LEN],
    /// Capacity of `buffer` in, bytes delivered out.
    pub buffer_size: u32,
    /// Flat address of the caller buffer.
    pub buffer: Addr32,
    /// Server to fetch from.
    pub server_ip: Ipv4Address,
    /// Relay to route through when the server is off-subnet, or zero.
    pub gateway_ip: Ipv4Address,
    /// Multicast group to listen on, or zero for plain unicast.
    pub mcast_ip: Ipv4Address,
    /// Client port for the multicast transfer.
    pub client_port: UdpPort,
    /// Server port for the multicast transfer.
    pub server_port: UdpPort,
    /// Seconds to wait for the first response.
    pub open_timeout: u16,
    /// Seconds of silence before falling back to a passive listen.
    pub reopen_delay: u16,
}

impl Default for TftpReadFile {
    fn default() -> Self {
        Self {
            status: Status::default(),
            file_name: [0; FILENAME_LEN],
            buffer_size: 0,
            buffer: Addr32::default(),
            server_ip: Ipv4Address::default(),
            gateway_ip: Ipv4Address::default(),
            mcast_ip: Ipv4Address::default(),
            client_port: UdpPort::default(),
            server_port: UdpPort::default(),
            open_timeout: 0,
            reopen_delay: 0,
        }
    }
}

/// Parameter block for querying a file's size without transferring it.
#[derive(Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct TftpGetFsize {
    /// Outcome of the call.
    pub status: Status,
    /// Server to ask.
    pub server_ip: Ipv4Address,
    /// Relay to route through when the server is off-subnet, or zero.
    pub gateway_ip: Ipv4Address,
    /// NUL-terminated file name.
    pub file_name: [u8; FILENAME_LEN],
    /// Size the server reported, in bytes.
    pub file_size: u32,
}

impl Default for TftpGetFsize {
    fn default() -> Self {
        Self {
            status: Status::default(),
            server_ip: Ipv4Address::default(),
            gateway_ip: Ipv4Address::default(),
            file_name: [0; FILENAME_LEN],
            file_size: 0,
        }
    }
}

unsafe impl ParamBlock for TftpOpen {}
unsafe impl ParamBlock for TftpClose {}
unsafe impl ParamBlock for TftpRead {}
unsafe impl ParamBlock for TftpReadFile {}
unsafe impl ParamBlock for TftpGetFsize {}
