// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles: a scripted adapter and a flat-memory environment.
//!
//! [`MockNic`] queues frames instead of touching hardware; tests push
//! received frames into `rx` and inspect transmitted ones in `tx`.
//! [`MockEnv`] backs every caller address with one 64 KiB arena starting
//! at segment `0x1000` and drives a synthetic clock that creeps forward
//! on every read so bounded waits expire without real time passing.

use core::cell::Cell;
use core::ops::Range;
use std::collections::VecDeque;
use std::vec;
use std::vec::Vec;

use pxenv_raw::param::undi::{McastAddressList, ReceiveFilters};
use pxenv_raw::{Ipv4Address, MacAddress, SegOff16};

use crate::device::{BusIdentity, DeviceError, DeviceInfo, NetDevice};
use crate::env::{BufferAddr, Environment};
use crate::net::{arp, eth, ipv4, udp};
use crate::undi::UndiController;

/// Source address used for frames built by [`frame_to`].
const REMOTE: [u8; 6] = [0x52, 0x54, 0x00, 0xfe, 0xed, 0x01];

/// Scripted [`NetDevice`].
pub struct MockNic {
    /// Frames waiting to be received, front first.
    pub rx: VecDeque<Vec<u8>>,
    /// Frames the engine transmitted, in order.
    pub tx: Vec<Vec<u8>>,
    /// Number of transmit attempts to refuse with [`DeviceError::Busy`].
    pub busy_countdown: u32,
    /// Fail every transmit with [`DeviceError::Failed`].
    pub fail_transmit: bool,
    /// Answer the next interrupt query with "ours".
    pub irq_pending: bool,
}

impl MockNic {
    /// The mock's factory station address.
    pub const STATION: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            busy_countdown: 0,
            fail_transmit: false,
            irq_pending: false,
        }
    }
}

impl Default for MockNic {
    fn default() -> Self {
        Self::new()
    }
}

impl NetDevice for MockNic {
    fn permanent_address(&self) -> MacAddress {
        Self::STATION.into()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            mtu: 1500,
            base_io: 0xc000,
            irq: 11,
            rx_buffer_count: 8,
            tx_buffer_count: 4,
            link_speed_mbps: 100,
            bus: BusIdentity::Pci {
                vendor_id: 0x10ec,
                device_id: 0x8139,
                base_class: 0x02,
                sub_class: 0x00,
                prog_intf: 0x00,
                rev: 0x10,
                bus_dev_func: 0x0068,
                sub_vendor_id: 0x10ec,
                sub_device_id: 0x8139,
            },
        }
    }

    fn reset(&mut self) -> core::result::Result<(), DeviceError> {
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8]) -> core::result::Result<(), DeviceError> {
        if self.fail_transmit {
            return Err(DeviceError::Failed);
        }
        if self.busy_countdown > 0 {
            self.busy_countdown -= 1;
            return Err(DeviceError::Busy);
        }
        self.tx.push(frame.to_vec());
        Ok(())
    }

    fn poll_receive(&mut self, buf: &mut [u8]) -> Option<usize> {
        let frame = self.rx.pop_front()?;
        let len = frame.len().min(buf.len());
        buf[..len].copy_from_slice(&frame[..len]);
        Some(len)
    }

    fn interrupt_pending(&mut self) -> bool {
        core::mem::take(&mut self.irq_pending)
    }
}

/// An Ethernet frame from [`REMOTE`] to `dest` carrying `payload`.
pub fn frame_to(dest: &[u8; 6], ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; eth::HEADER_LEN + payload.len()];
    eth::Header {
        dest: *dest,
        src: REMOTE,
        ethertype,
    }
    .write(&mut frame);
    frame[eth::HEADER_LEN..].copy_from_slice(payload);
    frame
}

/// A complete Ethernet/IPv4/UDP frame with valid checksums.
pub fn udp_frame(
    src_mac: [u8; 6],
    dest_mac: [u8; 6],
    src_ip: Ipv4Address,
    dest_ip: Ipv4Address,
    src_port: u16,
    dest_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let headers = eth::HEADER_LEN + ipv4::HEADER_LEN + udp::HEADER_LEN;
    let mut frame = vec![0u8; headers + payload.len()];
    eth::Header {
        dest: dest_mac,
        src: src_mac,
        ethertype: eth::ETHERTYPE_IPV4,
    }
    .write(&mut frame);
    frame[headers..].copy_from_slice(payload);
    udp::Header {
        src_port,
        dest_port,
    }
    .write(
        src_ip,
        dest_ip,
        &mut frame[eth::HEADER_LEN + ipv4::HEADER_LEN..],
        payload.len(),
    );
    ipv4::Header {
        protocol: ipv4::PROTOCOL_UDP,
        src: src_ip,
        dest: dest_ip,
    }
    .write(
        &mut frame[eth::HEADER_LEN..],
        0x4242,
        udp::HEADER_LEN + payload.len(),
    );
    frame
}

/// A gratuitous ARP announcement that `ip` is at `mac`, as a broadcast
/// frame. Reading it past the UDP layer warms the resolution cache.
pub fn arp_announcement(mac: [u8; 6], ip: Ipv4Address) -> Vec<u8> {
    let mut frame = vec![0u8; eth::HEADER_LEN + arp::PAYLOAD_LEN];
    eth::Header {
        dest: eth::BROADCAST,
        src: mac,
        ethertype: eth::ETHERTYPE_ARP,
    }
    .write(&mut frame);
    arp::Packet {
        op: arp::OP_REPLY,
        sender_mac: mac,
        sender_ip: ip,
        target_mac: [0; 6],
        target_ip: ip,
    }
    .write(&mut frame[eth::HEADER_LEN..]);
    frame
}

/// A controller taken to open with directed and broadcast reception.
pub fn open_undi() -> UndiController<MockNic> {
    let mut undi = UndiController::new(MockNic::new());
    undi.startup().unwrap();
    undi.initialize().unwrap();
    undi.open(
        ReceiveFilters::DIRECTED | ReceiveFilters::BROADCAST,
        &McastAddressList::default(),
    )
    .unwrap();
    undi
}

/// Flat-memory [`Environment`].
pub struct MockEnv {
    arena: Vec<u8>,
    ticks: Cell<u64>,
}

impl MockEnv {
    /// Linear address of the arena's first byte, segment `0x1000`.
    pub const ARENA_BASE: u32 = 0x1_0000;

    const ARENA_LEN: usize = 0x1_0000;
    const TICKS_PER_SECOND: u64 = 100;

    /// Arena offset of the interrupt-path frame window.
    const WINDOW_OFF: usize = 0xf000;
    const WINDOW_LEN: usize = 0x600;

    pub fn new() -> Self {
        Self {
            arena: vec![0; Self::ARENA_LEN],
            ticks: Cell::new(0),
        }
    }

    /// Moves the clock forward `secs` seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.ticks
            .set(self.ticks.get() + secs * Self::TICKS_PER_SECOND);
    }

    fn range(&self, addr: BufferAddr, len: usize) -> Option<Range<usize>> {
        if addr.is_null() {
            return None;
        }
        let linear = match addr {
            BufferAddr::SegOff(at) => at.linear(),
            BufferAddr::Linear(at) => at.0,
        };
        let start = linear.checked_sub(Self::ARENA_BASE)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.arena.len()).then_some(start..end)
    }
}

impl Default for MockEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for MockEnv {
    fn buffer(&self, addr: BufferAddr, len: usize) -> Option<&[u8]> {
        let range = self.range(addr, len)?;
        Some(&self.arena[range])
    }

    fn buffer_mut(&mut self, addr: BufferAddr, len: usize) -> Option<&mut [u8]> {
        let range = self.range(addr, len)?;
        Some(&mut self.arena[range])
    }

    fn ticks(&self) -> u64 {
        // Every read advances the clock one tick so polling loops that
        // wait for a deadline terminate.
        let now = self.ticks.get();
        self.ticks.set(now + 1);
        now
    }

    fn ticks_per_second(&self) -> u64 {
        Self::TICKS_PER_SECOND
    }

    fn frame_window(&mut self) -> (SegOff16, &mut [u8]) {
        let at = SegOff16::new(0x1000, Self::WINDOW_OFF as u16);
        let window = &mut self.arena[Self::WINDOW_OFF..Self::WINDOW_OFF + Self::WINDOW_LEN];
        (at, window)
    }
}
