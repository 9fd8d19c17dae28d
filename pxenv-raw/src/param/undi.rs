// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device-layer (UNDI) parameter blocks.

use super::ParamBlock;
use crate::{Addr32, Ipv4Address, MacAddress, SegOff16, Status};
use bitflags::bitflags;
use core::fmt::{self, Debug, Formatter};

/// Capacity of the multicast address list.
pub const MAXNUM_MCADDR: usize = 8;

/// Number of scatter entries a transmit descriptor can carry.
pub const MAX_DATA_BLOCKS: usize = 8;

/// `protocol` value for frames the caller pre-framed itself.
pub const P_UNKNOWN: u8 = 0;
/// `protocol` value for IP.
pub const P_IP: u8 = 1;
/// `protocol` value for ARP.
pub const P_ARP: u8 = 2;
/// `protocol` value for RARP.
pub const P_RARP: u8 = 3;

/// `xmit_flag` value: `dest_addr` points at the destination media address.
pub const XMT_DESTADDR: u8 = 0x00;
/// `xmit_flag` value: broadcast the frame, `dest_addr` is ignored.
pub const XMT_BROADCAST: u8 = 0x01;

/// `data_ptr` entries hold a far pointer.
pub const TD_PTR_SEGOFF: u8 = 1;

/// Hardware type report: Ethernet.
pub const HW_ETHERNET: u16 = 1;
/// Hardware type report: experimental Ethernet.
pub const HW_EXP_ETHERNET: u16 = 2;
/// Hardware type report: IEEE 802 networks.
pub const HW_IEEE802: u16 = 6;
/// Hardware type report: ARCNET.
pub const HW_ARCNET: u16 = 7;

/// `nic_type` value for PCI adapters.
pub const NIC_TYPE_PCI: u8 = 2;
/// `nic_type` value for Plug and Play adapters.
pub const NIC_TYPE_PNP: u8 = 3;
/// `nic_type` value for CardBus adapters.
pub const NIC_TYPE_CARDBUS: u8 = 4;

/// ISR `func_flag` input: first call from the interrupt handler.
pub const ISR_IN_START: u16 = 1;
/// ISR `func_flag` input: begin draining after a claimed interrupt.
pub const ISR_IN_PROCESS: u16 = 2;
/// ISR `func_flag` input: continue draining.
pub const ISR_IN_GET_NEXT: u16 = 3;

/// ISR `func_flag` output to `START`: the interrupt was ours.
pub const ISR_OUT_OURS: u16 = 0;
/// ISR `func_flag` output to `START`: not our interrupt.
pub const ISR_OUT_NOT_OURS: u16 = 1;
/// ISR `func_flag` output: nothing left to deliver.
pub const ISR_OUT_DONE: u16 = 0;
/// ISR `func_flag` output: a transmit completed.
pub const ISR_OUT_TRANSMIT: u16 = 2;
/// ISR `func_flag` output: a received frame (chunk) follows.
pub const ISR_OUT_RECEIVE: u16 = 3;
/// ISR `func_flag` output: hardware busy, call again.
pub const ISR_OUT_BUSY: u16 = 4;

/// ISR `pkt_type` report: frame was addressed to this station.
pub const PKT_TYPE_DIRECTED: u8 = 0;
/// ISR `pkt_type` report: broadcast frame.
pub const PKT_TYPE_BROADCAST: u8 = 1;
/// ISR `pkt_type` report: multicast frame.
pub const PKT_TYPE_MULTICAST: u8 = 2;

bitflags! {
    /// Receive filter selecting which frames the open adapter delivers.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ReceiveFilters: u16 {
        /// Frames addressed to the station address.
        const DIRECTED = 0x0001;
        /// Broadcast frames.
        const BROADCAST = 0x0002;
        /// Every frame on the wire.
        const PROMISCUOUS = 0x0004;
        /// Source-routed frames.
        const SOURCE_ROUTING = 0x0008;
    }
}

bitflags! {
    /// Interface capabilities reported by the get-interface-info call.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ServiceFlags: u32 {
        /// Broadcast reception works.
        const BROADCAST = 0x0000_0001;
        /// Multicast reception works.
        const MULTICAST = 0x0000_0002;
        /// Group addressing works.
        const GROUP_ADDRESSING = 0x0000_0004;
        /// Promiscuous reception works.
        const PROMISCUOUS = 0x0000_0008;
        /// The station address can be overridden.
        const SETTABLE_STATION_ADDRESS = 0x0000_0010;
        /// Statistics are collected.
        const STATISTICS = 0x0000_0020;
        /// Diagnostics are implemented.
        const DIAGNOSTICS = 0x0000_0040;
    }
}

/// Multicast address list carried by open, reset and set-multicast calls.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct McastAddressList {
    /// Number of `addrs` entries in use.
    pub count: u16,
    /// The media addresses to receive.
    pub addrs: [MacAddress; MAXNUM_MCADDR],
}

impl McastAddressList {
    /// The addresses actually in use. A count past the array capacity is
    /// clamped rather than trusted.
    #[must_use]
    pub fn entries(&self) -> &[MacAddress] {
        let count = usize::from(self.count).min(MAXNUM_MCADDR);
        &self.addrs[..count]
    }
}

/// Parameter block for the first call after load.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiStartup {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for tearing down whatever startup set up.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiCleanup {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for initializing the adapter hardware.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiInitialize {
    /// Outcome of the call.
    pub status: Status,
    /// Flat address of a protocol.ini image, or zero.
    pub protocol_ini: Addr32,
    /// Reserved, must be zero.
    pub reserved: [u8; 8],
}

/// Parameter block for resetting the adapter.
///
/// A reset reprograms the receive side, so the caller supplies the multicast
/// list to restore afterwards.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiResetAdapter {
    /// Outcome of the call.
    pub status: Status,
    /// Multicast list to restore after the reset.
    pub mcast: McastAddressList,
}

/// Parameter block for stopping the adapter hardware.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiShutdown {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for opening the adapter for traffic.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiOpen {
    /// Outcome of the call.
    pub status: Status,
    /// Reserved, must be zero.
    pub open_flag: u16,
    /// Receive filter to apply.
    pub pkt_filter: ReceiveFilters,
    /// Multicast addresses to receive while open.
    pub mcast: McastAddressList,
}

/// Parameter block for closing the adapter for traffic.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiClose {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for transmitting one frame.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiTransmit {
    /// Outcome of the call.
    pub status: Status,
    /// One of the `P_*` protocol values.
    pub protocol: u8,
    /// [`XMT_DESTADDR`] or [`XMT_BROADCAST`].
    pub xmit_flag: u8,
    /// Far pointer to the destination media address, when not broadcasting.
    pub dest_addr: SegOff16,
    /// Far pointer to the frame's [`TransmitBlockDescriptor`].
    pub tbd: SegOff16,
    /// Reserved, must be zero.
    pub reserved: [u32; 2],
}

/// Scatter list describing the frame a transmit call sends.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct TransmitBlockDescriptor {
    /// Bytes immediately at `xmit`.
    pub immed_length: u16,
    /// Far pointer to the immediate bytes.
    pub xmit: SegOff16,
    /// Number of `data_blocks` entries in use.
    pub data_blk_count: u16,
    /// Additional scatter entries appended after the immediate bytes.
    pub data_blocks: [TransmitDataBlock; MAX_DATA_BLOCKS],
}

/// One scatter entry of a [`TransmitBlockDescriptor`].
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct TransmitDataBlock {
    /// Pointer interpretation, [`TD_PTR_SEGOFF`].
    pub ptr_type: u8,
    /// Reserved, must be zero.
    pub reserved: u8,
    /// Bytes at `data_ptr`.
    pub data_len: u16,
    /// Far pointer to the bytes.
    pub data_ptr: SegOff16,
}

/// Parameter block for replacing the multicast reception list.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiSetMcastAddress {
    /// Outcome of the call.
    pub status: Status,
    /// The new list.
    pub mcast: McastAddressList,
}

/// Parameter block for overriding the station address.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiSetStationAddress {
    /// Outcome of the call.
    pub status: Status,
    /// Address to use instead of the burned-in one.
    pub station_address: MacAddress,
}

/// Parameter block for replacing the receive filter.
///
/// The filter travels as a single byte here, unlike the sixteen-bit field of
/// [`UndiOpen`]. The flag values are the same.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiSetPacketFilter {
    /// Outcome of the call.
    pub status: Status,
    /// New filter, low byte of [`ReceiveFilters`] bits.
    pub filter: u8,
}

/// Parameter block reporting adapter addresses and geometry.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiGetInformation {
    /// Outcome of the call.
    pub status: Status,
    /// I/O base of the adapter.
    pub base_io: u16,
    /// Interrupt line of the adapter.
    pub int_number: u16,
    /// Largest transmit unit in bytes.
    pub max_tran_unit: u16,
    /// One of the `HW_*` hardware types.
    pub hw_type: u16,
    /// Bytes of `current_node_address` in use.
    pub hw_addr_len: u16,
    /// Address the adapter currently answers to.
    pub current_node_address: MacAddress,
    /// Burned-in address.
    pub permanent_node_address: MacAddress,
    /// Real-mode segment of the expansion ROM, or zero.
    pub rom_address: u16,
    /// Receive buffer count.
    pub rx_buf_ct: u16,
    /// Transmit buffer count.
    pub tx_buf_ct: u16,
}

/// Parameter block reporting traffic counters.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiGetStatistics {
    /// Outcome of the call.
    pub status: Status,
    /// Frames transmitted without error.
    pub xmt_good_frames: u32,
    /// Frames received and delivered.
    pub rcv_good_frames: u32,
    /// Frames dropped for bad checksums.
    pub rcv_crc_errors: u32,
    /// Frames dropped for want of buffers.
    pub rcv_resource_errors: u32,
}

/// Parameter block for zeroing the traffic counters.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiClearStatistics {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for adapter self-diagnostics.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiInitiateDiags {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block for forcing the adapter to interrupt.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiForceInterrupt {
    /// Outcome of the call.
    pub status: Status,
}

/// Parameter block mapping an IP multicast group to a media address.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiGetMcastAddress {
    /// Outcome of the call.
    pub status: Status,
    /// Group to map.
    pub inet_addr: Ipv4Address,
    /// Media address the group maps to.
    pub media_addr: MacAddress,
}

/// Bus identity of a PCI adapter.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct PciNicInfo {
    /// Configuration-space vendor identifier.
    pub vendor_id: u16,
    /// Configuration-space device identifier.
    pub dev_id: u16,
    /// Configuration-space base class.
    pub base_class: u8,
    /// Configuration-space sub class.
    pub sub_class: u8,
    /// Configuration-space programming interface.
    pub prog_intf: u8,
    /// Configuration-space revision.
    pub rev: u8,
    /// Packed bus/device/function triple.
    pub bus_dev_func: u16,
    /// Subsystem vendor identifier.
    pub sub_vendor_id: u16,
    /// Subsystem device identifier.
    pub sub_device_id: u16,
}

/// Bus identity of a Plug and Play adapter.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct PnpNicInfo {
    /// EISA device identifier.
    pub eisa_dev_id: u32,
    /// Device base class.
    pub base_class: u8,
    /// Device sub class.
    pub sub_class: u8,
    /// Device programming interface.
    pub prog_intf: u8,
    /// Card select number.
    pub card_sel_num: u16,
}

/// Bus identity payload of [`UndiGetNicType`].
///
/// Untagged; `nic_type` in the surrounding block says which member is live.
#[derive(Clone, Copy)]
#[repr(C)]
pub union NicTypeInfo {
    /// Identity of a PCI (or CardBus) adapter.
    pub pci: PciNicInfo,
    /// Identity of a Plug and Play adapter.
    pub pnp: PnpNicInfo,
}

impl Debug for NicTypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Untagged union; without the discriminant next door there is no
        // safe way to pick a member to print.
        f.debug_struct("NicTypeInfo").finish()
    }
}

impl Default for NicTypeInfo {
    fn default() -> Self {
        Self {
            pci: PciNicInfo::default(),
        }
    }
}

/// Parameter block reporting the adapter's bus identity.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiGetNicType {
    /// Outcome of the call.
    pub status: Status,
    /// One of the `NIC_TYPE_*` values.
    pub nic_type: u8,
    /// Identity data for the reported type.
    pub info: NicTypeInfo,
}

/// Parameter block reporting the interface type and capabilities.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiGetIfaceInfo {
    /// Outcome of the call.
    pub status: Status,
    /// NUL-terminated interface type name, such as `DIX+802.3`.
    pub iface_type: [u8; 16],
    /// Link speed in bits per second.
    pub link_speed: u32,
    /// Capabilities of the interface.
    pub service_flags: ServiceFlags,
    /// Reserved, must be zero.
    pub reserved: [u32; 4],
}

/// Parameter block for the interrupt service call.
///
/// `func_flag` is both input and output: the caller passes an `ISR_IN_*`
/// request and reads back an `ISR_OUT_*` answer.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct UndiIsr {
    /// Outcome of the call.
    pub status: Status,
    /// `ISR_IN_*` request in, `ISR_OUT_*` answer out.
    pub func_flag: u16,
    /// Bytes of the frame delivered in this chunk.
    pub buffer_length: u16,
    /// Total bytes of the frame being delivered.
    pub frame_length: u16,
    /// Bytes of media header at the start of the frame.
    pub frame_header_length: u16,
    /// Far pointer to the delivered chunk, owned by the stack.
    pub frame: SegOff16,
    /// One of the `P_*` protocol values.
    pub prot_type: u8,
    /// One of the `PKT_TYPE_*` values.
    pub pkt_type: u8,
}

unsafe impl ParamBlock for UndiStartup {}
unsafe impl ParamBlock for UndiCleanup {}
unsafe impl ParamBlock for UndiInitialize {}
unsafe impl ParamBlock for UndiResetAdapter {}
unsafe impl ParamBlock for UndiShutdown {}
unsafe impl ParamBlock for UndiOpen {}
unsafe impl ParamBlock for UndiClose {}
unsafe impl ParamBlock for UndiTransmit {}
unsafe impl ParamBlock for TransmitBlockDescriptor {}
unsafe impl ParamBlock for TransmitDataBlock {}
unsafe impl ParamBlock for UndiSetMcastAddress {}
unsafe impl ParamBlock for UndiSetStationAddress {}
unsafe impl ParamBlock for UndiSetPacketFilter {}
unsafe impl ParamBlock for UndiGetInformation {}
unsafe impl ParamBlock for UndiGetStatistics {}
unsafe impl ParamBlock for UndiClearStatistics {}
unsafe impl ParamBlock for UndiInitiateDiags {}
unsafe impl ParamBlock for UndiForceInterrupt {}
unsafe impl ParamBlock for UndiGetMcastAddress {}
unsafe impl ParamBlock for UndiGetNicType {}
unsafe impl ParamBlock for UndiGetIfaceInfo {}
unsafe impl ParamBlock for UndiIsr {}
