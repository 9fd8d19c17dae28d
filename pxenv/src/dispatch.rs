// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opcode dispatch and parameter-block marshalling.
//!
//! [`PxeStack`] owns the whole engine: the device layer, the UDP endpoint,
//! the TFTP client and the packets cached from the boot-server exchange.
//! One entry point, [`PxeStack::dispatch`], takes an opcode and the
//! caller's raw parameter block, decodes the block, runs the operation and
//! writes the outcome back, status first. An embedding's API trampoline
//! only has to recover the opcode and block bytes from the call frame and
//! forward them here.
//!
//! Handlers work on an aligned copy of the block, so a decode failure
//! never leaves a half-written block in the caller's memory.

use core::fmt::{self, Debug, Formatter};
use core::mem::size_of;

use log::{debug, trace, warn};
use pxenv_raw::bootp::BootPacket;
use pxenv_raw::param::undi::{
    self as undi_param, NicTypeInfo, PciNicInfo, PnpNicInfo, ReceiveFilters, ServiceFlags,
    TransmitBlockDescriptor,
};
use pxenv_raw::param::{self, preboot, tftp as tftp_param, udp as udp_param, ParamBlock};
use pxenv_raw::{ExitCode, Ipv4Address, MacAddress, OpCode, SegOff16, UdpPort};

use crate::config::{MAX_FRAME_LEN, UDP_DEFAULT_SRC_PORT};
use crate::device::{BusIdentity, NetDevice};
use crate::env::{BufferAddr, Environment};
use crate::net::{eth, ipv4};
use crate::tftp::{ReadFileRequest, TftpClient};
use crate::udp::{ReadFilter, UdpLayer};
use crate::undi::{IsrEvent, UndiController, UndiState};
use crate::{Error, Result, ResultExt, Status};

/// Interface name reported by `UNDI_GET_IFACE_INFO`.
const IFACE_TYPE: &[u8] = b"DIX+802.3";

/// The packets recorded during the boot-server exchange.
///
/// The firmware that performed the address-assignment conversation hands
/// these to [`PxeStack::new`]; `GET_CACHED_INFO` serves copies to network
/// boot programs, and the TFTP operations fall back to the assigned
/// address when the caller never opened a UDP endpoint of its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct CachedPackets {
    /// The discover that started the exchange.
    pub dhcp_discover: BootPacket,
    /// The acknowledgement that configured this station.
    pub dhcp_ack: BootPacket,
    /// The boot-server reply naming the boot file.
    pub cached_reply: BootPacket,
}

impl CachedPackets {
    fn select(&self, packet_type: u16) -> Option<&BootPacket> {
        match packet_type {
            preboot::PACKET_TYPE_DHCP_DISCOVER => Some(&self.dhcp_discover),
            preboot::PACKET_TYPE_DHCP_ACK => Some(&self.dhcp_ack),
            preboot::PACKET_TYPE_CACHED_REPLY => Some(&self.cached_reply),
            _ => None,
        }
    }
}

/// The complete preboot API engine behind one network adapter.
///
/// Construct one per adapter with the packets cached from the exchange
/// that configured the station, then feed API calls to
/// [`dispatch`](Self::dispatch). The layers underneath can also be driven
/// directly through the accessors when the embedding is pure Rust.
pub struct PxeStack<D: NetDevice> {
    undi: UndiController<D>,
    udp: UdpLayer,
    tftp: TftpClient,
    cache: CachedPackets,
    unloaded: bool,
    xmit: [u8; MAX_FRAME_LEN],
}

impl<D: NetDevice> PxeStack<D> {
    /// Builds a stack over `device` with the given cached packets.
    ///
    /// The device starts in the uninitialized state; the caller brings it
    /// up through the `UNDI` opcodes or the controller accessors.
    #[must_use]
    pub fn new(device: D, cache: CachedPackets) -> Self {
        Self {
            undi: UndiController::new(device),
            udp: UdpLayer::new(),
            tftp: TftpClient::new(),
            cache,
            unloaded: false,
            xmit: [0; MAX_FRAME_LEN],
        }
    }

    /// The device layer.
    #[must_use]
    pub const fn undi(&self) -> &UndiController<D> {
        &self.undi
    }

    /// The device layer, mutably.
    pub const fn undi_mut(&mut self) -> &mut UndiController<D> {
        &mut self.undi
    }

    /// The UDP endpoint.
    #[must_use]
    pub const fn udp(&self) -> &UdpLayer {
        &self.udp
    }

    /// The UDP endpoint, mutably.
    pub const fn udp_mut(&mut self) -> &mut UdpLayer {
        &mut self.udp
    }

    /// The TFTP client.
    #[must_use]
    pub const fn tftp(&self) -> &TftpClient {
        &self.tftp
    }

    /// The TFTP client, mutably.
    pub const fn tftp_mut(&mut self) -> &mut TftpClient {
        &mut self.tftp
    }

    /// The packets cached from the boot-server exchange.
    #[must_use]
    pub const fn cached_packets(&self) -> &CachedPackets {
        &self.cache
    }

    /// Runs one API call against the raw parameter block `block`.
    ///
    /// The block is decoded per `opcode`, the operation runs, and the
    /// block is written back with the status in its first field. The
    /// returned [`ExitCode`] duplicates that status's success bit for the
    /// register-level convention.
    ///
    /// Unknown opcodes, and blocks too short for their opcode's layout,
    /// fail without running anything. After a successful unload only the
    /// `UNDI` opcode group keeps answering; everything else reports
    /// [`Status::UNSUPPORTED`].
    pub fn dispatch<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        opcode: OpCode,
        block: &mut [u8],
    ) -> ExitCode {
        trace!("dispatch: {opcode:?}, {} byte block", block.len());
        if self.unloaded && opcode.0 > OpCode::STOP_UNDI.0 {
            debug!("dispatch: {opcode:?} after unload");
            param::write_status(block, Status::UNSUPPORTED);
            return ExitCode::FAILURE;
        }
        match opcode {
            OpCode::START_UNDI => {
                run(env, block, |_, b: &mut preboot::StartUndi| self.op_start_undi(b))
            }
            OpCode::UNDI_STARTUP => {
                run(env, block, |_, _b: &mut undi_param::UndiStartup| self.undi.startup())
            }
            OpCode::UNDI_CLEANUP => {
                run(env, block, |_, _b: &mut undi_param::UndiCleanup| self.undi.cleanup())
            }
            OpCode::UNDI_INITIALIZE => run(env, block, |_, b: &mut undi_param::UndiInitialize| {
                self.op_undi_initialize(b)
            }),
            OpCode::UNDI_RESET_ADAPTER => {
                run(env, block, |_, b: &mut undi_param::UndiResetAdapter| {
                    let mcast = b.mcast;
                    self.undi.reset_adapter(&mcast)
                })
            }
            OpCode::UNDI_SHUTDOWN => {
                run(env, block, |_, _b: &mut undi_param::UndiShutdown| self.undi.shutdown())
            }
            OpCode::UNDI_OPEN => run(env, block, |_, b: &mut undi_param::UndiOpen| {
                let filters = b.pkt_filter;
                let mcast = b.mcast;
                self.undi.open(filters, &mcast)
            }),
            OpCode::UNDI_CLOSE => {
                run(env, block, |_, _b: &mut undi_param::UndiClose| self.undi.close())
            }
            OpCode::UNDI_TRANSMIT => run(env, block, |env, b: &mut undi_param::UndiTransmit| {
                self.op_undi_transmit(env, b)
            }),
            OpCode::UNDI_SET_MCAST_ADDRESS => {
                run(env, block, |_, b: &mut undi_param::UndiSetMcastAddress| {
                    let mcast = b.mcast;
                    self.undi.set_multicast(&mcast)
                })
            }
            OpCode::UNDI_SET_STATION_ADDRESS => {
                run(env, block, |_, b: &mut undi_param::UndiSetStationAddress| {
                    let address = b.station_address;
                    self.undi.set_station_address(address)
                })
            }
            OpCode::UNDI_SET_PACKET_FILTER => {
                run(env, block, |_, b: &mut undi_param::UndiSetPacketFilter| {
                    let filters = ReceiveFilters::from_bits_retain(u16::from(b.filter));
                    self.undi.set_packet_filter(filters)
                })
            }
            OpCode::UNDI_GET_INFORMATION => {
                run(env, block, |_, b: &mut undi_param::UndiGetInformation| {
                    self.op_undi_get_information(b)
                })
            }
            OpCode::UNDI_GET_STATISTICS => {
                run(env, block, |_, b: &mut undi_param::UndiGetStatistics| {
                    self.op_undi_get_statistics(b)
                })
            }
            OpCode::UNDI_CLEAR_STATISTICS => {
                run(env, block, |_, _b: &mut undi_param::UndiClearStatistics| {
                    self.undi.clear_statistics()
                })
            }
            OpCode::UNDI_INITIATE_DIAGS => {
                run(env, block, |_, _b: &mut undi_param::UndiInitiateDiags| {
                    Err(Status::UNSUPPORTED.into())
                })
            }
            OpCode::UNDI_FORCE_INTERRUPT => {
                run(env, block, |_, _b: &mut undi_param::UndiForceInterrupt| {
                    Err(Status::UNSUPPORTED.into())
                })
            }
            OpCode::UNDI_GET_MCAST_ADDRESS => {
                run(env, block, |_, b: &mut undi_param::UndiGetMcastAddress| {
                    self.op_undi_get_mcast_address(b)
                })
            }
            OpCode::UNDI_GET_NIC_TYPE => {
                run(env, block, |_, b: &mut undi_param::UndiGetNicType| {
                    self.op_undi_get_nic_type(b)
                })
            }
            OpCode::UNDI_GET_IFACE_INFO => {
                run(env, block, |_, b: &mut undi_param::UndiGetIfaceInfo| {
                    self.op_undi_get_iface_info(b)
                })
            }
            OpCode::UNDI_ISR => {
                run(env, block, |env, b: &mut undi_param::UndiIsr| self.op_undi_isr(env, b))
            }
            // 0x0015 doubles as the state query in older callers; this
            // stack implements the stop semantics.
            OpCode::STOP_UNDI => {
                run(env, block, |_, _b: &mut preboot::StopUndi| self.undi.cleanup())
            }
            OpCode::TFTP_OPEN => {
                run(env, block, |env, b: &mut tftp_param::TftpOpen| self.op_tftp_open(env, b))
            }
            OpCode::TFTP_CLOSE => {
                run(env, block, |_, _b: &mut tftp_param::TftpClose| self.tftp.close())
            }
            OpCode::TFTP_READ => {
                run(env, block, |env, b: &mut tftp_param::TftpRead| self.op_tftp_read(env, b))
            }
            OpCode::TFTP_READ_FILE => run(env, block, |env, b: &mut tftp_param::TftpReadFile| {
                self.op_tftp_read_file(env, b)
            }),
            OpCode::TFTP_GET_FSIZE => run(env, block, |env, b: &mut tftp_param::TftpGetFsize| {
                self.op_tftp_get_fsize(env, b)
            }),
            OpCode::UDP_OPEN => {
                run(env, block, |_, b: &mut udp_param::UdpOpen| self.op_udp_open(b))
            }
            OpCode::UDP_CLOSE => {
                run(env, block, |_, _b: &mut udp_param::UdpClose| self.udp.close())
            }
            OpCode::UDP_READ => {
                run(env, block, |env, b: &mut udp_param::UdpRead| self.op_udp_read(env, b))
            }
            OpCode::UDP_WRITE => {
                run(env, block, |env, b: &mut udp_param::UdpWrite| self.op_udp_write(env, b))
            }
            OpCode::UNLOAD_STACK => {
                run(env, block, |_, _b: &mut preboot::UnloadStack| self.op_unload_stack())
            }
            OpCode::GET_CACHED_INFO => run(env, block, |env, b: &mut preboot::GetCachedInfo| {
                self.op_get_cached_info(env, b)
            }),
            OpCode::RESTART_TFTP => run(env, block, |env, b: &mut preboot::RestartTftp| {
                self.op_tftp_read_file(env, b)?;
                debug!("dispatch: restart image delivered; control stays with the caller");
                Ok(())
            }),
            OpCode::START_BASE => run(env, block, |_, _b: &mut preboot::StartBase| {
                Err(Status::UNSUPPORTED.into())
            }),
            OpCode::STOP_BASE => run(env, block, |_, _b: &mut preboot::StopBase| Ok(())),
            _ => {
                warn!("dispatch: unknown opcode {opcode:?}");
                param::write_status(block, Status::UNSUPPORTED);
                ExitCode::FAILURE
            }
        }
    }

    /// Network operations need a device that passes traffic.
    fn require_open(&self) -> Result {
        if self.undi.state() == UndiState::Open {
            Ok(())
        } else {
            Err(Status::UNDI_INVALID_STATE.into())
        }
    }

    /// Binds the UDP endpoint from the cached acknowledgement when the
    /// caller starts a TFTP operation without opening one itself.
    fn ensure_udp_bound(&mut self) -> Result {
        if self.udp.is_open() {
            return Ok(());
        }
        let ip = self.cache.dhcp_ack.your_ip;
        if ip.is_unspecified() {
            return Err(Status::UDP_CLOSED.into());
        }
        debug!("dispatch: binding udp to cached address {ip}");
        self.udp.open(ip)
    }

    fn op_start_undi(&mut self, b: &mut preboot::StartUndi) -> Result {
        let (ax, bx, dx) = (b.ax, b.bx, b.dx);
        debug!("dispatch: start from loader, ax={ax:#06x} bx={bx:#06x} dx={dx:#06x}");
        self.undi.startup()
    }

    fn op_undi_initialize(&mut self, b: &mut undi_param::UndiInitialize) -> Result {
        let protocol_ini = b.protocol_ini;
        if !protocol_ini.is_null() {
            debug!("dispatch: ignoring protocol.ini block at {protocol_ini:?}");
        }
        self.undi.initialize()
    }

    fn op_undi_transmit<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        b: &mut undi_param::UndiTransmit,
    ) -> Result {
        let tbd_at = b.tbd;
        let raw = env
            .buffer(BufferAddr::SegOff(tbd_at), size_of::<TransmitBlockDescriptor>())
            .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
        let tbd: TransmitBlockDescriptor =
            param::read_block(raw).ok_or(Error::from(Status::MCOPY_PROBLEM))?;

        let mut at = 0;
        let protocol = b.protocol;
        if protocol != undi_param::P_UNKNOWN {
            // The caller supplied a bare protocol payload; frame it.
            let ethertype = match protocol {
                undi_param::P_IP => eth::ETHERTYPE_IPV4,
                undi_param::P_ARP => eth::ETHERTYPE_ARP,
                undi_param::P_RARP => eth::ETHERTYPE_RARP,
                _ => return Err(Status::UNDI_INVALID_PARAMETER.into()),
            };
            let dest = if b.xmit_flag == undi_param::XMT_BROADCAST {
                eth::BROADCAST
            } else {
                let dest_at = b.dest_addr;
                let raw = env
                    .buffer(BufferAddr::SegOff(dest_at), 6)
                    .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
                let mut mac = [0; 6];
                mac.copy_from_slice(raw);
                mac
            };
            let header = eth::Header {
                dest,
                src: self.undi.station_address().ethernet(),
                ethertype,
            };
            header.write(&mut self.xmit);
            at = eth::HEADER_LEN;
        }

        at = self.gather(env, at, tbd.xmit, tbd.immed_length)?;
        let count = usize::from(tbd.data_blk_count).min(undi_param::MAX_DATA_BLOCKS);
        for entry in &tbd.data_blocks[..count] {
            at = self.gather(env, at, entry.data_ptr, entry.data_len)?;
        }
        if at == 0 {
            return Err(Status::UNDI_INVALID_PARAMETER.into());
        }
        self.undi.transmit_frame(&self.xmit[..at])
    }

    /// Appends one descriptor entry to the transmit scratch buffer.
    fn gather<E: Environment + ?Sized>(
        &mut self,
        env: &E,
        at: usize,
        src: SegOff16,
        len: u16,
    ) -> Result<usize> {
        if len == 0 {
            return Ok(at);
        }
        let len = usize::from(len);
        let end = at
            .checked_add(len)
            .filter(|&end| end <= MAX_FRAME_LEN)
            .ok_or(Error::from(Status::UNDI_INVALID_PARAMETER))?;
        let raw = env
            .buffer(BufferAddr::SegOff(src), len)
            .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
        self.xmit[at..end].copy_from_slice(raw);
        Ok(end)
    }

    fn op_undi_get_information(&mut self, b: &mut undi_param::UndiGetInformation) -> Result {
        let info = self.undi.information()?;
        b.base_io = info.device.base_io;
        b.int_number = u16::from(info.device.irq);
        b.max_tran_unit = info.device.mtu;
        b.hw_type = undi_param::HW_ETHERNET;
        b.hw_addr_len = 6;
        b.current_node_address = info.station;
        b.permanent_node_address = info.permanent;
        b.rom_address = 0;
        b.rx_buf_ct = info.device.rx_buffer_count;
        b.tx_buf_ct = info.device.tx_buffer_count;
        Ok(())
    }

    fn op_undi_get_statistics(&mut self, b: &mut undi_param::UndiGetStatistics) -> Result {
        let stats = self.undi.statistics()?;
        b.xmt_good_frames = stats.tx_good;
        b.rcv_good_frames = stats.rx_good;
        b.rcv_crc_errors = stats.rx_crc_errors;
        b.rcv_resource_errors = stats.rx_resource_errors;
        Ok(())
    }

    fn op_undi_get_mcast_address(&mut self, b: &mut undi_param::UndiGetMcastAddress) -> Result {
        let group = b.inet_addr;
        if !group.is_multicast() {
            return Err(Status::UNDI_INVALID_PARAMETER.into());
        }
        b.media_addr = MacAddress::from(ipv4::multicast_mac(group));
        Ok(())
    }

    fn op_undi_get_nic_type(&mut self, b: &mut undi_param::UndiGetNicType) -> Result {
        let info = self.undi.information()?;
        match info.device.bus {
            BusIdentity::Pci {
                vendor_id,
                device_id,
                base_class,
                sub_class,
                prog_intf,
                rev,
                bus_dev_func,
                sub_vendor_id,
                sub_device_id,
            } => {
                b.nic_type = undi_param::NIC_TYPE_PCI;
                b.info = NicTypeInfo {
                    pci: PciNicInfo {
                        vendor_id,
                        dev_id: device_id,
                        base_class,
                        sub_class,
                        prog_intf,
                        rev,
                        bus_dev_func,
                        sub_vendor_id,
                        sub_device_id,
                    },
                };
            }
            BusIdentity::Pnp {
                eisa_dev_id,
                base_class,
                sub_class,
                prog_intf,
                card_sel_num,
            } => {
                b.nic_type = undi_param::NIC_TYPE_PNP;
                b.info = NicTypeInfo {
                    pnp: PnpNicInfo {
                        eisa_dev_id,
                        base_class,
                        sub_class,
                        prog_intf,
                        card_sel_num,
                    },
                };
            }
        }
        Ok(())
    }

    fn op_undi_get_iface_info(&mut self, b: &mut undi_param::UndiGetIfaceInfo) -> Result {
        let info = self.undi.information()?;
        let mut iface_type = [0; 16];
        iface_type[..IFACE_TYPE.len()].copy_from_slice(IFACE_TYPE);
        b.iface_type = iface_type;
        b.link_speed = info.device.link_speed_mbps.saturating_mul(1_000_000);
        b.service_flags = ServiceFlags::BROADCAST
            | ServiceFlags::MULTICAST
            | ServiceFlags::GROUP_ADDRESSING
            | ServiceFlags::PROMISCUOUS
            | ServiceFlags::SETTABLE_STATION_ADDRESS
            | ServiceFlags::STATISTICS;
        b.reserved = [0; 4];
        Ok(())
    }

    fn op_undi_isr<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut undi_param::UndiIsr,
    ) -> Result {
        match b.func_flag {
            undi_param::ISR_IN_START => {
                let ours = self.undi.isr_ours()?;
                b.func_flag = if ours {
                    undi_param::ISR_OUT_OURS
                } else {
                    undi_param::ISR_OUT_NOT_OURS
                };
                Ok(())
            }
            undi_param::ISR_IN_PROCESS | undi_param::ISR_IN_GET_NEXT => {
                let next = b.func_flag == undi_param::ISR_IN_GET_NEXT;
                let (window_at, window) = env.frame_window();
                let event = if next {
                    self.undi.isr_get_next(window)?
                } else {
                    self.undi.isr_process(window)?
                };
                b.buffer_length = 0;
                b.frame_length = 0;
                b.frame_header_length = 0;
                b.frame = SegOff16::NULL;
                b.prot_type = undi_param::P_UNKNOWN;
                b.pkt_type = undi_param::PKT_TYPE_DIRECTED;
                match event {
                    IsrEvent::Done => b.func_flag = undi_param::ISR_OUT_DONE,
                    IsrEvent::Transmit => b.func_flag = undi_param::ISR_OUT_TRANSMIT,
                    IsrEvent::Receive {
                        chunk_len,
                        frame_len,
                        header_len,
                        protocol,
                        kind,
                    } => {
                        b.func_flag = undi_param::ISR_OUT_RECEIVE;
                        b.buffer_length = chunk_len;
                        b.frame_length = frame_len;
                        b.frame_header_length = header_len;
                        b.frame = window_at;
                        b.prot_type = protocol;
                        b.pkt_type = kind;
                    }
                }
                Ok(())
            }
            _ => Err(Status::UNDI_INVALID_PARAMETER.into()),
        }
    }

    fn op_udp_open(&mut self, b: &mut udp_param::UdpOpen) -> Result {
        self.require_open()?;
        let ip = b.src_ip;
        self.udp.open(ip)
    }

    fn op_udp_read<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut udp_param::UdpRead,
    ) -> Result {
        self.require_open()?;
        let filter = ReadFilter {
            src_ip: some_ip(b.src_ip),
            dest_ip: some_ip(b.dest_ip),
            src_port: some_port(b.src_port),
            dest_port: some_port(b.dest_port),
        };
        let Some((read, payload)) = self.udp.read(env, &mut self.undi, &filter, None)? else {
            return Err(Status::FAILURE.into());
        };
        let len = payload.len().min(usize::from(b.buffer_size));
        if len > 0 {
            let buffer = b.buffer;
            let dest = env
                .buffer_mut(BufferAddr::SegOff(buffer), len)
                .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
            dest.copy_from_slice(&payload[..len]);
        }
        b.src_ip = read.src_ip;
        b.dest_ip = read.dest_ip;
        b.src_port = UdpPort::new(read.src_port);
        b.dest_port = UdpPort::new(read.dest_port);
        b.buffer_size = len as u16;
        Ok(())
    }

    fn op_udp_write<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut udp_param::UdpWrite,
    ) -> Result {
        self.require_open()?;
        let mut src_port = b.src_port.value();
        if src_port == 0 {
            src_port = UDP_DEFAULT_SRC_PORT;
            b.src_port = UdpPort::new(src_port);
        }
        let dest_ip = b.ip;
        let gateway = b.gateway;
        let dest_port = b.dst_port.value();
        let buffer = b.buffer;
        let len = usize::from(b.buffer_size);
        let payload = env
            .buffer(BufferAddr::SegOff(buffer), len)
            .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
        self.udp
            .write(&*env, &mut self.undi, dest_ip, gateway, src_port, dest_port, payload)
    }

    fn op_tftp_open<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut tftp_param::TftpOpen,
    ) -> Result {
        self.require_open()?;
        self.ensure_udp_bound()?;
        let server_ip = b.server_ip;
        let gateway_ip = b.gateway_ip;
        let server_port = b.port.value();
        let packet_size = b.packet_size;
        let file_name = cstr_trim(&b.file_name);
        let negotiated = self.tftp.open(
            env,
            &mut self.undi,
            &mut self.udp,
            server_ip,
            gateway_ip,
            file_name,
            server_port,
            packet_size,
        )?;
        b.packet_size = negotiated;
        Ok(())
    }

    fn op_tftp_read<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut tftp_param::TftpRead,
    ) -> Result {
        self.require_open()?;
        let (number, data) = self.tftp.read(env, &mut self.undi, &mut self.udp)?;
        if !data.is_empty() {
            let buffer = b.buffer;
            let dest = env
                .buffer_mut(BufferAddr::SegOff(buffer), data.len())
                .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
            dest.copy_from_slice(data);
        }
        b.packet_number = number;
        b.buffer_size = data.len() as u16;
        Ok(())
    }

    fn op_tftp_read_file<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut tftp_param::TftpReadFile,
    ) -> Result {
        self.require_open()?;
        self.ensure_udp_bound()?;
        let request = ReadFileRequest {
            file_name: cstr_trim(&b.file_name),
            server_ip: b.server_ip,
            gateway_ip: b.gateway_ip,
            mcast_ip: b.mcast_ip,
            client_port: b.client_port.value(),
            server_port: b.server_port.value(),
            open_timeout: b.open_timeout,
            reopen_delay: b.reopen_delay,
        };
        let buffer = BufferAddr::Linear(b.buffer);
        let capacity = b.buffer_size;
        let total =
            self.tftp.read_file(env, &mut self.undi, &mut self.udp, &request, buffer, capacity)?;
        b.buffer_size = total;
        Ok(())
    }

    fn op_tftp_get_fsize<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut tftp_param::TftpGetFsize,
    ) -> Result {
        self.require_open()?;
        self.ensure_udp_bound()?;
        let server_ip = b.server_ip;
        let gateway_ip = b.gateway_ip;
        let size = self.tftp.get_fsize(
            env,
            &mut self.undi,
            &mut self.udp,
            server_ip,
            gateway_ip,
            cstr_trim(&b.file_name),
        )?;
        b.file_size = size;
        Ok(())
    }

    fn op_unload_stack(&mut self) -> Result {
        if self.udp.is_open() || self.tftp.is_open() {
            return Err(Status::KEEP_ALL.into());
        }
        match self.undi.state() {
            UndiState::Uninitialized | UndiState::Shutdown => {
                // The device group stays resident for a follow-on driver.
                self.unloaded = true;
                Ok(())
            }
            _ => Err(Status::KEEP_UNDI.into()),
        }
    }

    fn op_get_cached_info<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        b: &mut preboot::GetCachedInfo,
    ) -> Result {
        let packet_type = b.packet_type;
        let Some(packet) = self.cache.select(packet_type) else {
            return Err(Status::UNSUPPORTED.into());
        };
        let bytes = packet.as_bytes();
        let full = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
        b.buffer_limit = full;
        let buffer = b.buffer;
        let requested = b.buffer_size;
        if buffer.is_null() || requested == 0 {
            // Size query; nothing is copied.
            b.buffer_size = full;
            return Ok(());
        }
        if usize::from(requested) < bytes.len() {
            return Err(Status::OUT_OF_RESOURCES.into());
        }
        let dest = env
            .buffer_mut(BufferAddr::SegOff(buffer), bytes.len())
            .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
        dest.copy_from_slice(bytes);
        b.buffer_size = full;
        Ok(())
    }
}

impl<D: NetDevice> Debug for PxeStack<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PxeStack")
            .field("undi_state", &self.undi.state())
            .field("udp_open", &self.udp.is_open())
            .field("tftp_open", &self.tftp.is_open())
            .field("unloaded", &self.unloaded)
            .finish_non_exhaustive()
    }
}

/// Decodes the block, runs the handler and writes the block back with the
/// resulting status in its first field.
fn run<E, T, F>(env: &mut E, raw: &mut [u8], f: F) -> ExitCode
where
    E: Environment + ?Sized,
    T: ParamBlock,
    F: FnOnce(&mut E, &mut T) -> Result,
{
    let Some(mut block) = param::read_block::<T>(raw) else {
        warn!("dispatch: {} byte block, {} needed", raw.len(), size_of::<T>());
        param::write_status(raw, Status::BAD_FUNC);
        return ExitCode::FAILURE;
    };
    let status = f(env, &mut block).status();
    param::write_block(raw, block);
    param::write_status(raw, status);
    status.exit_code()
}

/// NUL-terminated fixed field to its name bytes.
fn cstr_trim(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(len) => &bytes[..len],
        None => bytes,
    }
}

fn some_ip(ip: Ipv4Address) -> Option<Ipv4Address> {
    (!ip.is_unspecified()).then_some(ip)
}

fn some_port(port: UdpPort) -> Option<u16> {
    let value = port.value();
    (value != 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEnv, MockNic, arp_announcement, udp_frame};
    use pxenv_raw::bootp::BOOTP_REPLY;
    use pxenv_raw::param::undi::{McastAddressList, TransmitDataBlock, TD_PTR_SEGOFF};
    use pxenv_raw::Addr32;
    use std::vec;

    const CLIENT_IP: Ipv4Address = Ipv4Address([192, 168, 0, 2]);
    const SERVER_IP: Ipv4Address = Ipv4Address([192, 168, 0, 10]);
    const SERVER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x0a];

    /// Segment placing offsets at the start of the mock arena.
    const ARENA_SEG: u16 = 0x1000;

    fn call<T: ParamBlock>(
        stack: &mut PxeStack<MockNic>,
        env: &mut MockEnv,
        opcode: OpCode,
        block: T,
    ) -> (ExitCode, T) {
        let mut raw = vec![0; size_of::<T>()];
        param::write_block(&mut raw, block);
        let exit = stack.dispatch(env, opcode, &mut raw);
        let block = param::read_block::<T>(&raw).unwrap();
        (exit, block)
    }

    fn boot_cache() -> CachedPackets {
        CachedPackets {
            dhcp_ack: BootPacket {
                opcode: BOOTP_REPLY,
                your_ip: CLIENT_IP,
                server_ip: SERVER_IP,
                ..Default::default()
            },
            cached_reply: BootPacket {
                opcode: BOOTP_REPLY,
                your_ip: CLIENT_IP,
                ident: 0x1122_3344,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn file_name_field(name: &[u8]) -> [u8; tftp_param::FILENAME_LEN] {
        let mut field = [0; tftp_param::FILENAME_LEN];
        field[..name.len()].copy_from_slice(name);
        field
    }

    fn fresh_stack() -> (MockEnv, PxeStack<MockNic>) {
        (MockEnv::new(), PxeStack::new(MockNic::new(), boot_cache()))
    }

    fn open_stack() -> (MockEnv, PxeStack<MockNic>) {
        let (env, mut stack) = fresh_stack();
        stack.undi_mut().startup().unwrap();
        stack.undi_mut().initialize().unwrap();
        stack
            .undi_mut()
            .open(
                ReceiveFilters::DIRECTED | ReceiveFilters::BROADCAST,
                &McastAddressList::default(),
            )
            .unwrap();
        (env, stack)
    }

    fn status_of(raw: &[u8]) -> Status {
        Status(u16::from_ne_bytes([raw[0], raw[1]]))
    }

    /// Writes `block` into the arena at `offset` so a parameter block can
    /// point at it.
    fn plant<T: ParamBlock>(env: &mut MockEnv, offset: u16, block: T) -> SegOff16 {
        let at = SegOff16::new(ARENA_SEG, offset);
        let raw = env.buffer_mut(BufferAddr::SegOff(at), size_of::<T>()).unwrap();
        param::write_block(raw, block);
        at
    }

    fn plant_bytes(env: &mut MockEnv, offset: u16, bytes: &[u8]) -> SegOff16 {
        let at = SegOff16::new(ARENA_SEG, offset);
        env.buffer_mut(BufferAddr::SegOff(at), bytes.len())
            .unwrap()
            .copy_from_slice(bytes);
        at
    }

    #[test]
    fn test_lifecycle_via_dispatch() {
        let (mut env, mut stack) = fresh_stack();

        let (exit, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_STARTUP,
            undi_param::UndiStartup::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        let status = block.status;
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(stack.undi().state(), UndiState::Started);

        let (exit, _) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_INITIALIZE,
            undi_param::UndiInitialize::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(stack.undi().state(), UndiState::Initialized);

        let open = undi_param::UndiOpen {
            pkt_filter: ReceiveFilters::DIRECTED | ReceiveFilters::BROADCAST,
            ..Default::default()
        };
        let (exit, _) = call(&mut stack, &mut env, OpCode::UNDI_OPEN, open);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(stack.undi().state(), UndiState::Open);
        assert_eq!(
            stack.undi().receive_filters(),
            ReceiveFilters::DIRECTED | ReceiveFilters::BROADCAST
        );

        let (exit, _) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_CLOSE,
            undi_param::UndiClose::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);

        let (exit, _) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_SHUTDOWN,
            undi_param::UndiShutdown::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(stack.undi().state(), UndiState::Shutdown);

        let (exit, _) =
            call(&mut stack, &mut env, OpCode::STOP_UNDI, preboot::StopUndi::default());
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(stack.undi().state(), UndiState::Uninitialized);
    }

    #[test]
    fn test_unknown_opcode_reports_unsupported() {
        let (mut env, mut stack) = fresh_stack();
        let mut raw = [0; 4];
        let exit = stack.dispatch(&mut env, OpCode(0x00ff), &mut raw);
        assert_eq!(exit, ExitCode::FAILURE);
        assert_eq!(status_of(&raw), Status::UNSUPPORTED);

        let (exit, block) =
            call(&mut stack, &mut env, OpCode::START_BASE, preboot::StartBase::default());
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNSUPPORTED);

        let (exit, _) =
            call(&mut stack, &mut env, OpCode::STOP_BASE, preboot::StopBase::default());
        assert_eq!(exit, ExitCode::SUCCESS);
    }

    #[test]
    fn test_short_block_rejected() {
        let (mut env, mut stack) = fresh_stack();
        let mut raw = [0; 4];
        let exit = stack.dispatch(&mut env, OpCode::UNDI_OPEN, &mut raw);
        assert_eq!(exit, ExitCode::FAILURE);
        assert_eq!(status_of(&raw), Status::BAD_FUNC);
        assert_eq!(stack.undi().state(), UndiState::Uninitialized);
    }

    #[test]
    fn test_network_ops_require_open_device() {
        let (mut env, mut stack) = fresh_stack();

        let open = udp_param::UdpOpen {
            src_ip: CLIENT_IP,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UDP_OPEN, open);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNDI_INVALID_STATE);

        let (_, block) =
            call(&mut stack, &mut env, OpCode::TFTP_OPEN, tftp_param::TftpOpen::default());
        let status = block.status;
        assert_eq!(status, Status::UNDI_INVALID_STATE);

        // Closing is allowed regardless, and reports its own layer's state.
        let (_, block) =
            call(&mut stack, &mut env, OpCode::UDP_CLOSE, udp_param::UdpClose::default());
        let status = block.status;
        assert_eq!(status, Status::UDP_CLOSED);
    }

    #[test]
    fn test_udp_write_defaults_source_port() {
        let (mut env, mut stack) = open_stack();

        let open = udp_param::UdpOpen {
            src_ip: CLIENT_IP,
            ..Default::default()
        };
        let (exit, _) = call(&mut stack, &mut env, OpCode::UDP_OPEN, open);
        assert_eq!(exit, ExitCode::SUCCESS);

        let payload_at = plant_bytes(&mut env, 0, b"ping");
        let write = udp_param::UdpWrite {
            ip: Ipv4Address::BROADCAST,
            dst_port: UdpPort::new(4011),
            buffer_size: 4,
            buffer: payload_at,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UDP_WRITE, write);
        assert_eq!(exit, ExitCode::SUCCESS);
        let src_port = block.src_port;
        assert_eq!(src_port.value(), UDP_DEFAULT_SRC_PORT);

        let frame = &stack.undi().device().tx[0];
        assert_eq!(frame[..6], [0xff; 6]);
        assert_eq!(frame[34..36], UDP_DEFAULT_SRC_PORT.to_be_bytes());
        assert_eq!(frame[36..38], 4011u16.to_be_bytes());
        assert_eq!(&frame[42..46], b"ping");
    }

    #[test]
    fn test_udp_read_via_dispatch() {
        let (mut env, mut stack) = open_stack();

        let open = udp_param::UdpOpen {
            src_ip: CLIENT_IP,
            ..Default::default()
        };
        call(&mut stack, &mut env, OpCode::UDP_OPEN, open);

        // Nothing pending yet.
        let read = udp_param::UdpRead {
            buffer: SegOff16::new(ARENA_SEG, 0x200),
            buffer_size: 64,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UDP_READ, read);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::FAILURE);

        stack.undi_mut().device_mut().rx.push_back(udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            4011,
            2069,
            b"offer",
        ));
        let (exit, block) = call(&mut stack, &mut env, OpCode::UDP_READ, read);
        assert_eq!(exit, ExitCode::SUCCESS);
        let (src_ip, dest_ip) = (block.src_ip, block.dest_ip);
        let (src_port, dest_port) = (block.src_port, block.dest_port);
        let copied = block.buffer_size;
        assert_eq!(src_ip, SERVER_IP);
        assert_eq!(dest_ip, CLIENT_IP);
        assert_eq!(src_port.value(), 4011);
        assert_eq!(dest_port.value(), 2069);
        assert_eq!(copied, 5);
        let data = env.buffer(BufferAddr::SegOff(SegOff16::new(ARENA_SEG, 0x200)), 5).unwrap();
        assert_eq!(data, b"offer");
    }

    #[test]
    fn test_undi_transmit_assembles_media_header() {
        let (mut env, mut stack) = open_stack();

        let dest_at = plant_bytes(&mut env, 0, &SERVER_MAC);
        plant_bytes(&mut env, 0x10, b"hdr!");
        plant_bytes(&mut env, 0x20, b"payload-data");
        let mut scatter = [TransmitDataBlock::default(); undi_param::MAX_DATA_BLOCKS];
        scatter[0] = TransmitDataBlock {
            ptr_type: TD_PTR_SEGOFF,
            reserved: 0,
            data_len: 12,
            data_ptr: SegOff16::new(ARENA_SEG, 0x20),
        };
        let tbd = TransmitBlockDescriptor {
            immed_length: 4,
            xmit: SegOff16::new(ARENA_SEG, 0x10),
            data_blk_count: 1,
            data_blocks: scatter,
        };
        let tbd_at = plant(&mut env, 0x100, tbd);

        let xmit = undi_param::UndiTransmit {
            protocol: undi_param::P_IP,
            xmit_flag: undi_param::XMT_DESTADDR,
            dest_addr: dest_at,
            tbd: tbd_at,
            ..Default::default()
        };
        let (exit, _) = call(&mut stack, &mut env, OpCode::UNDI_TRANSMIT, xmit);
        assert_eq!(exit, ExitCode::SUCCESS);

        let frame = &stack.undi().device().tx[0];
        assert_eq!(frame.len(), eth::HEADER_LEN + 4 + 12);
        assert_eq!(frame[..6], SERVER_MAC);
        assert_eq!(frame[6..12], MockNic::STATION);
        assert_eq!(frame[12..14], eth::ETHERTYPE_IPV4.to_be_bytes());
        assert_eq!(&frame[14..18], b"hdr!");
        assert_eq!(&frame[18..], b"payload-data");
    }

    #[test]
    fn test_undi_transmit_raw_frame_and_overflow() {
        let (mut env, mut stack) = open_stack();

        let mut raw_frame = vec![0; eth::HEADER_LEN];
        eth::Header {
            dest: eth::BROADCAST,
            src: MockNic::STATION,
            ethertype: eth::ETHERTYPE_ARP,
        }
        .write(&mut raw_frame);
        raw_frame.extend_from_slice(b"who-has");
        let frame_at = plant_bytes(&mut env, 0x40, &raw_frame);

        let tbd = TransmitBlockDescriptor {
            immed_length: raw_frame.len() as u16,
            xmit: frame_at,
            ..Default::default()
        };
        let tbd_at = plant(&mut env, 0x100, tbd);

        let xmit = undi_param::UndiTransmit {
            protocol: undi_param::P_UNKNOWN,
            tbd: tbd_at,
            ..Default::default()
        };
        let (exit, _) = call(&mut stack, &mut env, OpCode::UNDI_TRANSMIT, xmit);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(stack.undi().device().tx[0], raw_frame);

        // A descriptor bigger than any frame is refused outright.
        let tbd = TransmitBlockDescriptor {
            immed_length: 2000,
            xmit: frame_at,
            ..Default::default()
        };
        let tbd_at = plant(&mut env, 0x100, tbd);
        let xmit = undi_param::UndiTransmit {
            protocol: undi_param::P_UNKNOWN,
            tbd: tbd_at,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_TRANSMIT, xmit);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNDI_INVALID_PARAMETER);
        assert_eq!(stack.undi().device().tx.len(), 1);
    }

    #[test]
    fn test_isr_flow_via_dispatch() {
        let (mut env, mut stack) = open_stack();
        let frame = udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            4011,
            2069,
            b"hello",
        );
        let frame_len = frame.len() as u16;
        stack.undi_mut().device_mut().rx.push_back(frame);
        stack.undi_mut().device_mut().irq_pending = true;

        let isr = undi_param::UndiIsr {
            func_flag: undi_param::ISR_IN_START,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_ISR, isr);
        assert_eq!(exit, ExitCode::SUCCESS);
        let func = block.func_flag;
        assert_eq!(func, undi_param::ISR_OUT_OURS);

        let isr = undi_param::UndiIsr {
            func_flag: undi_param::ISR_IN_PROCESS,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_ISR, isr);
        assert_eq!(exit, ExitCode::SUCCESS);
        let func = block.func_flag;
        let (chunk, full, header) = (block.buffer_length, block.frame_length, block.frame_header_length);
        let (window, prot, kind) = (block.frame, block.prot_type, block.pkt_type);
        assert_eq!(func, undi_param::ISR_OUT_RECEIVE);
        assert_eq!(chunk, frame_len);
        assert_eq!(full, frame_len);
        assert_eq!(header, eth::HEADER_LEN as u16);
        assert_eq!(prot, undi_param::P_IP);
        assert_eq!(kind, undi_param::PKT_TYPE_DIRECTED);
        assert!(!window.is_null());
        let copy = env
            .buffer(BufferAddr::SegOff(window), usize::from(chunk))
            .unwrap();
        assert_eq!(&copy[34..36], &4011u16.to_be_bytes());

        let isr = undi_param::UndiIsr {
            func_flag: undi_param::ISR_IN_GET_NEXT,
            ..Default::default()
        };
        let (_, block) = call(&mut stack, &mut env, OpCode::UNDI_ISR, isr);
        let func = block.func_flag;
        assert_eq!(func, undi_param::ISR_OUT_DONE);

        let isr = undi_param::UndiIsr {
            func_flag: 0x99,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_ISR, isr);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNDI_INVALID_PARAMETER);
    }

    #[test]
    fn test_get_information_reports_device_identity() {
        let (mut env, mut stack) = open_stack();
        let (exit, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_GET_INFORMATION,
            undi_param::UndiGetInformation::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        let info = stack.undi().device().info();
        let (base_io, irq, mtu) = (block.base_io, block.int_number, block.max_tran_unit);
        let (hw_type, hw_len) = (block.hw_type, block.hw_addr_len);
        let station = block.current_node_address;
        assert_eq!(base_io, info.base_io);
        assert_eq!(irq, u16::from(info.irq));
        assert_eq!(mtu, info.mtu);
        assert_eq!(hw_type, undi_param::HW_ETHERNET);
        assert_eq!(hw_len, 6);
        assert_eq!(station.ethernet(), MockNic::STATION);

        let (exit, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_GET_NIC_TYPE,
            undi_param::UndiGetNicType::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        let nic_type = block.nic_type;
        assert_eq!(nic_type, undi_param::NIC_TYPE_PCI);
        let pci = unsafe { block.info.pci };
        let BusIdentity::Pci { vendor_id, device_id, .. } = info.bus else {
            panic!("mock device reports pci");
        };
        let (got_vendor, got_device) = (pci.vendor_id, pci.dev_id);
        assert_eq!(got_vendor, vendor_id);
        assert_eq!(got_device, device_id);

        let (exit, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_GET_IFACE_INFO,
            undi_param::UndiGetIfaceInfo::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        let iface = block.iface_type;
        let speed = block.link_speed;
        let flags = block.service_flags;
        assert_eq!(&iface[..9], b"DIX+802.3");
        assert_eq!(speed, info.link_speed_mbps * 1_000_000);
        assert!(flags.contains(ServiceFlags::BROADCAST | ServiceFlags::MULTICAST));
    }

    #[test]
    fn test_get_mcast_address_maps_group() {
        let (mut env, mut stack) = fresh_stack();
        let query = undi_param::UndiGetMcastAddress {
            inet_addr: Ipv4Address([224, 1, 2, 3]),
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_GET_MCAST_ADDRESS, query);
        assert_eq!(exit, ExitCode::SUCCESS);
        let media = block.media_addr;
        assert_eq!(media.ethernet(), [0x01, 0x00, 0x5e, 1, 2, 3]);

        let query = undi_param::UndiGetMcastAddress {
            inet_addr: Ipv4Address([192, 168, 0, 1]),
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UNDI_GET_MCAST_ADDRESS, query);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNDI_INVALID_PARAMETER);
    }

    #[test]
    fn test_get_cached_info_query_and_copy() {
        let (mut env, mut stack) = fresh_stack();

        let query = preboot::GetCachedInfo {
            packet_type: preboot::PACKET_TYPE_CACHED_REPLY,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::GET_CACHED_INFO, query);
        assert_eq!(exit, ExitCode::SUCCESS);
        let (size, limit) = (block.buffer_size, block.buffer_limit);
        assert_eq!(usize::from(size), size_of::<BootPacket>());
        assert_eq!(limit, size);

        let copy = preboot::GetCachedInfo {
            packet_type: preboot::PACKET_TYPE_CACHED_REPLY,
            buffer: SegOff16::new(ARENA_SEG, 0x400),
            buffer_size: size,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::GET_CACHED_INFO, copy);
        assert_eq!(exit, ExitCode::SUCCESS);
        let copied = block.buffer_size;
        assert_eq!(copied, size);
        let head = env
            .buffer(BufferAddr::SegOff(SegOff16::new(ARENA_SEG, 0x400)), 8)
            .unwrap();
        assert_eq!(head[0], BOOTP_REPLY);

        // An undersized buffer is refused, but the limit still tells the
        // caller what to allocate.
        let short = preboot::GetCachedInfo {
            packet_type: preboot::PACKET_TYPE_CACHED_REPLY,
            buffer: SegOff16::new(ARENA_SEG, 0x400),
            buffer_size: 8,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::GET_CACHED_INFO, short);
        assert_eq!(exit, ExitCode::FAILURE);
        let (status, limit) = (block.status, block.buffer_limit);
        assert_eq!(status, Status::OUT_OF_RESOURCES);
        assert_eq!(limit, size);

        let bad = preboot::GetCachedInfo {
            packet_type: 9,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::GET_CACHED_INFO, bad);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNSUPPORTED);
    }

    #[test]
    fn test_tftp_session_via_dispatch() {
        let (mut env, mut stack) = open_stack();
        let tid = 3001;
        // Consumed while the request write resolves the server.
        stack
            .undi_mut()
            .device_mut()
            .rx
            .push_back(arp_announcement(SERVER_MAC, SERVER_IP));
        stack.undi_mut().device_mut().rx.push_back(udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            tid,
            crate::config::TFTP_CLIENT_PORT_BASE,
            b"\x00\x06blksize\0512\0",
        ));

        let open = tftp_param::TftpOpen {
            server_ip: SERVER_IP,
            file_name: file_name_field(b"boot/pxe.0\0"),
            packet_size: 512,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::TFTP_OPEN, open);
        assert_eq!(exit, ExitCode::SUCCESS);
        let negotiated = block.packet_size;
        assert_eq!(negotiated, 512);
        assert!(stack.tftp().is_open());
        // The endpoint came up from the cached acknowledgement.
        assert_eq!(stack.udp().bound_ip(), Some(CLIENT_IP));

        let mut data = vec![0, 3, 0, 1];
        data.extend_from_slice(&[0x5a; 200]);
        stack.undi_mut().device_mut().rx.push_back(udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            tid,
            crate::config::TFTP_CLIENT_PORT_BASE,
            &data,
        ));
        let read = tftp_param::TftpRead {
            buffer: SegOff16::new(ARENA_SEG, 0x800),
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::TFTP_READ, read);
        assert_eq!(exit, ExitCode::SUCCESS);
        let (number, len) = (block.packet_number, block.buffer_size);
        assert_eq!(number, 1);
        assert_eq!(len, 200);
        let delivered = env
            .buffer(BufferAddr::SegOff(SegOff16::new(ARENA_SEG, 0x800)), 200)
            .unwrap();
        assert!(delivered.iter().all(|&b| b == 0x5a));

        let (exit, _) =
            call(&mut stack, &mut env, OpCode::TFTP_CLOSE, tftp_param::TftpClose::default());
        assert_eq!(exit, ExitCode::SUCCESS);
        assert!(!stack.tftp().is_open());
    }

    #[test]
    fn test_unload_stack_partition() {
        let (mut env, mut stack) = fresh_stack();
        let (exit, _) = call(
            &mut stack,
            &mut env,
            OpCode::UNLOAD_STACK,
            preboot::UnloadStack::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);

        // Only the device group answers once the stack is unloaded.
        let open = udp_param::UdpOpen {
            src_ip: CLIENT_IP,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::UDP_OPEN, open);
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::UNSUPPORTED);
        let (exit, _) = call(
            &mut stack,
            &mut env,
            OpCode::UNDI_STARTUP,
            undi_param::UndiStartup::default(),
        );
        assert_eq!(exit, ExitCode::SUCCESS);

        let (mut env, mut stack) = open_stack();
        let (exit, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNLOAD_STACK,
            preboot::UnloadStack::default(),
        );
        assert_eq!(exit, ExitCode::FAILURE);
        let status = block.status;
        assert_eq!(status, Status::KEEP_UNDI);

        let open = udp_param::UdpOpen {
            src_ip: CLIENT_IP,
            ..Default::default()
        };
        call(&mut stack, &mut env, OpCode::UDP_OPEN, open);
        let (_, block) = call(
            &mut stack,
            &mut env,
            OpCode::UNLOAD_STACK,
            preboot::UnloadStack::default(),
        );
        let status = block.status;
        assert_eq!(status, Status::KEEP_ALL);
    }

    #[test]
    fn test_read_file_via_dispatch() {
        let (mut env, mut stack) = open_stack();
        let tid = 4101;
        let base_port = crate::config::TFTP_CLIENT_PORT_BASE;

        // ARP answer, then an OACK for the max block size and one short
        // data block, delivered against the unicast leg of the whole-file
        // path.
        stack
            .undi_mut()
            .device_mut()
            .rx
            .push_back(arp_announcement(SERVER_MAC, SERVER_IP));
        stack.undi_mut().device_mut().rx.push_back(udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            tid,
            base_port,
            b"\x00\x06blksize\01468\0",
        ));
        let mut data = vec![0, 3, 0, 1];
        data.extend_from_slice(&[0x77; 300]);
        stack.undi_mut().device_mut().rx.push_back(udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            tid,
            base_port,
            &data,
        ));

        let request = tftp_param::TftpReadFile {
            file_name: file_name_field(b"kernel\0"),
            server_ip: SERVER_IP,
            buffer: Addr32(MockEnv::ARENA_BASE + 0x1000),
            buffer_size: 4096,
            ..Default::default()
        };
        let (exit, block) = call(&mut stack, &mut env, OpCode::TFTP_READ_FILE, request);
        assert_eq!(exit, ExitCode::SUCCESS);
        let total = block.buffer_size;
        assert_eq!(total, 300);
        assert!(!stack.tftp().is_open());
        let body = env
            .buffer(BufferAddr::Linear(Addr32(MockEnv::ARENA_BASE + 0x1000)), 300)
            .unwrap();
        assert!(body.iter().all(|&b| b == 0x77));
    }
}
