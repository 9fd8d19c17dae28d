// SPDX-License-Identifier: MIT OR Apache-2.0

//! UNDI device layer.
//!
//! Owns the interface lifecycle, the receive-filter state, and the live
//! frame counters. Every frame that reaches an upper layer goes through
//! [`UndiController::poll_frame`] or the interrupt-service path, and both
//! consult the same filter decision, so poll-mode and interrupt-mode
//! callers observe identical acceptance behavior.

use crate::config::{MAX_FRAME_LEN, TX_BUSY_RETRIES};
use crate::device::{DeviceError, DeviceInfo, NetDevice};
use crate::net::eth;
use crate::{Result, Status};
use log::{debug, trace, warn};
use pxenv_raw::MacAddress;
use pxenv_raw::param::undi::{
    MAXNUM_MCADDR, McastAddressList, P_ARP, P_IP, P_RARP, P_UNKNOWN, PKT_TYPE_BROADCAST,
    PKT_TYPE_DIRECTED, PKT_TYPE_MULTICAST, ReceiveFilters,
};

/// Lifecycle state of the network interface.
///
/// Transitions run strictly forward through the boot sequence and
/// strictly backward through teardown; skipping a step is a sequencing
/// error, never a silent success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndiState {
    /// No driver context exists.
    Uninitialized,
    /// Driver context established, hardware untouched.
    Started,
    /// Hardware prepared; not yet receiving.
    Initialized,
    /// Receiving with the configured filters.
    Open,
    /// Receiving stopped; hardware still prepared.
    Closed,
    /// Hardware quiesced; only cleanup is legal.
    Shutdown,
}

/// Live frame counters, as reported by the statistics call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames handed to the hardware without error.
    pub tx_good: u32,
    /// Received frames accepted by the filters.
    pub rx_good: u32,
    /// Received frames discarded for CRC or alignment errors.
    pub rx_crc_errors: u32,
    /// Received frames discarded for want of buffer space.
    pub rx_resource_errors: u32,
}

/// Identity snapshot for the get-information call.
#[derive(Clone, Copy, Debug)]
pub struct NicInformation {
    /// Static adapter identity from the driver.
    pub device: DeviceInfo,
    /// Station address currently in effect.
    pub station: MacAddress,
    /// Factory-programmed station address.
    pub permanent: MacAddress,
}

/// Outcome of one interrupt-service step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsrEvent {
    /// Nothing left to service.
    Done,
    /// A transmit completed since the last service pass.
    Transmit,
    /// One chunk of a received frame was copied into the service window.
    Receive {
        /// Bytes placed in the window by this step.
        chunk_len: u16,
        /// Total length of the frame being delivered.
        frame_len: u16,
        /// Link-layer header length within the frame.
        header_len: u16,
        /// Protocol classification (`P_IP` and friends).
        protocol: u8,
        /// Destination classification (`PKT_TYPE_*`).
        kind: u8,
    },
}

/// A received frame being delivered chunk-by-chunk to the ISR caller.
struct IsrFrame {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
    taken: usize,
    protocol: u8,
    kind: u8,
}

impl IsrFrame {
    const fn empty() -> Self {
        Self {
            buf: [0; MAX_FRAME_LEN],
            len: 0,
            taken: 0,
            protocol: P_UNKNOWN,
            kind: PKT_TYPE_DIRECTED,
        }
    }
}

/// The UNDI device layer: one network interface behind a state machine.
pub struct UndiController<D> {
    device: D,
    state: UndiState,
    station: MacAddress,
    filters: ReceiveFilters,
    mcast: [MacAddress; MAXNUM_MCADDR],
    mcast_len: usize,
    stats: LinkStats,
    tx_interrupt: bool,
    isr: IsrFrame,
}

impl<D: NetDevice> UndiController<D> {
    /// Wrap a driver; the interface starts out [`UndiState::Uninitialized`].
    pub fn new(device: D) -> Self {
        let station = device.permanent_address();
        Self {
            device,
            state: UndiState::Uninitialized,
            station,
            filters: ReceiveFilters::empty(),
            mcast: [MacAddress([0; 16]); MAXNUM_MCADDR],
            mcast_len: 0,
            stats: LinkStats::default(),
            tx_interrupt: false,
            isr: IsrFrame::empty(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> UndiState {
        self.state
    }

    /// Station address currently in effect.
    #[must_use]
    pub const fn station_address(&self) -> MacAddress {
        self.station
    }

    /// Receive filters currently in effect.
    #[must_use]
    pub const fn receive_filters(&self) -> ReceiveFilters {
        self.filters
    }

    /// Access the underlying driver.
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying driver.
    pub const fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn transition(&mut self, to: UndiState) {
        debug!("undi: {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    fn expect_state(&self, legal: &[UndiState]) -> Result {
        if legal.contains(&self.state) {
            Ok(())
        } else {
            Err(Status::UNDI_INVALID_STATE.into())
        }
    }

    /// Establish the driver context.
    pub fn startup(&mut self) -> Result {
        self.expect_state(&[UndiState::Uninitialized])?;
        self.transition(UndiState::Started);
        Ok(())
    }

    /// Release the driver context established by [`startup`].
    ///
    /// [`startup`]: Self::startup
    pub fn cleanup(&mut self) -> Result {
        self.expect_state(&[UndiState::Started, UndiState::Shutdown])?;
        self.transition(UndiState::Uninitialized);
        Ok(())
    }

    /// Prepare the hardware for use.
    pub fn initialize(&mut self) -> Result {
        self.expect_state(&[UndiState::Started])?;
        if self.device.reset().is_err() {
            warn!("undi: adapter failed to initialize");
            return Err(Status::OUT_OF_RESOURCES.into());
        }
        self.station = self.device.permanent_address();
        self.transition(UndiState::Initialized);
        Ok(())
    }

    /// Reset the adapter in place, reapplying `mcast` and discarding any
    /// transient receive state.
    pub fn reset_adapter(&mut self, mcast: &McastAddressList) -> Result {
        self.expect_state(&[UndiState::Open])?;
        if self.device.reset().is_err() {
            warn!("undi: adapter failed to reset");
            return Err(Status::UNDI_CANNOT_INITIALIZE_ADAPTER.into());
        }
        self.copy_mcast(mcast)?;
        self.tx_interrupt = false;
        self.isr.len = 0;
        self.isr.taken = 0;
        Ok(())
    }

    /// Quiesce the hardware.
    pub fn shutdown(&mut self) -> Result {
        self.expect_state(&[UndiState::Initialized, UndiState::Closed])?;
        self.transition(UndiState::Shutdown);
        Ok(())
    }

    /// Start receiving with the given filters and multicast list.
    pub fn open(&mut self, filters: ReceiveFilters, mcast: &McastAddressList) -> Result {
        self.expect_state(&[UndiState::Initialized, UndiState::Closed])?;
        self.copy_mcast(mcast)?;
        self.filters = filters;
        self.transition(UndiState::Open);
        Ok(())
    }

    /// Stop receiving.
    pub fn close(&mut self) -> Result {
        self.expect_state(&[UndiState::Open])?;
        self.tx_interrupt = false;
        self.isr.len = 0;
        self.isr.taken = 0;
        self.transition(UndiState::Closed);
        Ok(())
    }

    /// Replace the station address.
    pub fn set_station_address(&mut self, address: MacAddress) -> Result {
        self.expect_state(&[UndiState::Open])?;
        self.station = address;
        Ok(())
    }

    /// Replace the multicast reception list.
    pub fn set_multicast(&mut self, mcast: &McastAddressList) -> Result {
        self.expect_state(&[UndiState::Open])?;
        self.copy_mcast(mcast)
    }

    /// Replace the receive filters.
    pub fn set_packet_filter(&mut self, filters: ReceiveFilters) -> Result {
        self.expect_state(&[UndiState::Open])?;
        self.filters = filters;
        Ok(())
    }

    /// Add one address to the multicast reception list.
    pub fn join_multicast(&mut self, address: MacAddress) -> Result {
        self.expect_state(&[UndiState::Open])?;
        if self.mcast[..self.mcast_len].contains(&address) {
            return Ok(());
        }
        if self.mcast_len == MAXNUM_MCADDR {
            return Err(Status::OUT_OF_RESOURCES.into());
        }
        self.mcast[self.mcast_len] = address;
        self.mcast_len += 1;
        Ok(())
    }

    /// Remove one address from the multicast reception list.
    pub fn leave_multicast(&mut self, address: MacAddress) {
        if let Some(pos) = self.mcast[..self.mcast_len].iter().position(|m| *m == address) {
            self.mcast.copy_within(pos + 1..self.mcast_len, pos);
            self.mcast_len -= 1;
        }
    }

    fn copy_mcast(&mut self, list: &McastAddressList) -> Result {
        let count = usize::from(list.count);
        if count > MAXNUM_MCADDR {
            return Err(Status::UNDI_INVALID_PARAMETER.into());
        }
        self.mcast[..count].copy_from_slice(&list.addrs[..count]);
        self.mcast_len = count;
        Ok(())
    }

    /// Identity snapshot; legal once the driver context exists.
    pub fn information(&self) -> Result<NicInformation> {
        self.expect_state(&[
            UndiState::Started,
            UndiState::Initialized,
            UndiState::Open,
            UndiState::Closed,
        ])?;
        Ok(NicInformation {
            device: self.device.info(),
            station: self.station,
            permanent: self.device.permanent_address(),
        })
    }

    /// Counter snapshot; legal once the hardware is prepared.
    pub fn statistics(&self) -> Result<LinkStats> {
        self.expect_state(&[UndiState::Initialized, UndiState::Open, UndiState::Closed])?;
        Ok(self.stats)
    }

    /// Zero all counters.
    pub fn clear_statistics(&mut self) -> Result {
        self.expect_state(&[UndiState::Initialized, UndiState::Open, UndiState::Closed])?;
        self.stats = LinkStats::default();
        Ok(())
    }

    /// Queue one fully-formed frame for transmission.
    ///
    /// Busy devices are retried up to [`TX_BUSY_RETRIES`] times before
    /// the attempt is surfaced as a transmit error.
    pub fn transmit_frame(&mut self, frame: &[u8]) -> Result {
        self.expect_state(&[UndiState::Open])?;
        if frame.len() > MAX_FRAME_LEN {
            return Err(Status::UNDI_INVALID_PARAMETER.into());
        }
        let mut tries = 0;
        loop {
            match self.device.transmit(frame) {
                Ok(()) => {
                    trace!("undi: transmitted {} bytes", frame.len());
                    self.stats.tx_good = self.stats.tx_good.wrapping_add(1);
                    self.tx_interrupt = true;
                    return Ok(());
                }
                Err(DeviceError::Busy) if tries < TX_BUSY_RETRIES => tries += 1,
                Err(err) => {
                    warn!("undi: transmit failed: {err:?}");
                    return Err(Status::UNDI_TRANSMIT_ERROR.into());
                }
            }
        }
    }

    /// Poll for one received frame that passes the filters.
    ///
    /// A frame the filters reject is dropped and reported as nothing
    /// available; the caller polls again for whatever is behind it.
    /// Returns the frame length, or `None` if no acceptable frame is
    /// pending.
    pub fn poll_frame(&mut self, buf: &mut [u8]) -> Option<usize> {
        if self.state != UndiState::Open {
            return None;
        }
        let len = self.device.poll_receive(buf)?;
        let (header, _) = eth::Header::parse(&buf[..len])?;
        if !self.accepts(&header.dest) {
            trace!("undi: dropped frame for {:02x?}", header.dest);
            return None;
        }
        self.stats.rx_good = self.stats.rx_good.wrapping_add(1);
        Some(len)
    }

    fn accepts(&self, dest: &[u8; 6]) -> bool {
        if self.filters.contains(ReceiveFilters::PROMISCUOUS) {
            return true;
        }
        if *dest == eth::BROADCAST {
            return self.filters.contains(ReceiveFilters::BROADCAST);
        }
        if dest[0] & 0x01 != 0 {
            return self.mcast[..self.mcast_len].iter().any(|m| m.ethernet() == *dest);
        }
        self.filters.contains(ReceiveFilters::DIRECTED) && *dest == self.station.ethernet()
    }

    /// Answer the "is this our interrupt" probe of the service protocol.
    pub fn isr_ours(&mut self) -> Result<bool> {
        self.expect_state(&[UndiState::Open])?;
        Ok(self.device.interrupt_pending())
    }

    /// Begin an interrupt-service pass.
    ///
    /// Reports a completed transmit first, then received frames, then
    /// done; the caller iterates with [`isr_get_next`] until
    /// [`IsrEvent::Done`].
    ///
    /// [`isr_get_next`]: Self::isr_get_next
    pub fn isr_process(&mut self, window: &mut [u8]) -> Result<IsrEvent> {
        self.expect_state(&[UndiState::Open])?;
        if self.tx_interrupt {
            self.tx_interrupt = false;
            return Ok(IsrEvent::Transmit);
        }
        Ok(self.isr_fetch(window))
    }

    /// Continue an interrupt-service pass.
    pub fn isr_get_next(&mut self, window: &mut [u8]) -> Result<IsrEvent> {
        self.expect_state(&[UndiState::Open])?;
        if self.isr.taken < self.isr.len {
            return Ok(self.isr_chunk(window));
        }
        Ok(self.isr_fetch(window))
    }

    fn isr_fetch(&mut self, window: &mut [u8]) -> IsrEvent {
        while let Some(len) = self.device.poll_receive(&mut self.isr.buf) {
            let Some((header, _)) = eth::Header::parse(&self.isr.buf[..len]) else {
                continue;
            };
            if !self.accepts(&header.dest) {
                trace!("undi: dropped frame for {:02x?}", header.dest);
                continue;
            }
            self.stats.rx_good = self.stats.rx_good.wrapping_add(1);
            self.isr.len = len;
            self.isr.taken = 0;
            self.isr.protocol = protocol_of(header.ethertype);
            self.isr.kind = kind_of(&header.dest);
            return self.isr_chunk(window);
        }
        IsrEvent::Done
    }

    fn isr_chunk(&mut self, window: &mut [u8]) -> IsrEvent {
        let n = (self.isr.len - self.isr.taken).min(window.len());
        window[..n].copy_from_slice(&self.isr.buf[self.isr.taken..self.isr.taken + n]);
        self.isr.taken += n;
        IsrEvent::Receive {
            chunk_len: n as u16,
            frame_len: self.isr.len as u16,
            header_len: eth::HEADER_LEN as u16,
            protocol: self.isr.protocol,
            kind: self.isr.kind,
        }
    }
}

impl<D: core::fmt::Debug> core::fmt::Debug for UndiController<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UndiController")
            .field("device", &self.device)
            .field("state", &self.state)
            .field("station", &self.station)
            .field("filters", &self.filters)
            .field("stats", &self.stats)
            .finish()
    }
}

fn protocol_of(ethertype: u16) -> u8 {
    match ethertype {
        eth::ETHERTYPE_IPV4 => P_IP,
        eth::ETHERTYPE_ARP => P_ARP,
        eth::ETHERTYPE_RARP => P_RARP,
        _ => P_UNKNOWN,
    }
}

fn kind_of(dest: &[u8; 6]) -> u8 {
    if *dest == eth::BROADCAST {
        PKT_TYPE_BROADCAST
    } else if dest[0] & 0x01 != 0 {
        PKT_TYPE_MULTICAST
    } else {
        PKT_TYPE_DIRECTED
    }
}
