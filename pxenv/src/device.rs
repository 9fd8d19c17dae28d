// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hardware seam: the network interface driver.
//!
//! Provides a packet level interface to a network adapter. The engine is
//! driver-agnostic; a port implements [`NetDevice`] for its hardware and
//! hands it to [`UndiController`], which layers the receive-filter and
//! state-machine semantics on top.
//!
//! [`UndiController`]: crate::UndiController

use pxenv_raw::MacAddress;

/// Failure reported by a [`NetDevice`] operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceError {
    /// No transmit resource is free right now; the caller may retry.
    Busy,
    /// The operation failed and retrying will not help.
    Failed,
}

/// Bus identity of the adapter, as reported to `UNDI_GET_NIC_TYPE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusIdentity {
    /// PCI configuration-space identity.
    Pci {
        /// Vendor ID from configuration space.
        vendor_id: u16,
        /// Device ID from configuration space.
        device_id: u16,
        /// Base class code.
        base_class: u8,
        /// Sub-class code.
        sub_class: u8,
        /// Programming interface code.
        prog_intf: u8,
        /// Revision ID.
        rev: u8,
        /// Encoded bus/device/function number.
        bus_dev_func: u16,
        /// Subsystem vendor ID.
        sub_vendor_id: u16,
        /// Subsystem device ID.
        sub_device_id: u16,
    },
    /// Plug-and-Play identity.
    Pnp {
        /// Compressed EISA device ID.
        eisa_dev_id: u32,
        /// Base class code.
        base_class: u8,
        /// Sub-class code.
        sub_class: u8,
        /// Programming interface code.
        prog_intf: u8,
        /// Card select number assigned during isolation.
        card_sel_num: u16,
    },
}

/// Static identity of the adapter, reported once by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Largest link-layer payload the adapter can carry.
    pub mtu: u16,
    /// I/O base address.
    pub base_io: u16,
    /// Interrupt line the adapter is wired to, or zero if polled only.
    pub irq: u8,
    /// Receive buffers the adapter has available.
    pub rx_buffer_count: u16,
    /// Transmit buffers the adapter has available.
    pub tx_buffer_count: u16,
    /// Link speed in megabits per second.
    pub link_speed_mbps: u32,
    /// Bus identity.
    pub bus: BusIdentity,
}

/// A network adapter driver.
///
/// One fully-formed link-layer frame per transmit call; one pending frame
/// per receive poll. The driver does no address filtering beyond what the
/// hardware forces on it; filter decisions belong to the controller above.
pub trait NetDevice {
    /// The factory-programmed station address.
    #[must_use]
    fn permanent_address(&self) -> MacAddress;

    /// Static adapter identity.
    #[must_use]
    fn info(&self) -> DeviceInfo;

    /// Bring the adapter to a freshly-initialized state.
    fn reset(&mut self) -> core::result::Result<(), DeviceError>;

    /// Queue one frame for transmission.
    ///
    /// Returns once the frame is owned by the hardware, not once it is on
    /// the wire. [`DeviceError::Busy`] means no transmit resource was
    /// free; the controller retries those.
    fn transmit(&mut self, frame: &[u8]) -> core::result::Result<(), DeviceError>;

    /// Copy one pending received frame into `buf`.
    ///
    /// Returns the frame length, or `None` if nothing is pending. Frames
    /// longer than `buf` are truncated to it.
    fn poll_receive(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Whether the adapter raised the interrupt being serviced.
    ///
    /// Reading the answer acknowledges the interrupt at the device.
    fn interrupt_pending(&mut self) -> bool;
}
