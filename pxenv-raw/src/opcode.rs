// SPDX-License-Identifier: MIT OR Apache-2.0

//! API operation codes.

newtype_enum! {
/// Operation code selecting which API call a parameter block belongs to.
///
/// The opcode space is flat but grouped by subsystem: `0x00xx` device-layer
/// calls, `0x002x` TFTP, `0x003x` UDP, `0x007x` preboot/stack management.
/// Values not listed here are valid to carry; the dispatcher answers them
/// with [`Status::UNSUPPORTED`].
///
/// [`Status::UNSUPPORTED`]: crate::Status::UNSUPPORTED
pub enum OpCode: u16 => {
    /// Bring the device layer out of reset with loader register state.
    START_UNDI              = 0x0000,
    /// First call after load; prepares the device layer for use.
    UNDI_STARTUP            = 0x0001,
    /// Tear down whatever [`UNDI_STARTUP`] set up.
    ///
    /// [`UNDI_STARTUP`]: Self::UNDI_STARTUP
    UNDI_CLEANUP            = 0x0002,
    /// Initialize the adapter hardware.
    UNDI_INITIALIZE         = 0x0003,
    /// Reset the adapter, reprogramming the multicast list.
    UNDI_RESET_ADAPTER      = 0x0004,
    /// Stop the adapter hardware.
    UNDI_SHUTDOWN           = 0x0005,
    /// Open the adapter for traffic with a receive filter.
    UNDI_OPEN               = 0x0006,
    /// Close the adapter for traffic.
    UNDI_CLOSE              = 0x0007,
    /// Transmit one frame described by a transmit block descriptor.
    UNDI_TRANSMIT           = 0x0008,
    /// Replace the multicast reception list.
    UNDI_SET_MCAST_ADDRESS  = 0x0009,
    /// Override the station (unicast) address.
    UNDI_SET_STATION_ADDRESS = 0x000a,
    /// Replace the receive filter mask.
    UNDI_SET_PACKET_FILTER  = 0x000b,
    /// Report adapter addresses, MTU and buffer geometry.
    UNDI_GET_INFORMATION    = 0x000c,
    /// Report transmit/receive counters.
    UNDI_GET_STATISTICS     = 0x000d,
    /// Zero the transmit/receive counters.
    UNDI_CLEAR_STATISTICS   = 0x000e,
    /// Run adapter self-diagnostics.
    UNDI_INITIATE_DIAGS     = 0x000f,
    /// Force the adapter to raise an interrupt.
    UNDI_FORCE_INTERRUPT    = 0x0010,
    /// Map an IP multicast address to its media address.
    UNDI_GET_MCAST_ADDRESS  = 0x0011,
    /// Report the adapter's bus identity.
    UNDI_GET_NIC_TYPE       = 0x0012,
    /// Report the interface type and service flags.
    UNDI_GET_IFACE_INFO     = 0x0013,
    /// Interrupt service: claim interrupts and drain received frames.
    UNDI_ISR                = 0x0014,
    /// Undo [`START_UNDI`].
    ///
    /// Shares its value with the legacy get-state call; see
    /// [`OpCode::UNDI_GET_STATE`].
    ///
    /// [`START_UNDI`]: Self::START_UNDI
    STOP_UNDI               = 0x0015,

    /// Open a TFTP session and negotiate the block size.
    TFTP_OPEN               = 0x0020,
    /// Close the TFTP session.
    TFTP_CLOSE              = 0x0021,
    /// Read the next block of the open session.
    TFTP_READ               = 0x0022,
    /// Download a whole file into one caller buffer.
    TFTP_READ_FILE          = 0x0023,
    /// Query a file's size without transferring it.
    TFTP_GET_FSIZE          = 0x0025,

    /// Bind the UDP endpoint to a source address.
    UDP_OPEN                = 0x0030,
    /// Release the UDP endpoint.
    UDP_CLOSE               = 0x0031,
    /// Receive one datagram matching the caller's filters.
    UDP_READ                = 0x0032,
    /// Send one datagram.
    UDP_WRITE               = 0x0033,

    /// Ask the stack to remove itself from memory.
    UNLOAD_STACK            = 0x0070,
    /// Copy one of the cached boot negotiation packets to the caller.
    GET_CACHED_INFO         = 0x0071,
    /// Download a new boot file and hand control to it.
    RESTART_TFTP            = 0x0073,
    /// Start the base code (not offered by this stack).
    START_BASE              = 0x0075,
    /// Stop the base code.
    STOP_BASE               = 0x0076,
}}

impl OpCode {
    /// Legacy query for the device layer's state.
    ///
    /// The numbering assigns this call the same value as [`STOP_UNDI`]; the
    /// two cannot be told apart on the wire, and stacks route the value to
    /// stop. Kept as a named constant so intent shows up at call sites.
    ///
    /// [`STOP_UNDI`]: Self::STOP_UNDI
    pub const UNDI_GET_STATE: OpCode = OpCode(0x0015);
}
