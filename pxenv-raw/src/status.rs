// SPDX-License-Identifier: MIT OR Apache-2.0

//! PXENV status codes and the two-valued exit code.

use core::fmt::Debug;

newtype_enum! {
/// Status code written into the first field of every parameter block.
///
/// Exactly one status is produced per API call. [`Status::SUCCESS`] is the
/// only value that means "no error"; everything else is a categorized
/// failure. The numbering groups codes by the subsystem that produces them,
/// matching the assignments of the preboot API specification.
#[must_use]
pub enum Status: u16 => {
    /// The call completed without error.
    SUCCESS             = 0x0000,
    /// Generic failure with no more specific cause available.
    FAILURE             = 0x0001,
    /// The parameter block does not match the opcode's contract.
    BAD_FUNC            = 0x0002,
    /// The opcode is known but not offered by this stack.
    UNSUPPORTED         = 0x0003,
    /// Unload refused; the device layer must stay resident.
    KEEP_UNDI           = 0x0004,
    /// Unload refused; the whole stack must stay resident.
    KEEP_ALL            = 0x0005,
    /// A resource (session slot, transmit slot, buffer space) ran out.
    OUT_OF_RESOURCES    = 0x0006,

    /// Link-layer address resolution did not complete in time.
    ARP_TIMEOUT         = 0x0011,

    /// The UDP endpoint is not open.
    UDP_CLOSED          = 0x0018,
    /// The UDP endpoint is already open.
    UDP_OPEN            = 0x0019,
    /// No TFTP session is open, or the session no longer accepts data.
    TFTP_CLOSED         = 0x001a,
    /// A TFTP session is already open.
    TFTP_OPEN           = 0x001b,

    /// A caller buffer could not be resolved or written.
    MCOPY_PROBLEM       = 0x0020,
    /// Boot integrity services subsystem failure.
    BIS_INTEGRITY_FAILURE   = 0x0021,
    /// Boot integrity services validation failure.
    BIS_VALIDATE_FAILURE    = 0x0022,
    /// Boot integrity services could not initialize.
    BIS_INIT_FAILURE        = 0x0023,
    /// Boot integrity services could not shut down.
    BIS_SHUTDOWN_FAILURE    = 0x0024,
    /// Boot integrity services could not get the boot-object authorization.
    BIS_GBOA_FAILURE        = 0x0025,
    /// Boot integrity services could not free resources.
    BIS_FREE_FAILURE        = 0x0026,
    /// Boot integrity services could not get signature information.
    BIS_GSI_FAILURE         = 0x0027,
    /// Boot integrity services checksum mismatch.
    BIS_BAD_CKSUM           = 0x0028,

    /// The TFTP server's address could not be resolved.
    TFTP_CANNOT_ARP_ADDRESS     = 0x0030,
    /// No reply to the read request within the open timeout.
    TFTP_OPEN_TIMEOUT           = 0x0032,
    /// The peer sent a packet with an opcode this client does not know.
    TFTP_UNKNOWN_OPCODE         = 0x0033,
    /// No data block arrived within the read timeout.
    TFTP_READ_TIMEOUT           = 0x0035,
    /// The peer answered with a TFTP error packet.
    TFTP_ERROR_OPCODE           = 0x0036,
    /// The transfer could not be established.
    TFTP_CANNOT_OPEN_CONNECTION = 0x0038,
    /// The established transfer broke down.
    TFTP_CANNOT_READ_FROM_CONNECTION = 0x0039,
    /// More data arrived than the transfer can accept.
    TFTP_TOO_MANY_PACKAGES      = 0x003a,
    /// The server reported that the file does not exist.
    TFTP_FILE_NOT_FOUND         = 0x003b,
    /// The server refused access to the file.
    TFTP_ACCESS_VIOLATION       = 0x003c,
    /// No multicast address is available for the transfer.
    TFTP_NO_MCAST_ADDRESS       = 0x003d,
    /// The server did not report a file size.
    TFTP_NO_FILESIZE            = 0x003e,
    /// The requested packet size is outside the permitted range.
    TFTP_INVALID_PACKET_SIZE    = 0x003f,

    /// No DHCP response within the timeout.
    DHCP_TIMEOUT            = 0x0051,
    /// DHCP did not yield an IP address.
    DHCP_NO_IP_ADDRESS      = 0x0052,
    /// DHCP did not yield a boot file name.
    DHCP_NO_BOOTFILE_NAME   = 0x0053,
    /// DHCP yielded an unusable IP address.
    DHCP_BAD_IP_ADDRESS     = 0x0054,

    /// The device layer was asked for an operation it does not define.
    UNDI_INVALID_FUNCTION           = 0x0060,
    /// The interface failed its media test.
    UNDI_MEDIATEST_FAILED           = 0x0061,
    /// The interface could not be configured for multicast reception.
    UNDI_CANNOT_INIT_NIC_FOR_MCAST  = 0x0062,
    /// The adapter could not be initialized.
    UNDI_CANNOT_INITIALIZE_ADAPTER  = 0x0063,
    /// The PHY could not be initialized.
    UNDI_CANNOT_INITIALIZE_PHY      = 0x0064,
    /// The adapter's configuration data could not be read.
    UNDI_CANNOT_READ_CONFIG_DATA    = 0x0065,
    /// The adapter's initialization data could not be read.
    UNDI_CANNOT_READ_INIT_DATA      = 0x0066,
    /// The hardware address is unusable.
    UNDI_BAD_MAC_ADDRESS            = 0x0067,
    /// The adapter's EEPROM checksum does not verify.
    UNDI_BAD_EEPROM_CHECKSUM        = 0x0068,
    /// The interrupt service hookup failed.
    UNDI_ERROR_SETTING_ISR          = 0x0069,
    /// The call does not fit the device layer's current state.
    UNDI_INVALID_STATE              = 0x006a,
    /// The frame could not be queued to hardware.
    UNDI_TRANSMIT_ERROR             = 0x006b,
    /// A device-layer parameter is out of range.
    UNDI_INVALID_PARAMETER          = 0x006c,

    /// Boot menu prompt handling failed.
    BSTRAP_PROMPT_MENU  = 0x0074,
    /// Bootstrap multicast address discovery failed.
    BSTRAP_MCAST_ADDR   = 0x0076,
    /// The boot server list is missing.
    BSTRAP_MISSING_LIST = 0x0077,
    /// No boot server responded.
    BSTRAP_NO_RESPONSE  = 0x0078,
    /// The boot file is too big for base memory.
    BSTRAP_FILE_TOO_BIG = 0x0079,

    /// Boot image download canceled by keystroke.
    BINL_CANCELED_BY_KEYSTROKE  = 0x00a0,
    /// No boot image negotiation server found.
    BINL_NO_PXE_SERVER          = 0x00a1,
    /// The call is not available in protected mode.
    NOT_AVAILABLE_IN_PMODE      = 0x00a2,
    /// The call is not available in real mode.
    NOT_AVAILABLE_IN_RMODE      = 0x00a3,

    /// The bus type of the device is not supported.
    BUSD_DEVICE_NOT_SUPPORTED   = 0x00b0,

    /// Not enough free base memory to load.
    LOADER_NO_FREE_BASE_MEMORY      = 0x00c0,
    /// No base-code ROM identifier found.
    LOADER_NO_BC_ROMID              = 0x00c1,
    /// The base-code ROM identifier is invalid.
    LOADER_BAD_BC_ROMID             = 0x00c2,
    /// The base-code runtime image is invalid.
    LOADER_BAD_BC_RUNTIME_IMAGE     = 0x00c3,
    /// No device-layer ROM identifier found.
    LOADER_NO_UNDI_ROMID            = 0x00c4,
    /// The device-layer ROM identifier is invalid.
    LOADER_BAD_UNDI_ROMID           = 0x00c5,
    /// The device-layer driver image is invalid.
    LOADER_BAD_UNDI_DRIVER_IMAGE    = 0x00c6,
    /// No `!PXE` structure found.
    LOADER_NO_PXE_STRUCT            = 0x00c8,
    /// No `PXENV+` structure found.
    LOADER_NO_PXENV_STRUCT          = 0x00c9,
    /// Starting the device layer failed.
    LOADER_UNDI_START               = 0x00ca,
    /// Starting the base code failed.
    LOADER_BC_START                 = 0x00cb,
}}

impl Status {
    /// Returns true if the status indicates success.
    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Exit code matching this status: [`ExitCode::SUCCESS`] for
    /// [`Status::SUCCESS`], [`ExitCode::FAILURE`] for everything else.
    #[inline]
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::SUCCESS => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Defaults to [`Status::SUCCESS`], letting parameter blocks derive their
/// zero state.
impl Default for Status {
    fn default() -> Self {
        Self::SUCCESS
    }
}

newtype_enum! {
/// Coarse pass/fail result reported through the call's own return channel.
///
/// The exit code and the [`Status`] written into the parameter block must
/// agree: `SUCCESS` if and only if the status is [`Status::SUCCESS`].
#[must_use]
pub enum ExitCode: u16 => {
    /// The call succeeded.
    SUCCESS = 0x0000,
    /// The call failed; the block's status field has the reason.
    FAILURE = 0x0001,
}}
