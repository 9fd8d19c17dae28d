// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compile-time tuning knobs.
//!
//! Everything that bounds a retry loop or sizes a scratch buffer is
//! collected here so a port can adjust one place. All timeouts are in
//! seconds and converted with [`Environment::ticks_per_second`] at the
//! point of use.
//!
//! [`Environment::ticks_per_second`]: crate::env::Environment::ticks_per_second

/// Largest link-layer frame the engine handles: 1500-byte Ethernet
/// payload plus the 14-byte header.
pub const MAX_FRAME_LEN: usize = 1514;

/// Attempts to queue a frame before transmit reports a busy device.
pub const TX_BUSY_RETRIES: u32 = 256;

/// Address-resolution requests sent before giving up on a next hop.
pub const ARP_MAX_RETRIES: u32 = 3;

/// Seconds to wait for an answer to one address-resolution request.
pub const ARP_REPLY_TIMEOUT_SECS: u64 = 1;

/// Entries in the address-resolution cache.
pub const ARP_CACHE_SIZE: usize = 8;

/// Seconds a learned cache entry stays valid.
pub const ARP_CACHE_TTL_SECS: u64 = 60;

/// Local port a UDP write goes out from when the caller passes port
/// zero. Mirrors the port the boot-server exchange uses.
pub const UDP_DEFAULT_SRC_PORT: u16 = 2069;

/// Well-known TFTP server port used when the caller passes port zero.
pub const TFTP_DEFAULT_SERVER_PORT: u16 = 69;

/// First local port used for TFTP transfers. Each new session takes the
/// next port so a stale server reply cannot match a fresh session.
pub const TFTP_CLIENT_PORT_BASE: u16 = 2070;

/// Local port a multicast (MTFTP) listener binds.
pub const MTFTP_CLIENT_PORT: u16 = 1758;

/// Server port for multicast (MTFTP) transfers.
pub const MTFTP_SERVER_PORT: u16 = 1759;

/// Times one TFTP request is re-sent before the transfer times out.
pub const TFTP_MAX_RETRIES: u32 = 3;

/// Seconds before the first TFTP retransmission; doubled per attempt.
pub const TFTP_BACKOFF_BASE_SECS: u64 = 1;

/// Default seconds to wait for the first reply when the caller does not
/// supply an open-timeout of its own.
pub const TFTP_OPEN_TIMEOUT_SECS: u64 = 10;

/// Block size used when the server negotiates none.
pub const TFTP_DEFAULT_BLKSIZE: u16 = 512;

/// Smallest block size a caller may request.
pub const TFTP_MIN_REQUESTED_BLKSIZE: u16 = 512;

/// Largest block size that still fits an unfragmented Ethernet frame.
pub const TFTP_MAX_BLKSIZE: u16 = 1468;

/// Smallest block size a server may negotiate down to (RFC 2348).
pub const TFTP_PROTOCOL_MIN_BLKSIZE: u16 = 8;
