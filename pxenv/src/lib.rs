// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine for the preboot (PXE) network-boot API.
//!
//! This crate implements the services behind the classic network-boot opcode
//! table: UNDI device control, a single-endpoint UDP datagram layer, and a
//! TFTP/MTFTP download client, joined by one dispatch convention in which
//! every operation reads and writes a caller-allocated parameter block and
//! reports a [`Status`] word plus a coarse [`ExitCode`].
//!
//! # Crate organisation
//!
//! [`PxeStack`] is the top-level object. It owns the three singleton
//! resources (the UNDI device context, the UDP endpoint, the TFTP session)
//! and routes opcodes to them via [`PxeStack::dispatch`]. The layers beneath
//! it can also be driven directly from Rust through their typed methods.
//!
//! Two traits connect the engine to its surroundings:
//!
//! - [`NetDevice`] is the hardware seam: a driver that can queue one frame
//!   for transmit and poll one received frame.
//! - [`Environment`] is the platform seam: caller-memory access by
//!   segment:offset or linear address, and the timer tick.
//!
//! The bit-exact ABI surface (status codes, opcodes, parameter-block
//! layouts) lives in the companion [`pxenv_raw`] crate.
//!
//! ## Optional crate features
//!
//! - `logger`: Logging implementation for the standard [`log`] crate that
//!   prints to a caller-supplied console writer. No buffering is done; this
//!   is not a high-performance logger.
//!
//! [`NetDevice`]: device::NetDevice
//! [`Environment`]: env::Environment

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![no_std]
// Enable some additional warnings and lints.
#![warn(clippy::ptr_as_ptr, missing_docs, unused)]
#![deny(clippy::all)]
#![deny(clippy::must_use_candidate)]

#[cfg(test)]
extern crate std;

mod result;
pub use self::result::{Error, Result, ResultExt, Status, StatusExt};

pub mod config;
pub mod device;
pub mod env;
pub mod net;

mod dispatch;
pub use self::dispatch::{CachedPackets, PxeStack};

mod tftp;
pub use self::tftp::{ReadFileRequest, TftpClient};

mod udp;
pub use self::udp::{ReadFilter, UdpLayer, UdpRead};

mod undi;
pub use self::undi::{IsrEvent, LinkStats, NicInformation, UndiController, UndiState};

#[cfg(feature = "logger")]
pub mod logger;

#[cfg(test)]
pub(crate) mod mock;
