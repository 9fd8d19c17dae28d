// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw types of the preboot network-boot API.
//!
//! This crate holds the wire-exact pieces of the API: status and operation
//! codes, packed parameter block layouts, the cached boot packet shape, and
//! the address newtypes they all share. It is intended for implementing API
//! entry points and is used by the [`pxenv`] crate, which provides the
//! engine behind them.
//!
//! Parameter blocks are `repr(C, packed)` images of caller memory; see
//! [`param`] for the layouts and the unaligned marshalling helpers.
//!
//! [`pxenv`]: https://crates.io/crates/pxenv

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(
    clippy::all,
    clippy::must_use_candidate,
    clippy::ptr_as_ptr,
    clippy::use_self,
    missing_debug_implementations,
    unused
)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod enums;

pub mod bootp;
pub mod param;

mod addr;
mod net;
mod opcode;
mod status;

pub use addr::{Addr32, SegOff16};
pub use net::{Ipv4Address, MacAddress, UdpPort};
pub use opcode::OpCode;
pub use status::{ExitCode, Status};
