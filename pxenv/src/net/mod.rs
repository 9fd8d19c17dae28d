// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire formats for the boot transport.
//!
//! Slice-level builders and parsers for the three encapsulations the
//! engine speaks (Ethernet II, IPv4 without reassembly, UDP) plus ARP
//! with a small resolution cache. Parsers take the raw bytes and return
//! a typed header and the payload slice; builders write into a caller
//! buffer and return the number of bytes written. Nothing here touches
//! the device or the clock.

pub mod arp;
pub mod eth;
pub mod ipv4;
pub mod udp;

mod checksum;
