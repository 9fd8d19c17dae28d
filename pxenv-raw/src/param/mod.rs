// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter block layouts.
//!
//! Every API call carries exactly one caller-allocated parameter block, and
//! the first field of every block is a [`Status`] the callee fills in. The
//! structs in this module are byte-for-byte images of those blocks:
//! `repr(C, packed)`, native-endian counters and lengths, network-order
//! address types from [`crate::net`].
//!
//! Blocks arrive as raw bytes at whatever alignment the caller chose, so
//! they are copied in and out with unaligned reads and writes rather than
//! referenced in place.
//!
//! [`Status`]: crate::Status

pub mod preboot;
pub mod tftp;
pub mod udp;
pub mod undi;

use crate::Status;
use core::mem::size_of;
use core::ptr;

/// Marker for types that are byte-for-byte parameter block images.
///
/// # Safety
///
/// Implementors must be `repr(C, packed)` with every field valid for any bit
/// pattern, so that a value may be copied in and out of an untyped byte
/// buffer.
pub unsafe trait ParamBlock: Copy {}

/// Reads a `T` from the front of `raw`.
///
/// Returns `None` if the buffer is shorter than the block, which callers
/// report as a malformed call rather than reading past the end.
#[must_use]
pub fn read_block<T: ParamBlock>(raw: &[u8]) -> Option<T> {
    if raw.len() < size_of::<T>() {
        return None;
    }
    // SAFETY: the length was checked, and ParamBlock types accept any bytes.
    Some(unsafe { ptr::read_unaligned(raw.as_ptr().cast::<T>()) })
}

/// Writes `block` over the front of `raw`.
///
/// # Panics
///
/// Panics if `raw` is shorter than the block. Callers pair this with a
/// successful [`read_block`] of the same type, which establishes the length.
pub fn write_block<T: ParamBlock>(raw: &mut [u8], block: T) {
    assert!(raw.len() >= size_of::<T>());
    // SAFETY: the length was just asserted.
    unsafe { ptr::write_unaligned(raw.as_mut_ptr().cast::<T>(), block) };
}

/// Writes just the leading status field.
///
/// Used when the opcode is unknown and the block layout with it, but the
/// caller still deserves an answer. Returns false if even the status field
/// does not fit.
pub fn write_status(raw: &mut [u8], status: Status) -> bool {
    if raw.len() < size_of::<Status>() {
        return false;
    }
    // SAFETY: the length was checked; Status is a two-byte POD.
    unsafe { ptr::write_unaligned(raw.as_mut_ptr().cast::<Status>(), status) };
    true
}
