// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform seam: caller memory and the timer tick.
//!
//! Parameter blocks name caller-owned buffers by real-mode segment:offset
//! or by flat 32-bit address. How either kind of address reaches actual
//! memory is a platform concern, so the engine routes every access through
//! the [`Environment`] trait and never translates addresses itself. A
//! resolved slice is only held for the duration of one copy, never across
//! a polling wait.

use pxenv_raw::{Addr32, SegOff16};

/// Address of a caller-owned buffer, as named in a parameter block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferAddr {
    /// Real-mode segment:offset pair.
    SegOff(SegOff16),
    /// Flat 32-bit address.
    Linear(Addr32),
}

impl BufferAddr {
    /// Whether this is the null address in either representation.
    #[must_use]
    pub const fn is_null(self) -> bool {
        match self {
            Self::SegOff(s) => s.is_null(),
            Self::Linear(a) => a.is_null(),
        }
    }
}

impl From<SegOff16> for BufferAddr {
    fn from(addr: SegOff16) -> Self {
        Self::SegOff(addr)
    }
}

impl From<Addr32> for BufferAddr {
    fn from(addr: Addr32) -> Self {
        Self::Linear(addr)
    }
}

/// Access to the boot-time execution context.
///
/// The embedding supplies this. Address resolution may refuse a range
/// (null address, or a range outside the memory the caller may touch), in
/// which case the requesting operation fails with
/// [`Status::MCOPY_PROBLEM`].
///
/// [`Status::MCOPY_PROBLEM`]: crate::Status::MCOPY_PROBLEM
pub trait Environment {
    /// Borrow `len` bytes of caller memory at `addr` for reading.
    #[must_use]
    fn buffer(&self, addr: BufferAddr, len: usize) -> Option<&[u8]>;

    /// Borrow `len` bytes of caller memory at `addr` for writing.
    fn buffer_mut(&mut self, addr: BufferAddr, len: usize) -> Option<&mut [u8]>;

    /// Current value of the monotonic timer tick.
    #[must_use]
    fn ticks(&self) -> u64;

    /// Timer ticks per second. Must be nonzero.
    #[must_use]
    fn ticks_per_second(&self) -> u64;

    /// Staging area for interrupt-path frame delivery.
    ///
    /// Returns the window's address as the caller will see it plus the
    /// backing bytes. The interrupt service copies one frame chunk per
    /// call into the window and reports its address; the memory must stay
    /// valid and caller-addressable between service calls.
    fn frame_window(&mut self) -> (SegOff16, &mut [u8]);
}

/// Tick-valued deadline for bounded waits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(u64);

impl Deadline {
    /// Deadline `secs` seconds from the current tick.
    #[must_use]
    pub fn after_secs<E: Environment + ?Sized>(env: &E, secs: u64) -> Self {
        Self(env.ticks().saturating_add(secs.saturating_mul(env.ticks_per_second())))
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn expired<E: Environment + ?Sized>(&self, env: &E) -> bool {
        env.ticks() >= self.0
    }
}
