// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller buffer addresses.
//!
//! Callers name memory in two ways: real-mode `segment:offset` pairs and
//! flat 32-bit physical addresses. Both are plain data here. Turning either
//! into usable memory is the embedding environment's job.

/// A real-mode far pointer.
///
/// Stored offset first, matching the in-memory layout of a far pointer that
/// real-mode code loads with `les`/`lds`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(C)]
pub struct SegOff16 {
    /// Offset within the segment.
    pub offset: u16,
    /// Real-mode segment.
    pub segment: u16,
}

impl SegOff16 {
    /// The `0000:0000` pointer.
    pub const NULL: Self = Self {
        offset: 0,
        segment: 0,
    };

    /// Builds a far pointer from segment and offset.
    #[must_use]
    pub const fn new(segment: u16, offset: u16) -> Self {
        Self { offset, segment }
    }

    /// Linear address the pair resolves to.
    ///
    /// Real-mode address arithmetic carries past 1 MiB, so the result needs
    /// 21 bits: `ffff:ffff` is `0x0010_ffef`.
    #[must_use]
    pub const fn linear(self) -> u32 {
        (self.segment as u32) * 16 + self.offset as u32
    }

    /// Returns true for the `0000:0000` pointer.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.segment == 0 && self.offset == 0
    }
}

/// A flat 32-bit physical address.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Addr32(pub u32);

impl Addr32 {
    /// The zero address.
    pub const NULL: Self = Self(0);

    /// Returns true for the zero address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}
