// SPDX-License-Identifier: MIT OR Apache-2.0

//! One's-complement checksum arithmetic shared by IPv4 and UDP.

/// Add `bytes` to a running 16-bit one's-complement sum.
///
/// An odd trailing byte is padded with zero, as if the data ended on a
/// 16-bit boundary.
pub(crate) fn add(mut sum: u32, bytes: &[u8]) -> u32 {
    let mut chunks = bytes.chunks_exact(2);
    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    sum
}

/// Fold the carries and complement, yielding the wire checksum.
pub(crate) fn finish(mut sum: u32) -> u16 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
