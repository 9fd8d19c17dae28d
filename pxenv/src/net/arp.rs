// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address resolution: ARP packets and a small cache.
//!
//! The cache is deliberately tiny. A boot client talks to one server and
//! at most one gateway, so [`ARP_CACHE_SIZE`] entries with evict-oldest
//! is plenty.
//!
//! [`ARP_CACHE_SIZE`]: crate::config::ARP_CACHE_SIZE

use crate::config::ARP_CACHE_SIZE;
use pxenv_raw::Ipv4Address;

/// Length of an ARP packet for Ethernet/IPv4.
pub const PAYLOAD_LEN: usize = 28;

/// Operation code of a request.
pub const OP_REQUEST: u16 = 1;

/// Operation code of a reply.
pub const OP_REPLY: u16 = 2;

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

/// One ARP packet, request or reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Operation: [`OP_REQUEST`] or [`OP_REPLY`].
    pub op: u16,
    /// Hardware address of the sender.
    pub sender_mac: [u8; 6],
    /// Protocol address of the sender.
    pub sender_ip: Ipv4Address,
    /// Hardware address being sought (zero in requests).
    pub target_mac: [u8; 6],
    /// Protocol address being sought.
    pub target_ip: Ipv4Address,
}

impl Packet {
    /// Parse an ARP payload, accepting only Ethernet/IPv4 bindings.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < PAYLOAD_LEN {
            return None;
        }
        if u16::from_be_bytes([payload[0], payload[1]]) != HTYPE_ETHERNET
            || u16::from_be_bytes([payload[2], payload[3]]) != PTYPE_IPV4
            || payload[4] != 6
            || payload[5] != 4
        {
            return None;
        }
        let mut sender_mac = [0; 6];
        let mut target_mac = [0; 6];
        sender_mac.copy_from_slice(&payload[8..14]);
        target_mac.copy_from_slice(&payload[18..24]);
        Some(Self {
            op: u16::from_be_bytes([payload[6], payload[7]]),
            sender_mac,
            sender_ip: Ipv4Address([payload[14], payload[15], payload[16], payload[17]]),
            target_mac,
            target_ip: Ipv4Address([payload[24], payload[25], payload[26], payload[27]]),
        })
    }

    /// Write this packet into the first [`PAYLOAD_LEN`] bytes of
    /// `payload`.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is shorter than [`PAYLOAD_LEN`].
    pub fn write(&self, payload: &mut [u8]) {
        payload[0..2].copy_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        payload[2..4].copy_from_slice(&PTYPE_IPV4.to_be_bytes());
        payload[4] = 6;
        payload[5] = 4;
        payload[6..8].copy_from_slice(&self.op.to_be_bytes());
        payload[8..14].copy_from_slice(&self.sender_mac);
        payload[14..18].copy_from_slice(&self.sender_ip.octets());
        payload[18..24].copy_from_slice(&self.target_mac);
        payload[24..28].copy_from_slice(&self.target_ip.octets());
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    ip: Ipv4Address,
    mac: [u8; 6],
    stamp: u64,
}

/// Fixed-size mapping from protocol to hardware addresses.
///
/// Timestamps are caller-supplied ticks; the cache itself has no clock.
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: [Option<Entry>; ARP_CACHE_SIZE],
}

impl ArpCache {
    /// An empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [None; ARP_CACHE_SIZE],
        }
    }

    /// Record a binding, refreshing an existing entry for the same
    /// address or evicting the oldest entry if the cache is full.
    pub fn insert(&mut self, ip: Ipv4Address, mac: [u8; 6], now: u64) {
        let entry = Some(Entry { ip, mac, stamp: now });
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|slot| matches!(slot, Some(e) if e.ip == ip))
        {
            *slot = entry;
            return;
        }
        if let Some(slot) = self.entries.iter_mut().find(|slot| slot.is_none()) {
            *slot = entry;
            return;
        }
        if let Some(slot) = self
            .entries
            .iter_mut()
            .min_by_key(|slot| slot.map_or(u64::MAX, |e| e.stamp))
        {
            *slot = entry;
        }
    }

    /// Look up a binding no older than `ttl` ticks.
    #[must_use]
    pub fn lookup(&self, ip: Ipv4Address, now: u64, ttl: u64) -> Option<[u8; 6]> {
        self.entries.iter().flatten().find_map(|e| {
            (e.ip == ip && now.saturating_sub(e.stamp) <= ttl).then_some(e.mac)
        })
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries = [None; ARP_CACHE_SIZE];
    }
}
