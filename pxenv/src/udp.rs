// SPDX-License-Identifier: MIT OR Apache-2.0

//! UDP datagram service.
//!
//! One socket at a time, bound to the client IP address handed to
//! [`UdpLayer::open`]. The layer frames outgoing datagrams down to
//! Ethernet, resolves next-hop media addresses over ARP, and strips the
//! framing from incoming datagrams, verifying every checksum on the way
//! up. It owns no receive queue: a read drains the device through the
//! UNDI layer until a datagram passes the caller's filter.

use crate::config::{ARP_CACHE_TTL_SECS, ARP_MAX_RETRIES, ARP_REPLY_TIMEOUT_SECS, MAX_FRAME_LEN};
use crate::device::NetDevice;
use crate::env::{Deadline, Environment};
use crate::net::{arp, eth, ipv4, udp};
use crate::undi::UndiController;
use crate::{Result, Status};
use core::ops::Range;
use log::{debug, trace, warn};
use pxenv_raw::Ipv4Address;

/// Which datagrams a read accepts. `None` fields match anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadFilter {
    /// Required source address.
    pub src_ip: Option<Ipv4Address>,
    /// Required destination address. Narrows the always-applied rule that
    /// the destination be the bound address, broadcast or multicast.
    pub dest_ip: Option<Ipv4Address>,
    /// Required source port.
    pub src_port: Option<u16>,
    /// Required destination port.
    pub dest_port: Option<u16>,
}

/// Addressing of a datagram returned by [`UdpLayer::read`].
#[derive(Clone, Copy, Debug)]
pub struct UdpRead {
    /// Address the datagram came from.
    pub src_ip: Ipv4Address,
    /// Address the datagram was sent to.
    pub dest_ip: Ipv4Address,
    /// Port the datagram came from.
    pub src_port: u16,
    /// Port the datagram was sent to.
    pub dest_port: u16,
}

/// The UDP socket layer.
///
/// Separate receive and transmit frame buffers let a caller keep a
/// received payload borrowed while assembling the acknowledgement that
/// answers it.
pub struct UdpLayer {
    endpoint: Option<Ipv4Address>,
    arp: arp::ArpCache,
    ip_ident: u16,
    rx: [u8; MAX_FRAME_LEN],
    tx: [u8; MAX_FRAME_LEN],
}

impl Default for UdpLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpLayer {
    /// An unbound layer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            endpoint: None,
            arp: arp::ArpCache::new(),
            ip_ident: 0,
            rx: [0; MAX_FRAME_LEN],
            tx: [0; MAX_FRAME_LEN],
        }
    }

    /// The bound client address, if open.
    #[must_use]
    pub const fn bound_ip(&self) -> Option<Ipv4Address> {
        self.endpoint
    }

    /// True once [`open`] has bound an address.
    ///
    /// [`open`]: Self::open
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Bind the socket to the client address.
    pub fn open(&mut self, ip: Ipv4Address) -> Result {
        if self.endpoint.is_some() {
            return Err(Status::UDP_OPEN.into());
        }
        debug!("udp: open as {ip}");
        self.endpoint = Some(ip);
        Ok(())
    }

    /// Unbind the socket.
    pub fn close(&mut self) -> Result {
        if self.endpoint.is_none() {
            return Err(Status::UDP_CLOSED.into());
        }
        debug!("udp: closed");
        self.endpoint = None;
        Ok(())
    }

    /// Send one datagram.
    ///
    /// `gateway` supplies the next hop for destinations off the local
    /// subnet; unspecified means deliver directly. Broadcast and
    /// multicast destinations are framed without address resolution.
    #[allow(clippy::too_many_arguments)]
    pub fn write<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        dest_ip: Ipv4Address,
        gateway: Ipv4Address,
        src_port: u16,
        dest_port: u16,
        payload: &[u8],
    ) -> Result {
        let Some(src_ip) = self.endpoint else {
            return Err(Status::UDP_CLOSED.into());
        };
        let total = eth::HEADER_LEN + ipv4::HEADER_LEN + udp::HEADER_LEN + payload.len();
        if total > MAX_FRAME_LEN {
            return Err(Status::OUT_OF_RESOURCES.into());
        }

        let dest_mac = if dest_ip.is_broadcast() {
            eth::BROADCAST
        } else if dest_ip.is_multicast() {
            ipv4::multicast_mac(dest_ip)
        } else {
            let hop = if gateway.is_unspecified() { dest_ip } else { gateway };
            self.resolve(env, undi, src_ip, hop)?
        };

        trace!("udp: {src_ip}:{src_port} -> {dest_ip}:{dest_port}, {} bytes", payload.len());
        self.ip_ident = self.ip_ident.wrapping_add(1);
        let frame = &mut self.tx[..total];
        eth::Header {
            dest: dest_mac,
            src: undi.station_address().ethernet(),
            ethertype: eth::ETHERTYPE_IPV4,
        }
        .write(frame);
        ipv4::Header {
            protocol: ipv4::PROTOCOL_UDP,
            src: src_ip,
            dest: dest_ip,
        }
        .write(
            &mut frame[eth::HEADER_LEN..],
            self.ip_ident,
            udp::HEADER_LEN + payload.len(),
        );
        let segment = &mut frame[eth::HEADER_LEN + ipv4::HEADER_LEN..];
        segment[udp::HEADER_LEN..].copy_from_slice(payload);
        udp::Header { src_port, dest_port }.write(src_ip, dest_ip, segment, payload.len());

        undi.transmit_frame(&self.tx[..total])
    }

    /// Receive one datagram passing `filter`.
    ///
    /// With a deadline, polls until a datagram arrives or the deadline
    /// expires; without one, makes a single drain pass over whatever the
    /// device already holds. Either way `Ok(None)` means nothing
    /// acceptable arrived. ARP traffic is serviced in passing, so peers
    /// can resolve us while we wait.
    pub fn read<'a, E: Environment + ?Sized, D: NetDevice>(
        &'a mut self,
        env: &E,
        undi: &mut UndiController<D>,
        filter: &ReadFilter,
        deadline: Option<Deadline>,
    ) -> Result<Option<(UdpRead, &'a [u8])>> {
        let Some(bound) = self.endpoint else {
            return Err(Status::UDP_CLOSED.into());
        };
        loop {
            if let Some(limit) = deadline {
                if limit.expired(env) {
                    return Ok(None);
                }
            }
            let Some(len) = undi.poll_frame(&mut self.rx) else {
                if deadline.is_none() {
                    return Ok(None);
                }
                continue;
            };
            let Some((eth_hdr, _)) = eth::Header::parse(&self.rx[..len]) else {
                continue;
            };
            if eth_hdr.ethertype == eth::ETHERTYPE_ARP {
                self.handle_arp_frame(env, undi, len)?;
                continue;
            }
            if eth_hdr.ethertype != eth::ETHERTYPE_IPV4 {
                continue;
            }
            let Some((read, span)) = parse_udp_frame(&self.rx[..len]) else {
                continue;
            };
            if read.dest_ip != bound && !read.dest_ip.is_broadcast() && !read.dest_ip.is_multicast()
            {
                continue;
            }
            if filter.src_ip.is_some_and(|want| read.src_ip != want)
                || filter.dest_ip.is_some_and(|want| read.dest_ip != want)
                || filter.src_port.is_some_and(|want| read.src_port != want)
                || filter.dest_port.is_some_and(|want| read.dest_port != want)
            {
                trace!(
                    "udp: filtered out {}:{} -> {}:{}",
                    read.src_ip, read.src_port, read.dest_ip, read.dest_port
                );
                continue;
            }
            return Ok(Some((read, &self.rx[span])));
        }
    }

    /// Learn from one ARP frame sitting in the receive buffer and answer
    /// it if it asks for the bound address.
    fn handle_arp_frame<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        len: usize,
    ) -> Result {
        let parsed = eth::Header::parse(&self.rx[..len]).and_then(|(_, rest)| arp::Packet::parse(rest));
        let Some(packet) = parsed else {
            return Ok(());
        };
        self.arp.insert(packet.sender_ip, packet.sender_mac, env.ticks());
        if packet.op == arp::OP_REQUEST {
            if let Some(bound) = self.endpoint {
                if packet.target_ip == bound {
                    trace!("arp: answering who-has {bound}");
                    return self.answer_arp(undi, &packet, bound);
                }
            }
        }
        Ok(())
    }

    fn answer_arp<D: NetDevice>(
        &mut self,
        undi: &mut UndiController<D>,
        request: &arp::Packet,
        our_ip: Ipv4Address,
    ) -> Result {
        let our_mac = undi.station_address().ethernet();
        let total = eth::HEADER_LEN + arp::PAYLOAD_LEN;
        eth::Header {
            dest: request.sender_mac,
            src: our_mac,
            ethertype: eth::ETHERTYPE_ARP,
        }
        .write(&mut self.tx[..total]);
        arp::Packet {
            op: arp::OP_REPLY,
            sender_mac: our_mac,
            sender_ip: our_ip,
            target_mac: request.sender_mac,
            target_ip: request.sender_ip,
        }
        .write(&mut self.tx[eth::HEADER_LEN..total]);
        undi.transmit_frame(&self.tx[..total])
    }

    /// Resolve `ip` to a media address, asking the wire if the cache
    /// cannot answer.
    fn resolve<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        src_ip: Ipv4Address,
        ip: Ipv4Address,
    ) -> Result<[u8; 6]> {
        let ttl = ARP_CACHE_TTL_SECS.saturating_mul(env.ticks_per_second());
        if let Some(mac) = self.arp.lookup(ip, env.ticks(), ttl) {
            return Ok(mac);
        }
        let our_mac = undi.station_address().ethernet();
        for attempt in 0..ARP_MAX_RETRIES {
            debug!("arp: who-has {ip} (attempt {})", attempt + 1);
            let total = eth::HEADER_LEN + arp::PAYLOAD_LEN;
            eth::Header {
                dest: eth::BROADCAST,
                src: our_mac,
                ethertype: eth::ETHERTYPE_ARP,
            }
            .write(&mut self.tx[..total]);
            arp::Packet {
                op: arp::OP_REQUEST,
                sender_mac: our_mac,
                sender_ip: src_ip,
                target_mac: [0; 6],
                target_ip: ip,
            }
            .write(&mut self.tx[eth::HEADER_LEN..total]);
            undi.transmit_frame(&self.tx[..total])?;

            // Wait out one reply window. Frames other than ARP are
            // dropped here; a write happens between reads, so nothing
            // the caller still wants can be in flight.
            let deadline = Deadline::after_secs(env, ARP_REPLY_TIMEOUT_SECS);
            while !deadline.expired(env) {
                let Some(len) = undi.poll_frame(&mut self.rx) else {
                    continue;
                };
                let Some((eth_hdr, _)) = eth::Header::parse(&self.rx[..len]) else {
                    continue;
                };
                if eth_hdr.ethertype != eth::ETHERTYPE_ARP {
                    continue;
                }
                self.handle_arp_frame(env, undi, len)?;
                if let Some(mac) = self.arp.lookup(ip, env.ticks(), ttl) {
                    return Ok(mac);
                }
            }
        }
        warn!("arp: {ip} did not answer");
        Err(Status::ARP_TIMEOUT.into())
    }
}

impl core::fmt::Debug for UdpLayer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UdpLayer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Parses `frame` as Ethernet/IPv4/UDP, returning the addressing and the
/// payload's position within the frame.
pub(crate) fn parse_udp_frame(frame: &[u8]) -> Option<(UdpRead, Range<usize>)> {
    let (ip_hdr, ip_payload) = ipv4::Header::parse(frame.get(eth::HEADER_LEN..)?)?;
    if ip_hdr.protocol != ipv4::PROTOCOL_UDP {
        return None;
    }
    let (udp_hdr, data) = udp::Header::parse(ip_hdr.src, ip_hdr.dest, ip_payload)?;
    let ihl = usize::from(frame[eth::HEADER_LEN] & 0x0f) * 4;
    let start = eth::HEADER_LEN + ihl + udp::HEADER_LEN;
    Some((
        UdpRead {
            src_ip: ip_hdr.src,
            dest_ip: ip_hdr.dest,
            src_port: udp_hdr.src_port,
            dest_port: udp_hdr.dest_port,
        },
        start..start + data.len(),
    ))
}
