// SPDX-License-Identifier: MIT OR Apache-2.0

//! TFTP download client.
//!
//! One lock-step session at a time: every data block is acknowledged
//! before the next one is accepted, so the engine never holds more than
//! one block of file data. Block size negotiation (RFC 2348) and the
//! transfer size probe (RFC 2349) are spoken on top of the base
//! protocol, and a whole-file download can fall back to a passive
//! multicast listen when the server does not answer unicast requests.

use crate::config::{
    MTFTP_CLIENT_PORT, MTFTP_SERVER_PORT, TFTP_BACKOFF_BASE_SECS, TFTP_CLIENT_PORT_BASE,
    TFTP_DEFAULT_BLKSIZE, TFTP_DEFAULT_SERVER_PORT, TFTP_MAX_BLKSIZE, TFTP_MAX_RETRIES,
    TFTP_MIN_REQUESTED_BLKSIZE, TFTP_OPEN_TIMEOUT_SECS, TFTP_PROTOCOL_MIN_BLKSIZE,
};
use crate::device::NetDevice;
use crate::env::{BufferAddr, Deadline, Environment};
use crate::net::ipv4;
use crate::udp::{ReadFilter, UdpLayer, UdpRead};
use crate::undi::UndiController;
use crate::{Error, Result, Status};
use log::{debug, trace, warn};
use pxenv_raw::{Ipv4Address, MacAddress};

const BLOCK_CAPACITY: usize = TFTP_MAX_BLKSIZE as usize;

/// Addressing and pacing of a whole-file download.
#[derive(Clone, Copy, Debug)]
pub struct ReadFileRequest<'a> {
    /// File to fetch, without a terminating NUL.
    pub file_name: &'a [u8],
    /// Server to fetch from.
    pub server_ip: Ipv4Address,
    /// Relay for off-subnet servers, or unspecified.
    pub gateway_ip: Ipv4Address,
    /// Multicast group to fall back to, or unspecified for unicast only.
    pub mcast_ip: Ipv4Address,
    /// Client port of the multicast transfer. Zero selects the default.
    pub client_port: u16,
    /// Server port of the multicast transfer. Zero selects the default.
    pub server_port: u16,
    /// Seconds to wait for a first response. Zero selects the default.
    pub open_timeout: u16,
    /// Seconds to give the unicast attempt before listening on the
    /// multicast group. Zero skips the unicast attempt entirely.
    pub reopen_delay: u16,
}

/// One block held between receipt and delivery.
struct Block {
    buf: [u8; BLOCK_CAPACITY],
    len: usize,
    number: u16,
    valid: bool,
}

impl Block {
    const fn empty() -> Self {
        Self {
            buf: [0; BLOCK_CAPACITY],
            len: 0,
            number: 0,
            valid: false,
        }
    }

    fn fill(&mut self, number: u16, data: &[u8]) {
        self.buf[..data.len()].copy_from_slice(data);
        self.len = data.len();
        self.number = number;
        self.valid = true;
    }
}

struct Session {
    server_ip: Ipv4Address,
    gateway_ip: Ipv4Address,
    /// Transfer identifier: the port the server answered from.
    server_port: u16,
    client_port: u16,
    blksize: u16,
    /// Next block expected off the wire.
    next_block: u16,
    eof: bool,
    pending: Block,
}

/// Owned verdict on a reply to the open request.
enum OpenReply {
    /// Server skipped option negotiation and sent block 1 directly.
    FirstData { tid: u16, eof: bool },
    /// Options acknowledged.
    Accepted { tid: u16, blksize: u16 },
    /// Option acknowledgement out of range; must be refused.
    BadOption { tid: u16 },
    /// Data block longer than the protocol allows without negotiation.
    Oversize,
    /// Server refused the transfer.
    Refused(Status),
    Stray,
    Timeout,
}

/// Owned verdict on a reply while waiting for a data block.
enum Fetched {
    Got,
    /// The already-acknowledged predecessor arrived again.
    Dup(u16),
    Refused(Status),
    Stray,
    Timeout,
}

/// Owned verdict on a reply to the size probe.
enum FsizeReply {
    Size { tid: u16, size: u64 },
    NoSize { tid: u16 },
    Refused(Status),
    Stray,
    Timeout,
}

enum Listen {
    Advance(usize),
    Stray,
}

/// The TFTP client: at most one open session.
pub struct TftpClient {
    session: Option<Session>,
    next_client_port: u16,
}

impl Default for TftpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TftpClient {
    /// A client with no open session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: None,
            next_client_port: TFTP_CLIENT_PORT_BASE,
        }
    }

    /// True while a session is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Each session gets a fresh local port, so late packets of a dead
    /// session cannot be mistaken for the current one.
    fn alloc_client_port(&mut self) -> u16 {
        let port = self.next_client_port;
        self.next_client_port = match self.next_client_port.checked_add(1) {
            Some(next) => next,
            None => TFTP_CLIENT_PORT_BASE,
        };
        port
    }

    /// Open a session for `file_name` and negotiate the block size.
    ///
    /// Returns the negotiated block size: `requested_blksize` or less,
    /// and exactly 512 when the server does not negotiate. A server
    /// port of zero selects the well-known TFTP port.
    #[allow(clippy::too_many_arguments)]
    pub fn open<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
        server_ip: Ipv4Address,
        gateway_ip: Ipv4Address,
        file_name: &[u8],
        server_port: u16,
        requested_blksize: u16,
    ) -> Result<u16> {
        if requested_blksize < TFTP_MIN_REQUESTED_BLKSIZE {
            return Err(Status::TFTP_INVALID_PACKET_SIZE.into());
        }
        self.begin(
            env,
            undi,
            udp,
            server_ip,
            gateway_ip,
            file_name,
            server_port,
            requested_blksize,
            TFTP_OPEN_TIMEOUT_SECS,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn begin<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
        server_ip: Ipv4Address,
        gateway_ip: Ipv4Address,
        file_name: &[u8],
        server_port: u16,
        requested_blksize: u16,
        timeout_secs: u64,
    ) -> Result<u16> {
        if self.session.is_some() {
            return Err(Status::TFTP_OPEN.into());
        }
        let requested = requested_blksize.min(TFTP_MAX_BLKSIZE);
        let server_port = if server_port == 0 {
            TFTP_DEFAULT_SERVER_PORT
        } else {
            server_port
        };
        let client_port = self.alloc_client_port();

        let mut rrq = [0u8; wire::MAX_REQUEST_LEN];
        let rrq_len = wire::build_rrq(&mut rrq, file_name, Some(requested), false)
            .ok_or(Error::from(Status::BAD_FUNC))?;

        // The reply locks the transfer identifier, so the source port is
        // left open here; the server answers from a fresh one.
        let filter = ReadFilter {
            src_ip: Some(server_ip),
            dest_port: Some(client_port),
            ..ReadFilter::default()
        };
        let overall = Deadline::after_secs(env, timeout_secs);
        let mut pending = Block::empty();

        for attempt in 0..TFTP_MAX_RETRIES {
            if attempt > 0 && overall.expired(env) {
                break;
            }
            debug!("tftp: rrq to {server_ip}:{server_port} (attempt {})", attempt + 1);
            udp.write(env, undi, server_ip, gateway_ip, client_port, server_port, &rrq[..rrq_len])
                .map_err(map_arp_failure)?;

            let wait = Deadline::after_secs(env, TFTP_BACKOFF_BASE_SECS << attempt);
            loop {
                if overall.expired(env) {
                    break;
                }
                let outcome = match udp.read(env, undi, &filter, Some(wait))? {
                    None => OpenReply::Timeout,
                    Some((info, payload)) => {
                        classify_open_reply(&info, payload, requested, &mut pending)
                    }
                };
                match outcome {
                    OpenReply::FirstData { tid, eof } => {
                        debug!("tftp: open without negotiation, 512 byte blocks");
                        self.session = Some(Session {
                            server_ip,
                            gateway_ip,
                            server_port: tid,
                            client_port,
                            blksize: TFTP_DEFAULT_BLKSIZE,
                            next_block: 2,
                            eof,
                            pending,
                        });
                        return Ok(TFTP_DEFAULT_BLKSIZE);
                    }
                    OpenReply::Accepted { tid, blksize } => {
                        udp.write(
                            env,
                            undi,
                            server_ip,
                            gateway_ip,
                            client_port,
                            tid,
                            &wire::build_ack(0),
                        )?;
                        debug!("tftp: open, negotiated {blksize} byte blocks");
                        self.session = Some(Session {
                            server_ip,
                            gateway_ip,
                            server_port: tid,
                            client_port,
                            blksize,
                            next_block: 1,
                            eof: false,
                            pending,
                        });
                        return Ok(blksize);
                    }
                    OpenReply::BadOption { tid } => {
                        let mut err = [0u8; 32];
                        if let Some(len) = wire::build_error(&mut err, wire::ERR_BAD_OPTION, b"bad blksize") {
                            let _ = udp.write(
                                env,
                                undi,
                                server_ip,
                                gateway_ip,
                                client_port,
                                tid,
                                &err[..len],
                            );
                        }
                        return Err(Status::TFTP_INVALID_PACKET_SIZE.into());
                    }
                    OpenReply::Oversize => {
                        return Err(Status::TFTP_INVALID_PACKET_SIZE.into());
                    }
                    OpenReply::Refused(status) => {
                        warn!("tftp: server refused {server_ip}: {status:?}");
                        return Err(status.into());
                    }
                    OpenReply::Timeout => break,
                    OpenReply::Stray => {}
                }
            }
        }
        warn!("tftp: no answer from {server_ip}");
        Err(Status::TFTP_OPEN_TIMEOUT.into())
    }

    /// Deliver the next block of the open session.
    ///
    /// Returns the block's sequence number and its bytes; fewer bytes
    /// than the negotiated block size mean the file is complete. The
    /// block is acknowledged as part of delivery. A timed-out read
    /// leaves the session open for another try; a server error tears it
    /// down.
    pub fn read<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
    ) -> Result<(u16, &[u8])> {
        self.fetch_pending(env, undi, udp)?;
        let Some(session) = self.session.as_mut() else {
            return Err(Status::TFTP_CLOSED.into());
        };
        let number = session.pending.number;
        let len = session.pending.len;
        session.pending.valid = false;
        udp.write(
            env,
            undi,
            session.server_ip,
            session.gateway_ip,
            session.client_port,
            session.server_port,
            &wire::build_ack(number),
        )?;
        trace!("tftp: block {number}, {len} bytes");
        Ok((number, &session.pending.buf[..len]))
    }

    /// Make sure a block is waiting in the session buffer, pulling it
    /// off the wire if need be.
    fn fetch_pending<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
    ) -> Result {
        let Some(session) = self.session.as_mut() else {
            return Err(Status::TFTP_CLOSED.into());
        };
        if session.pending.valid {
            return Ok(());
        }
        if session.eof {
            return Err(Status::TFTP_CLOSED.into());
        }
        let filter = ReadFilter {
            src_ip: Some(session.server_ip),
            src_port: Some(session.server_port),
            dest_port: Some(session.client_port),
            dest_ip: None,
        };
        'attempts: for attempt in 0..TFTP_MAX_RETRIES {
            if attempt > 0 {
                // Nudge a server that lost our acknowledgement.
                let last = session.next_block.wrapping_sub(1);
                trace!("tftp: resending ack {last}");
                udp.write(
                    env,
                    undi,
                    session.server_ip,
                    session.gateway_ip,
                    session.client_port,
                    session.server_port,
                    &wire::build_ack(last),
                )?;
            }
            let wait = Deadline::after_secs(env, TFTP_BACKOFF_BASE_SECS << attempt);
            loop {
                let fetched = match udp.read(env, undi, &filter, Some(wait))? {
                    None => Fetched::Timeout,
                    Some((_, payload)) => classify_data(session, payload)?,
                };
                match fetched {
                    Fetched::Got => break 'attempts,
                    Fetched::Dup(block) => {
                        trace!("tftp: block {block} again, repeating ack");
                        udp.write(
                            env,
                            undi,
                            session.server_ip,
                            session.gateway_ip,
                            session.client_port,
                            session.server_port,
                            &wire::build_ack(block),
                        )?;
                    }
                    Fetched::Refused(status) => {
                        warn!("tftp: transfer aborted by server: {status:?}");
                        self.session = None;
                        return Err(status.into());
                    }
                    Fetched::Timeout => break,
                    Fetched::Stray => {}
                }
            }
        }
        if !session.pending.valid {
            warn!("tftp: block {} never arrived", session.next_block);
            return Err(Status::TFTP_READ_TIMEOUT.into());
        }
        Ok(())
    }

    /// Download `file_name` into the caller's buffer in one call.
    ///
    /// Runs open, the block loop and close internally. When
    /// [`ReadFileRequest::mcast_ip`] names a group and the server stays
    /// silent past the reopen delay, the download switches to a passive
    /// listen on that group. Returns the byte count delivered.
    pub fn read_file<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &mut E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
        request: &ReadFileRequest<'_>,
        buffer: BufferAddr,
        capacity: u32,
    ) -> Result<u32> {
        if self.session.is_some() {
            return Err(Status::TFTP_OPEN.into());
        }
        let fallback = !request.mcast_ip.is_unspecified();
        if fallback && request.reopen_delay == 0 {
            return mtftp_transfer(env, undi, udp, request, buffer, capacity);
        }
        let unicast_timeout = if fallback {
            u64::from(request.reopen_delay)
        } else {
            timeout_or_default(request.open_timeout)
        };

        let blksize = match self.begin(
            env,
            undi,
            udp,
            request.server_ip,
            request.gateway_ip,
            request.file_name,
            0,
            TFTP_MAX_BLKSIZE,
            unicast_timeout,
        ) {
            Ok(blksize) => blksize,
            Err(err) if fallback && err.status() == Status::TFTP_OPEN_TIMEOUT => {
                debug!("tftp: server silent, joining {}", request.mcast_ip);
                return mtftp_transfer(env, undi, udp, request, buffer, capacity);
            }
            Err(err) => return Err(err),
        };

        let mut total: u32 = 0;
        loop {
            let data = match self.read(env, undi, udp) {
                Ok((_, data)) => data,
                Err(err) => {
                    self.session = None;
                    return Err(err);
                }
            };
            let len = data.len();
            let fits = u64::from(total) + len as u64 <= u64::from(capacity);
            if fits && len > 0 {
                let at = total as usize;
                let Some(dest) = env.buffer_mut(buffer, capacity as usize) else {
                    self.session = None;
                    return Err(Status::MCOPY_PROBLEM.into());
                };
                dest[at..at + len].copy_from_slice(data);
            }
            if !fits {
                self.abort(env, undi, udp, wire::ERR_DISK_FULL, b"buffer full");
                return Err(Status::OUT_OF_RESOURCES.into());
            }
            total += len as u32;
            if len < usize::from(blksize) {
                break;
            }
        }
        self.session = None;
        debug!("tftp: downloaded {total} bytes");
        Ok(total)
    }

    /// Ask the server for a file's size without transferring it.
    ///
    /// Probes with the transfer-size option; a server that does not
    /// report a size fails the call. No session is left behind either
    /// way.
    pub fn get_fsize<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
        server_ip: Ipv4Address,
        gateway_ip: Ipv4Address,
        file_name: &[u8],
    ) -> Result<u32> {
        if self.session.is_some() {
            return Err(Status::TFTP_OPEN.into());
        }
        let client_port = self.alloc_client_port();
        let mut rrq = [0u8; wire::MAX_REQUEST_LEN];
        let rrq_len = wire::build_rrq(&mut rrq, file_name, None, true)
            .ok_or(Error::from(Status::BAD_FUNC))?;

        let filter = ReadFilter {
            src_ip: Some(server_ip),
            dest_port: Some(client_port),
            ..ReadFilter::default()
        };
        let overall = Deadline::after_secs(env, TFTP_OPEN_TIMEOUT_SECS);

        for attempt in 0..TFTP_MAX_RETRIES {
            if attempt > 0 && overall.expired(env) {
                break;
            }
            udp.write(
                env,
                undi,
                server_ip,
                gateway_ip,
                client_port,
                TFTP_DEFAULT_SERVER_PORT,
                &rrq[..rrq_len],
            )
            .map_err(map_arp_failure)?;

            let wait = Deadline::after_secs(env, TFTP_BACKOFF_BASE_SECS << attempt);
            loop {
                if overall.expired(env) {
                    break;
                }
                let outcome = match udp.read(env, undi, &filter, Some(wait))? {
                    None => FsizeReply::Timeout,
                    Some((info, payload)) => classify_fsize_reply(&info, payload),
                };
                match outcome {
                    FsizeReply::Size { tid, size } => {
                        // The probe wanted the size, not the file.
                        send_abort(env, undi, udp, server_ip, gateway_ip, client_port, tid);
                        debug!("tftp: {server_ip} reports {size} bytes");
                        return Ok(u32::try_from(size).unwrap_or(u32::MAX));
                    }
                    FsizeReply::NoSize { tid } => {
                        send_abort(env, undi, udp, server_ip, gateway_ip, client_port, tid);
                        return Err(Status::TFTP_NO_FILESIZE.into());
                    }
                    FsizeReply::Refused(status) => return Err(status.into()),
                    FsizeReply::Timeout => break,
                    FsizeReply::Stray => {}
                }
            }
        }
        Err(Status::TFTP_OPEN_TIMEOUT.into())
    }

    /// Close the open session.
    pub fn close(&mut self) -> Result {
        if self.session.take().is_none() {
            return Err(Status::TFTP_CLOSED.into());
        }
        debug!("tftp: closed");
        Ok(())
    }

    /// Best-effort error notification to the server, tearing the
    /// session down.
    fn abort<E: Environment + ?Sized, D: NetDevice>(
        &mut self,
        env: &E,
        undi: &mut UndiController<D>,
        udp: &mut UdpLayer,
        code: u16,
        message: &[u8],
    ) {
        if let Some(session) = self.session.take() {
            let mut buf = [0u8; 48];
            if let Some(len) = wire::build_error(&mut buf, code, message) {
                let _ = udp.write(
                    env,
                    undi,
                    session.server_ip,
                    session.gateway_ip,
                    session.client_port,
                    session.server_port,
                    &buf[..len],
                );
            }
        }
    }
}

impl core::fmt::Debug for TftpClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TftpClient")
            .field("open", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

fn map_arp_failure(err: Error) -> Error {
    if err.status() == Status::ARP_TIMEOUT {
        Status::TFTP_CANNOT_ARP_ADDRESS.into()
    } else {
        err
    }
}

fn timeout_or_default(secs: u16) -> u64 {
    if secs == 0 {
        TFTP_OPEN_TIMEOUT_SECS
    } else {
        u64::from(secs)
    }
}

fn classify_open_reply(
    info: &UdpRead,
    payload: &[u8],
    requested: u16,
    pending: &mut Block,
) -> OpenReply {
    match wire::parse(payload) {
        Some(wire::Packet::Data { block: 1, data }) => {
            if data.len() > usize::from(TFTP_DEFAULT_BLKSIZE) {
                return OpenReply::Oversize;
            }
            pending.fill(1, data);
            OpenReply::FirstData {
                tid: info.src_port,
                eof: data.len() < usize::from(TFTP_DEFAULT_BLKSIZE),
            }
        }
        Some(wire::Packet::Oack(options)) => match options.blksize {
            Some(value) if value < TFTP_PROTOCOL_MIN_BLKSIZE || value > requested => {
                OpenReply::BadOption { tid: info.src_port }
            }
            value => OpenReply::Accepted {
                tid: info.src_port,
                blksize: value.unwrap_or(TFTP_DEFAULT_BLKSIZE),
            },
        },
        Some(wire::Packet::Error { code, .. }) => OpenReply::Refused(wire::error_status(code)),
        _ => OpenReply::Stray,
    }
}

fn classify_data(session: &mut Session, payload: &[u8]) -> Result<Fetched> {
    match wire::parse(payload) {
        Some(wire::Packet::Data { block, data }) if block == session.next_block => {
            if data.len() > usize::from(session.blksize) {
                return Err(Status::TFTP_INVALID_PACKET_SIZE.into());
            }
            session.pending.fill(block, data);
            if data.len() < usize::from(session.blksize) {
                session.eof = true;
            }
            session.next_block = session.next_block.wrapping_add(1);
            Ok(Fetched::Got)
        }
        Some(wire::Packet::Data { block, .. }) if block.wrapping_add(1) == session.next_block => {
            Ok(Fetched::Dup(block))
        }
        Some(wire::Packet::Error { code, message }) => {
            let text = core::str::from_utf8(message).unwrap_or("");
            warn!("tftp: error {code} from server: {text}");
            Ok(Fetched::Refused(wire::error_status(code)))
        }
        _ => Ok(Fetched::Stray),
    }
}

fn classify_fsize_reply(info: &UdpRead, payload: &[u8]) -> FsizeReply {
    match wire::parse(payload) {
        Some(wire::Packet::Oack(options)) => match options.tsize {
            Some(size) => FsizeReply::Size {
                tid: info.src_port,
                size,
            },
            None => FsizeReply::NoSize { tid: info.src_port },
        },
        // A server that starts transferring ignored the probe option.
        Some(wire::Packet::Data { .. }) => FsizeReply::NoSize { tid: info.src_port },
        Some(wire::Packet::Error { code, .. }) if code == wire::ERR_BAD_OPTION => {
            FsizeReply::Refused(Status::TFTP_NO_FILESIZE)
        }
        Some(wire::Packet::Error { code, .. }) => FsizeReply::Refused(wire::error_status(code)),
        _ => FsizeReply::Stray,
    }
}

#[allow(clippy::too_many_arguments)]
fn send_abort<E: Environment + ?Sized, D: NetDevice>(
    env: &E,
    undi: &mut UndiController<D>,
    udp: &mut UdpLayer,
    server_ip: Ipv4Address,
    gateway_ip: Ipv4Address,
    client_port: u16,
    tid: u16,
) {
    let mut buf = [0u8; 32];
    if let Some(len) = wire::build_error(&mut buf, 0, b"aborted") {
        let _ = udp.write(env, undi, server_ip, gateway_ip, client_port, tid, &buf[..len]);
    }
}

/// Passive multicast download: join the group, take blocks in order
/// without acknowledging anything, leave the group.
fn mtftp_transfer<E: Environment + ?Sized, D: NetDevice>(
    env: &mut E,
    undi: &mut UndiController<D>,
    udp: &mut UdpLayer,
    request: &ReadFileRequest<'_>,
    buffer: BufferAddr,
    capacity: u32,
) -> Result<u32> {
    let group_mac = MacAddress::from(ipv4::multicast_mac(request.mcast_ip));
    undi.join_multicast(group_mac)?;
    let result = mtftp_listen(env, undi, udp, request, buffer, capacity);
    undi.leave_multicast(group_mac);
    result
}

fn mtftp_listen<E: Environment + ?Sized, D: NetDevice>(
    env: &mut E,
    undi: &mut UndiController<D>,
    udp: &mut UdpLayer,
    request: &ReadFileRequest<'_>,
    buffer: BufferAddr,
    capacity: u32,
) -> Result<u32> {
    let client_port = if request.client_port == 0 {
        MTFTP_CLIENT_PORT
    } else {
        request.client_port
    };
    let server_port = if request.server_port == 0 {
        MTFTP_SERVER_PORT
    } else {
        request.server_port
    };
    let window_secs = timeout_or_default(request.open_timeout);
    let filter = ReadFilter {
        src_ip: Some(request.server_ip),
        dest_ip: Some(request.mcast_ip),
        src_port: Some(server_port),
        dest_port: Some(client_port),
    };
    debug!(
        "mtftp: listening on {}:{client_port} for {}",
        request.mcast_ip, request.server_ip
    );

    let mut expected: u16 = 1;
    let mut total: u32 = 0;
    // The window restarts on every accepted block; the multicast sender
    // cycles the file, so a missed block comes around again.
    let mut window = Deadline::after_secs(env, window_secs);
    loop {
        let action = match udp.read(env, undi, &filter, Some(window))? {
            None => {
                warn!("mtftp: group went silent");
                return Err(Status::TFTP_OPEN_TIMEOUT.into());
            }
            Some((_, payload)) => match wire::parse(payload) {
                Some(wire::Packet::Data { block, data }) if block == expected => {
                    let len = data.len();
                    if u64::from(total) + len as u64 > u64::from(capacity) {
                        return Err(Status::OUT_OF_RESOURCES.into());
                    }
                    if len > 0 {
                        let at = total as usize;
                        let dest = env
                            .buffer_mut(buffer, capacity as usize)
                            .ok_or(Error::from(Status::MCOPY_PROBLEM))?;
                        dest[at..at + len].copy_from_slice(data);
                    }
                    Listen::Advance(len)
                }
                Some(wire::Packet::Error { code, .. }) => {
                    return Err(wire::error_status(code).into());
                }
                _ => Listen::Stray,
            },
        };
        match action {
            Listen::Advance(len) => {
                trace!("mtftp: block {expected}, {len} bytes");
                total += len as u32;
                if len < usize::from(TFTP_DEFAULT_BLKSIZE) {
                    debug!("mtftp: downloaded {total} bytes");
                    return Ok(total);
                }
                expected = expected.wrapping_add(1);
                window = Deadline::after_secs(env, window_secs);
            }
            Listen::Stray => {}
        }
    }
}

/// TFTP wire format (RFC 1350) plus the option extension (RFC 2347).
mod wire {
    use crate::Status;

    pub const OP_RRQ: u16 = 1;
    pub const OP_DATA: u16 = 3;
    pub const OP_ACK: u16 = 4;
    pub const OP_ERROR: u16 = 5;
    pub const OP_OACK: u16 = 6;

    pub const ERR_FILE_NOT_FOUND: u16 = 1;
    pub const ERR_ACCESS_VIOLATION: u16 = 2;
    pub const ERR_DISK_FULL: u16 = 3;
    pub const ERR_BAD_OPTION: u16 = 8;

    /// Worst case: opcode, file name, mode and both options.
    pub const MAX_REQUEST_LEN: usize = 192;

    /// Options found in an option acknowledgement.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Options {
        pub blksize: Option<u16>,
        pub tsize: Option<u64>,
    }

    pub enum Packet<'a> {
        Data { block: u16, data: &'a [u8] },
        Ack(u16),
        Oack(Options),
        Error { code: u16, message: &'a [u8] },
    }

    pub fn parse(payload: &[u8]) -> Option<Packet<'_>> {
        let (op, rest) = split_u16(payload)?;
        match op {
            OP_DATA => {
                let (block, data) = split_u16(rest)?;
                Some(Packet::Data { block, data })
            }
            OP_ACK => {
                let (block, _) = split_u16(rest)?;
                Some(Packet::Ack(block))
            }
            OP_OACK => Some(Packet::Oack(parse_options(rest))),
            OP_ERROR => {
                let (code, rest) = split_u16(rest)?;
                let message = rest.split(|&b| b == 0).next().unwrap_or(rest);
                Some(Packet::Error { code, message })
            }
            _ => None,
        }
    }

    pub fn build_rrq(
        buf: &mut [u8],
        file_name: &[u8],
        blksize: Option<u16>,
        tsize_probe: bool,
    ) -> Option<usize> {
        if file_name.is_empty() || file_name.contains(&0) {
            return None;
        }
        let mut at = put(buf, 0, &OP_RRQ.to_be_bytes())?;
        at = put(buf, at, file_name)?;
        at = put(buf, at, b"\0octet\0")?;
        if let Some(size) = blksize {
            at = put(buf, at, b"blksize\0")?;
            at = put_decimal(buf, at, u64::from(size))?;
            at = put(buf, at, &[0])?;
        }
        if tsize_probe {
            at = put(buf, at, b"tsize\0")?;
            at = put(buf, at, b"0\0")?;
        }
        Some(at)
    }

    pub fn build_ack(block: u16) -> [u8; 4] {
        let op = OP_ACK.to_be_bytes();
        let num = block.to_be_bytes();
        [op[0], op[1], num[0], num[1]]
    }

    pub fn build_error(buf: &mut [u8], code: u16, message: &[u8]) -> Option<usize> {
        let mut at = put(buf, 0, &OP_ERROR.to_be_bytes())?;
        at = put(buf, at, &code.to_be_bytes())?;
        at = put(buf, at, message)?;
        put(buf, at, &[0])
    }

    /// Maps a wire error code onto the API status space.
    pub fn error_status(code: u16) -> Status {
        match code {
            ERR_FILE_NOT_FOUND => Status::TFTP_FILE_NOT_FOUND,
            ERR_ACCESS_VIOLATION => Status::TFTP_ACCESS_VIOLATION,
            _ => Status::TFTP_ERROR_OPCODE,
        }
    }

    fn split_u16(bytes: &[u8]) -> Option<(u16, &[u8])> {
        let (word, rest) = bytes.split_at_checked(2)?;
        Some((u16::from_be_bytes([word[0], word[1]]), rest))
    }

    fn parse_options(mut rest: &[u8]) -> Options {
        let mut options = Options::default();
        while let Some((name, after_name)) = take_cstr(rest) {
            let Some((value, after_value)) = take_cstr(after_name) else {
                break;
            };
            if name.eq_ignore_ascii_case(b"blksize") {
                options.blksize = parse_decimal(value).and_then(|v| u16::try_from(v).ok());
            } else if name.eq_ignore_ascii_case(b"tsize") {
                options.tsize = parse_decimal(value);
            }
            rest = after_value;
        }
        options
    }

    fn take_cstr(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
        let pos = bytes.iter().position(|&b| b == 0)?;
        Some((&bytes[..pos], &bytes[pos + 1..]))
    }

    fn parse_decimal(bytes: &[u8]) -> Option<u64> {
        if bytes.is_empty() || bytes.len() > 20 {
            return None;
        }
        let mut value: u64 = 0;
        for &b in bytes {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        }
        Some(value)
    }

    fn put(buf: &mut [u8], at: usize, bytes: &[u8]) -> Option<usize> {
        let end = at.checked_add(bytes.len())?;
        buf.get_mut(at..end)?.copy_from_slice(bytes);
        Some(end)
    }

    fn put_decimal(buf: &mut [u8], at: usize, mut value: u64) -> Option<usize> {
        let mut digits = [0u8; 20];
        let mut count = 0;
        loop {
            digits[count] = b'0' + (value % 10) as u8;
            count += 1;
            value /= 10;
            if value == 0 {
                break;
            }
        }
        let mut at = at;
        while count > 0 {
            count -= 1;
            at = put(buf, at, &[digits[count]])?;
        }
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultExt;
    use crate::config::MAX_FRAME_LEN;
    use crate::mock::{MockEnv, MockNic, arp_announcement, open_undi, udp_frame};
    use crate::udp::parse_udp_frame;
    use pxenv_raw::Addr32;
    use std::vec;
    use std::vec::Vec;

    const CLIENT_IP: Ipv4Address = Ipv4Address([192, 168, 0, 2]);
    const SERVER_IP: Ipv4Address = Ipv4Address([192, 168, 0, 10]);
    const SERVER_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x10, 0x20, 0x30];
    const NO_GW: Ipv4Address = Ipv4Address::UNSPECIFIED;
    /// First port the client allocates.
    const CLIENT_PORT: u16 = crate::config::TFTP_CLIENT_PORT_BASE;
    /// Transfer identifier the fake server answers from.
    const TID: u16 = 3001;

    fn stack() -> (MockEnv, UndiController<MockNic>, UdpLayer) {
        let env = MockEnv::new();
        let mut undi = open_undi();
        let mut udp = UdpLayer::new();
        udp.open(CLIENT_IP).unwrap();
        // The boot exchange that preceded the transfer left the server's
        // media address in the resolution cache.
        undi.device_mut()
            .rx
            .push_back(arp_announcement(SERVER_MAC, SERVER_IP));
        assert!(udp.read(&env, &mut undi, &ReadFilter::default(), None).unwrap().is_none());
        (env, undi, udp)
    }

    fn from_server(payload: &[u8]) -> Vec<u8> {
        udp_frame(
            SERVER_MAC,
            MockNic::STATION,
            SERVER_IP,
            CLIENT_IP,
            TID,
            CLIENT_PORT,
            payload,
        )
    }

    fn data_packet(block: u16, payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0, 3];
        v.extend_from_slice(&block.to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    fn oack_packet(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut v = vec![0, 6];
        for (name, value) in pairs {
            v.extend_from_slice(name);
            v.push(0);
            v.extend_from_slice(value);
            v.push(0);
        }
        v
    }

    fn error_packet(code: u16) -> Vec<u8> {
        let mut v = vec![0, 5];
        v.extend_from_slice(&code.to_be_bytes());
        v.extend_from_slice(b"nope\0");
        v
    }

    fn sent_payload(frame: &[u8]) -> &[u8] {
        let (_, span) = parse_udp_frame(frame).unwrap();
        &frame[span]
    }

    #[test]
    fn test_open_negotiates_blksize() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"1024")])));

        let mut client = TftpClient::new();
        let blksize = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 1400)
            .unwrap();
        assert_eq!(blksize, 1024);
        assert!(client.is_open());

        let tx = &undi.device().tx;
        assert_eq!(tx.len(), 2, "request then option acknowledgement");
        let rrq = sent_payload(&tx[0]);
        assert_eq!(&rrq[..2], &[0, 1]);
        assert!(rrq.windows(8).any(|w| w == b"blksize\0"));
        assert_eq!(sent_payload(&tx[1]), &wire::build_ack(0));
    }

    #[test]
    fn test_open_accepts_bare_data_as_512() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[0xaa; 512])));
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(2, &[0xbb; 40])));

        let mut client = TftpClient::new();
        let blksize = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 1400)
            .unwrap();
        assert_eq!(blksize, 512);

        // Block 1 was stashed during open and delivered by the first read.
        let (number, data) = client.read(&env, &mut undi, &mut udp).unwrap();
        assert_eq!(number, 1);
        assert_eq!(data.len(), 512);
        let (number, data) = client.read(&env, &mut undi, &mut udp).unwrap();
        assert_eq!((number, data.len()), (2, 40));

        // Short block ended the file.
        assert_eq!(
            client.read(&env, &mut undi, &mut udp).status(),
            Status::TFTP_CLOSED
        );
        let tx = &undi.device().tx;
        assert_eq!(tx.len(), 3, "rrq, ack 1, ack 2");
        assert_eq!(sent_payload(&tx[1]), &wire::build_ack(1));
        assert_eq!(sent_payload(&tx[2]), &wire::build_ack(2));
    }

    #[test]
    fn test_open_rejects_small_block_request() {
        let (env, mut undi, mut udp) = stack();
        let mut client = TftpClient::new();
        let status = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 256)
            .status();
        assert_eq!(status, Status::TFTP_INVALID_PACKET_SIZE);
        assert!(undi.device().tx.is_empty(), "nothing was sent");
    }

    #[test]
    fn test_open_rejects_out_of_range_oack() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"2048")])));

        let mut client = TftpClient::new();
        let status = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 1400)
            .status();
        assert_eq!(status, Status::TFTP_INVALID_PACKET_SIZE);
        assert!(!client.is_open());
        let last = sent_payload(undi.device().tx.last().unwrap());
        assert_eq!(&last[..4], &[0, 5, 0, 8], "bad-option error went out");
    }

    #[test]
    fn test_open_maps_server_error() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut().rx.push_back(from_server(&error_packet(1)));

        let mut client = TftpClient::new();
        let status = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"missing", 0, 1400)
            .status();
        assert_eq!(status, Status::TFTP_FILE_NOT_FOUND);
        assert!(!client.is_open());
        // A single request went out; a remote refusal is not retried.
        assert_eq!(undi.device().tx.len(), 1);
    }

    #[test]
    fn test_open_times_out_after_retries() {
        let (env, mut undi, mut udp) = stack();
        let mut client = TftpClient::new();
        let status = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 1400)
            .status();
        assert_eq!(status, Status::TFTP_OPEN_TIMEOUT);
        assert_eq!(
            undi.device().tx.len(),
            TFTP_MAX_RETRIES as usize,
            "one request per attempt"
        );
    }

    #[test]
    fn test_double_open_refused() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"512")])));
        let mut client = TftpClient::new();
        client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"a", 0, 512)
            .unwrap();
        let status = client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"b", 0, 512)
            .status();
        assert_eq!(status, Status::TFTP_OPEN);
    }

    #[test]
    fn test_read_reacks_duplicate_block() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"512")])));
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[1; 512])));
        // The server retransmits block 1 before sending block 2.
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[1; 512])));
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(2, &[2; 100])));

        let mut client = TftpClient::new();
        client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 512)
            .unwrap();
        let (number, _) = client.read(&env, &mut undi, &mut udp).unwrap();
        assert_eq!(number, 1);
        let (number, data) = client.read(&env, &mut undi, &mut udp).unwrap();
        assert_eq!((number, data.len()), (2, 100));

        let acks: Vec<&[u8]> = undi.device().tx[1..].iter().map(|f| sent_payload(f)).collect();
        assert_eq!(
            acks,
            [
                &wire::build_ack(0)[..],
                &wire::build_ack(1)[..],
                &wire::build_ack(1)[..],
                &wire::build_ack(2)[..],
            ],
            "duplicate was re-acknowledged"
        );

        // Block 2 came up short of the negotiated size, so the file is
        // complete and any further read says so.
        assert_eq!(
            client.read(&env, &mut undi, &mut udp).status(),
            Status::TFTP_CLOSED
        );
        assert!(client.is_open(), "only close() retires the session");
        assert_eq!(client.close().status(), Status::SUCCESS);
    }

    #[test]
    fn test_read_timeout_keeps_session() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"512")])));

        let mut client = TftpClient::new();
        client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 512)
            .unwrap();
        assert_eq!(
            client.read(&env, &mut undi, &mut udp).status(),
            Status::TFTP_READ_TIMEOUT
        );
        assert!(client.is_open(), "a timeout is retryable");

        // The late block still gets through on the next call.
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[7; 42])));
        let (number, data) = client.read(&env, &mut undi, &mut udp).unwrap();
        assert_eq!((number, data.len()), (1, 42));
    }

    #[test]
    fn test_server_error_tears_down_session() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"blksize", b"512")])));
        undi.device_mut().rx.push_back(from_server(&error_packet(2)));

        let mut client = TftpClient::new();
        client
            .open(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img", 0, 512)
            .unwrap();
        assert_eq!(
            client.read(&env, &mut undi, &mut udp).status(),
            Status::TFTP_ACCESS_VIOLATION
        );
        assert!(!client.is_open());
        assert_eq!(client.close().status(), Status::TFTP_CLOSED);
    }

    #[test]
    fn test_close_without_session() {
        let mut client = TftpClient::new();
        assert_eq!(client.close().status(), Status::TFTP_CLOSED);
    }

    #[test]
    fn test_get_fsize_reads_tsize() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&oack_packet(&[(b"tsize", b"8192")])));

        let mut client = TftpClient::new();
        let size = client
            .get_fsize(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img")
            .unwrap();
        assert_eq!(size, 8192);
        assert!(!client.is_open(), "the probe leaves no session");

        let tx = &undi.device().tx;
        assert_eq!(tx.len(), 2);
        let rrq = sent_payload(&tx[0]);
        assert!(rrq.windows(6).any(|w| w == b"tsize\0"));
        assert!(!rrq.windows(8).any(|w| w == b"blksize\0"));
        let abort = sent_payload(&tx[1]);
        assert_eq!(&abort[..2], &[0, 5], "transfer was aborted after the probe");
    }

    #[test]
    fn test_get_fsize_without_tsize_fails() {
        let (env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[0; 300])));

        let mut client = TftpClient::new();
        let status = client
            .get_fsize(&env, &mut undi, &mut udp, SERVER_IP, NO_GW, b"boot.img")
            .status();
        assert_eq!(status, Status::TFTP_NO_FILESIZE);
    }

    #[test]
    fn test_read_file_downloads_and_closes() {
        let (mut env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[0xaa; 512])));
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(2, &[0xbb; 200])));

        let mut client = TftpClient::new();
        let request = ReadFileRequest {
            file_name: b"vmlinuz",
            server_ip: SERVER_IP,
            gateway_ip: NO_GW,
            mcast_ip: Ipv4Address::UNSPECIFIED,
            client_port: 0,
            server_port: 0,
            open_timeout: 0,
            reopen_delay: 0,
        };
        let buffer = BufferAddr::Linear(Addr32(MockEnv::ARENA_BASE));
        let total = client
            .read_file(&mut env, &mut undi, &mut udp, &request, buffer, 4096)
            .unwrap();
        assert_eq!(total, 712);
        assert!(!client.is_open(), "the session closes itself");

        let copy = env.buffer(buffer, 712).unwrap();
        assert!(copy[..512].iter().all(|&b| b == 0xaa));
        assert!(copy[512..].iter().all(|&b| b == 0xbb));
        assert_eq!(undi.device().tx.len(), 3, "rrq, ack 1, ack 2");
    }

    #[test]
    fn test_read_file_overflow_aborts() {
        let (mut env, mut undi, mut udp) = stack();
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(1, &[0xaa; 512])));
        undi.device_mut()
            .rx
            .push_back(from_server(&data_packet(2, &[0xbb; 200])));

        let mut client = TftpClient::new();
        let request = ReadFileRequest {
            file_name: b"vmlinuz",
            server_ip: SERVER_IP,
            gateway_ip: NO_GW,
            mcast_ip: Ipv4Address::UNSPECIFIED,
            client_port: 0,
            server_port: 0,
            open_timeout: 0,
            reopen_delay: 0,
        };
        let buffer = BufferAddr::Linear(Addr32(MockEnv::ARENA_BASE));
        let status = client
            .read_file(&mut env, &mut undi, &mut udp, &request, buffer, 600)
            .status();
        assert_eq!(status, Status::OUT_OF_RESOURCES);
        assert!(!client.is_open());

        let last = sent_payload(undi.device().tx.last().unwrap());
        assert_eq!(&last[..4], &[0, 5, 0, 3], "disk-full error went out");
    }

    #[test]
    fn test_read_file_multicast_listen() {
        let (mut env, mut undi, mut udp) = stack();
        let group = Ipv4Address([224, 1, 1, 9]);
        let group_mac = ipv4::multicast_mac(group);
        let mcast = |block: u16, payload: &[u8]| {
            udp_frame(
                SERVER_MAC,
                group_mac,
                SERVER_IP,
                group,
                MTFTP_SERVER_PORT,
                MTFTP_CLIENT_PORT,
                &data_packet(block, payload),
            )
        };
        // Joined mid-cycle: a block from the previous lap goes by first.
        undi.device_mut().rx.push_back(mcast(2, &[0x11; 512]));
        undi.device_mut().rx.push_back(mcast(1, &[0xaa; 512]));
        undi.device_mut().rx.push_back(mcast(2, &[0xbb; 512]));
        undi.device_mut().rx.push_back(mcast(3, &[0xcc; 100]));

        let mut client = TftpClient::new();
        let request = ReadFileRequest {
            file_name: b"vmlinuz",
            server_ip: SERVER_IP,
            gateway_ip: NO_GW,
            mcast_ip: group,
            client_port: 0,
            server_port: 0,
            open_timeout: 2,
            // Zero: skip the unicast attempt, listen right away.
            reopen_delay: 0,
        };
        let buffer = BufferAddr::Linear(Addr32(MockEnv::ARENA_BASE));
        let total = client
            .read_file(&mut env, &mut undi, &mut udp, &request, buffer, 4096)
            .unwrap();
        assert_eq!(total, 1124);
        assert!(undi.device().tx.is_empty(), "a passive listener sends nothing");

        let copy = env.buffer(buffer, 1124).unwrap();
        assert!(copy[..512].iter().all(|&b| b == 0xaa));
        assert!(copy[512..1024].iter().all(|&b| b == 0xbb));
        assert!(copy[1024..].iter().all(|&b| b == 0xcc));

        // The group membership was dropped on the way out.
        undi.device_mut().rx.push_back(mcast(1, &[0; 512]));
        let mut buf = [0u8; MAX_FRAME_LEN];
        assert!(undi.poll_frame(&mut buf).is_none());
    }

    #[test]
    fn test_read_file_multicast_timeout() {
        let (mut env, mut undi, mut udp) = stack();
        let mut client = TftpClient::new();
        let request = ReadFileRequest {
            file_name: b"vmlinuz",
            server_ip: SERVER_IP,
            gateway_ip: NO_GW,
            mcast_ip: Ipv4Address([224, 1, 1, 9]),
            client_port: 0,
            server_port: 0,
            open_timeout: 1,
            reopen_delay: 0,
        };
        let buffer = BufferAddr::Linear(Addr32(MockEnv::ARENA_BASE));
        let status = client
            .read_file(&mut env, &mut undi, &mut udp, &request, buffer, 4096)
            .status();
        assert_eq!(status, Status::TFTP_OPEN_TIMEOUT);
    }

    #[test]
    fn test_rrq_wire_format() {
        let mut buf = [0u8; wire::MAX_REQUEST_LEN];
        let len = wire::build_rrq(&mut buf, b"boot/pxe.0", Some(1468), false).unwrap();
        let expected = b"\x00\x01boot/pxe.0\0octet\0blksize\01468\0";
        assert_eq!(&buf[..len], expected);

        let len = wire::build_rrq(&mut buf, b"k", None, true).unwrap();
        assert_eq!(&buf[..len], b"\x00\x01k\0octet\0tsize\00\0");

        assert!(wire::build_rrq(&mut buf, b"", None, false).is_none());
        assert!(wire::build_rrq(&mut buf, b"a\0b", None, false).is_none());
    }

    #[test]
    fn test_oack_option_parsing() {
        let payload = oack_packet(&[(b"BLKSIZE", b"1024"), (b"tsize", b"123456")]);
        let Some(wire::Packet::Oack(options)) = wire::parse(&payload) else {
            panic!("not an option acknowledgement");
        };
        assert_eq!(options.blksize, Some(1024));
        assert_eq!(options.tsize, Some(123_456));

        // Malformed numbers are ignored rather than fatal.
        let payload = oack_packet(&[(b"blksize", b"12x4")]);
        let Some(wire::Packet::Oack(options)) = wire::parse(&payload) else {
            panic!("not an option acknowledgement");
        };
        assert_eq!(options.blksize, None);
    }
}
