//! Datagram transport.
//!
//! [`Transport`] is the seam between protocol logic and the network: one
//! send primitive and one receive-with-timeout primitive.  [`UdpTransport`]
//! implements it over a blocking `std::net::UdpSocket`; tests substitute a
//! scripted in-memory transport.
//!
//! Replies are accepted only from the resolved server endpoint, compared by
//! canonical IP (an IPv4-mapped IPv6 source matches its IPv4 address) and
//! port.  A server on a multi-homed host that answers from a different
//! address than the one resolved is therefore not heard.
//!
//! A transport serves one outstanding operation at a time.  Methods take
//! `&mut self`, so sharing one across callers requires external locking.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::codec::MAX_DATAGRAM;
use crate::simulator::LossSimulator;

/// What happened to a datagram handed to [`Transport::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Discarded by the loss simulator; nothing went on the wire.
    Dropped,
}

/// Errors that can arise from transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot resolve server address: {0}")]
    Resolve(String),
    #[error("cannot bind local socket: {0}")]
    Bind(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("timed out waiting for a datagram")]
    Timeout,
    /// The datagram was longer than [`MAX_DATAGRAM`] and was discarded.
    #[error("received datagram exceeds 1024 bytes")]
    Oversized,
}

/// Datagram send/receive primitives used by the dispatcher and monitor.
pub trait Transport {
    fn send(&mut self, datagram: &[u8]) -> Result<SendOutcome, TransportError>;

    /// Block until one datagram arrives or `timeout` elapses.
    ///
    /// A datagram longer than [`MAX_DATAGRAM`] is reported as
    /// [`TransportError::Oversized`] rather than truncated.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// Counters kept by [`UdpTransport`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportStats {
    pub datagrams_sent: u64,
    pub datagrams_dropped: u64,
    pub datagrams_received: u64,
    pub timeouts: u64,
    pub oversized: u64,
}

/// A UDP endpoint talking to a single server.
///
/// The server address is resolved once at construction.  The socket is
/// closed when the transport is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    server: SocketAddr,
    #[cfg_attr(not(feature = "simulate-loss"), allow(dead_code))]
    loss: LossSimulator,
    stats: TransportStats,
}

impl UdpTransport {
    /// Resolve `server` and bind an ephemeral local socket of the same family.
    pub fn connect(server: &str, loss: LossSimulator) -> Result<Self, TransportError> {
        let server = resolve(server)?;
        let local: SocketAddr = if server.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(TransportError::Bind)?;
        Ok(Self::from_socket(socket, server, loss))
    }

    /// Wrap an already-bound socket.
    pub fn from_socket(socket: UdpSocket, server: SocketAddr, loss: LossSimulator) -> Self {
        Self {
            socket,
            server,
            loss,
            stats: TransportStats::default(),
        }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    #[cfg(feature = "simulate-loss")]
    fn simulated_drop(&mut self) -> bool {
        self.loss.should_drop()
    }

    #[cfg(not(feature = "simulate-loss"))]
    fn simulated_drop(&mut self) -> bool {
        false
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<SendOutcome, TransportError> {
        if self.simulated_drop() {
            info!(
                "simulating datagram loss, not sending {} bytes",
                datagram.len()
            );
            self.stats.datagrams_dropped += 1;
            return Ok(SendOutcome::Dropped);
        }
        self.socket
            .send_to(datagram, self.server)
            .map_err(TransportError::Send)?;
        debug!("sent {} bytes to {}", datagram.len(), self.server);
        self.stats.datagrams_sent += 1;
        Ok(SendOutcome::Sent)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + timeout;
        // One spare byte so an over-long datagram is detected, not truncated.
        let mut buf = [0u8; MAX_DATAGRAM + 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.stats.timeouts += 1;
                return Err(TransportError::Timeout);
            }
            self.socket
                .set_read_timeout(Some(remaining))
                .map_err(TransportError::Receive)?;

            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) if same_peer(from, self.server) => {
                    debug!("received {len} bytes from {from}");
                    self.stats.datagrams_received += 1;
                    if len > MAX_DATAGRAM {
                        warn!("datagram from {from} exceeds {} bytes", MAX_DATAGRAM);
                        self.stats.oversized += 1;
                        return Err(TransportError::Oversized);
                    }
                    return Ok(buf[..len].to_vec());
                }
                Ok((len, from)) => {
                    warn!("discarding {len} bytes from unexpected peer {from}");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => {
                    self.stats.timeouts += 1;
                    return Err(TransportError::Timeout);
                }
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }
    }
}

fn resolve(server: &str) -> Result<SocketAddr, TransportError> {
    server
        .to_socket_addrs()
        .map_err(|e| TransportError::Resolve(format!("{server}: {e}")))?
        .next()
        .ok_or_else(|| TransportError::Resolve(format!("{server}: no addresses")))
}

fn same_peer(a: SocketAddr, b: SocketAddr) -> bool {
    a.port() == b.port() && a.ip().to_canonical() == b.ip().to_canonical()
}

/// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
