use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Well-known UDP port for SRDP adapters.
pub const SRDP_UDP_PORT: u16 = 1910;

/// UDP datagram transport.
///
/// Each frame travels in its own datagram. When no fixed host is configured,
/// replies and notifications go to whoever sent the most recent datagram.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peer: Option<SocketAddr>,
    fixed_peer: bool,
}

impl UdpTransport {
    /// Bind a UDP socket on `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|e| TransportError::Bind { addr, source: e })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "listening on udp socket");

        Ok(Self {
            socket,
            local_addr,
            peer: None,
            fixed_peer: false,
        })
    }

    /// Bind an ephemeral local socket and fix the peer to `host`.
    ///
    /// Used by the host side to talk to an adapter at a known address.
    pub fn connect(host: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if host.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket =
            UdpSocket::bind(local).map_err(|e| TransportError::Connect { addr: host, source: e })?;
        let local_addr = socket.local_addr()?;
        debug!(%local_addr, %host, "udp transport targeting host");

        Ok(Self {
            socket,
            local_addr,
            peer: Some(host),
            fixed_peer: true,
        })
    }

    /// Send every datagram to `host` regardless of who last sent to us.
    pub fn with_host(mut self, host: SocketAddr) -> Self {
        self.peer = Some(host);
        self.fixed_peer = true;
        self
    }

    /// Set the blocking read timeout. `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Switch the socket between blocking and non-blocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.socket.set_nonblocking(nonblocking).map_err(Into::into)
    }

    /// The local address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The address outgoing datagrams are sent to, if known.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.socket.recv_from(buf) {
                Ok((n, from)) => {
                    trace!(%from, len = n, "datagram received");
                    if !self.fixed_peer {
                        self.peer = Some(from);
                    }
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        let sent = self.socket.send_to(data, peer)?;
        if sent != data.len() {
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::WriteZero,
                format!("datagram truncated ({sent} of {} bytes)", data.len()),
            )));
        }
        trace!(%peer, len = sent, "datagram sent");
        Ok(sent)
    }

    fn name(&self) -> &'static str {
        "udp"
    }

    fn preserves_boundaries(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("peer", &self.peer)
            .field("fixed_peer", &self.fixed_peer)
            .finish()
    }
}
