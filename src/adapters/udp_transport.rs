//! UDP broadcast transport.
//!
//! Implements [`TransportPort`] over a `std::net::UdpSocket` (lwIP on the
//! ESP32, the host stack in tests).  The socket is bound to
//! `0.0.0.0:<port>` with `SO_BROADCAST` set and a read timeout, and sends
//! to the subnet broadcast address on the same port.  Because the node
//! listens on the port it broadcasts to, it hears its own datagrams; the
//! core filters those out.
//!
//! The target defaults to the limited broadcast address
//! `255.255.255.255` until [`UdpBroadcastTransport::retarget`] is called
//! with the link's assigned address.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::{info, trace, warn};

use crate::app::ports::{MAX_PAYLOAD, Payload, TransportPort};
use crate::error::CommsError;

/// Subnet broadcast address for a /24: `a.b.c.d` → `a.b.c.255`.
pub fn broadcast_addr(ip: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = ip.octets();
    Ipv4Addr::new(a, b, c, 255)
}

pub struct UdpBroadcastTransport {
    socket: UdpSocket,
    target: SocketAddrV4,
    port: u16,
}

impl UdpBroadcastTransport {
    /// Bind `0.0.0.0:port` for broadcast send/receive.
    pub fn bind(port: u16, recv_timeout: Duration) -> Result<Self, CommsError> {
        Self::with_target(
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port),
            SocketAddrV4::new(Ipv4Addr::BROADCAST, port),
            recv_timeout,
        )
    }

    /// Bind `local` and send to `target`.  Loopback pairs use this in tests.
    pub fn with_target(
        local: SocketAddrV4,
        target: SocketAddrV4,
        recv_timeout: Duration,
    ) -> Result<Self, CommsError> {
        let socket = UdpSocket::bind(local).map_err(|e| {
            warn!("UDP: bind {} failed: {}", local, e);
            CommsError::BindFailed
        })?;
        socket
            .set_broadcast(true)
            .and_then(|()| socket.set_read_timeout(Some(recv_timeout)))
            .map_err(|e| {
                warn!("UDP: socket options failed: {}", e);
                CommsError::BindFailed
            })?;

        let port = socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(local.port());
        info!("UDP: bound {} -> {}", local, target);
        Ok(Self {
            socket,
            target,
            port,
        })
    }

    /// Point broadcasts at the subnet of `local_ip`.
    pub fn retarget(&mut self, local_ip: Ipv4Addr) {
        let target = SocketAddrV4::new(broadcast_addr(local_ip), self.target.port());
        if target != self.target {
            info!("UDP: broadcast target {} -> {}", self.target, target);
            self.target = target;
        }
    }

    pub fn target(&self) -> SocketAddrV4 {
        self.target
    }

    /// Port the socket is actually bound to.
    pub fn local_port(&self) -> u16 {
        self.port
    }
}

impl TransportPort for UdpBroadcastTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        match self.socket.send_to(payload, self.target) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("UDP: send to {} failed: {}", self.target, e);
                Err(CommsError::SendFailed)
            }
        }
    }

    fn recv(&mut self) -> Option<Payload> {
        let mut buf = [0u8; MAX_PAYLOAD];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                trace!("UDP: {} bytes from {}", len, from);
                Payload::from_slice(&buf[..len.min(MAX_PAYLOAD)]).ok()
            }
            Err(ref e)
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                None
            }
            Err(e) => {
                trace!("UDP: recv error: {}", e);
                None
            }
        }
    }
}
