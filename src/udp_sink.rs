//! UDP emitter (component H).
//!
//! One unconnected socket, bound once at startup, sending each page
//! datagram to a fixed loopback destination. A failed send is logged and
//! otherwise ignored: the next datagram is attempted normally.

use std::net::UdpSocket;

use log::warn;

use crate::error::Error;

/// Sends page datagrams to `127.0.0.1:{port}`.
pub struct UdpSink {
    socket: UdpSocket,
    dest: std::net::SocketAddr,
    send_errors: u64,
}

impl UdpSink {
    /// Bind a fresh unconnected socket targeting `127.0.0.1:port`.
    pub fn new(port: u16) -> Result<Self, Error> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        let dest = std::net::SocketAddr::from(([127, 0, 0, 1], port));
        Ok(Self {
            socket,
            dest,
            send_errors: 0,
        })
    }

    /// Send one datagram. Failures are logged, counted, and otherwise
    /// swallowed; the caller should keep running.
    pub fn send(&mut self, datagram: &[u8]) {
        if let Err(e) = self.socket.send_to(datagram, self.dest) {
            warn!("UDP send to {} failed: {e}", self.dest);
            self.send_errors += 1;
        }
    }

    /// Number of send failures observed so far.
    pub fn send_errors(&self) -> u64 {
        self.send_errors
    }
}
