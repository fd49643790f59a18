use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::{anyhow, Context, Result};

use crate::engine::Detection;

use super::wire::encode_detections;

/// Fire-and-forget UDP sender for detection datagrams.
///
/// One datagram per `send`, no acknowledgment or retry. Send failures are
/// logged and counted, never returned.
#[derive(Debug)]
pub struct DetectionBroadcaster {
    socket: Option<UdpSocket>,
    stats: BroadcastStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
}

impl DetectionBroadcaster {
    /// Bind an outbound socket on `0.0.0.0:local_port` with broadcast enabled.
    ///
    /// Port 0 lets the OS choose. Bind failure is an error; a refused
    /// broadcast option is only logged.
    pub fn configure(local_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", local_port))
            .with_context(|| format!("failed to bind UDP socket on port {}", local_port))?;
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("failed to enable UDP broadcast: {}", e);
        }
        match socket.local_addr() {
            Ok(addr) => log::info!("detection transport bound to {}", addr),
            Err(e) => log::debug!("local address unavailable: {}", e),
        }
        Ok(Self {
            socket: Some(socket),
            stats: BroadcastStats::default(),
        })
    }

    /// Serialize `detections` and send them as one datagram.
    ///
    /// Returns whether the datagram was handed to the OS.
    pub fn send(&mut self, detections: &[Detection], address: &str, port: u16) -> bool {
        match self.try_send(detections, address, port) {
            Ok(bytes) => {
                self.stats.datagrams_sent += 1;
                self.stats.bytes_sent += bytes as u64;
                log::debug!(
                    "sent {} detections ({} bytes) to {}:{}",
                    detections.len(),
                    bytes,
                    address,
                    port
                );
                true
            }
            Err(e) => {
                self.stats.send_errors += 1;
                log::error!("failed to send detections to {}:{}: {:#}", address, port, e);
                false
            }
        }
    }

    fn try_send(&self, detections: &[Detection], address: &str, port: u16) -> Result<usize> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| anyhow!("transport is closed"))?;
        let destination = resolve(address, port)?;
        let payload = encode_detections(detections);
        let sent = socket
            .send_to(payload.as_bytes(), destination)
            .context("send_to failed")?;
        if sent != payload.len() {
            return Err(anyhow!(
                "datagram truncated: {} of {} bytes sent",
                sent,
                payload.len()
            ));
        }
        Ok(sent)
    }

    /// Release the socket. Safe to call more than once.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            log::info!(
                "detection transport closed ({} datagrams, {} send errors)",
                self.stats.datagrams_sent,
                self.stats.send_errors
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn stats(&self) -> BroadcastStats {
        self.stats
    }
}

impl Drop for DetectionBroadcaster {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    (address, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}:{}", address, port))?
        .next()
        .ok_or_else(|| anyhow!("no address for {}:{}", address, port))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn close_is_idempotent() -> Result<()> {
        let mut transport = DetectionBroadcaster::configure(0)?;
        assert!(transport.is_open());
        transport.close();
        transport.close();
        assert!(!transport.is_open());
        assert!(transport.local_addr().is_none());
        Ok(())
    }

    #[test]
    fn send_after_close_is_counted_not_raised() -> Result<()> {
        let mut transport = DetectionBroadcaster::configure(0)?;
        transport.close();
        assert!(!transport.send(&[], "127.0.0.1", 9));
        assert_eq!(transport.stats().send_errors, 1);
        assert_eq!(transport.stats().datagrams_sent, 0);
        Ok(())
    }

    #[test]
    fn unresolvable_destination_is_counted() -> Result<()> {
        let mut transport = DetectionBroadcaster::configure(0)?;
        assert!(!transport.send(&[], "not an address", 9));
        assert_eq!(transport.stats().send_errors, 1);
        Ok(())
    }

    #[test]
    fn bind_conflict_is_an_error() -> Result<()> {
        let holder = UdpSocket::bind("0.0.0.0:0")?;
        let port = holder.local_addr()?.port();
        assert!(DetectionBroadcaster::configure(port).is_err());
        Ok(())
    }

    #[test]
    fn empty_collection_still_sends_a_datagram() -> Result<()> {
        let receiver = UdpSocket::bind("127.0.0.1:0")?;
        receiver.set_read_timeout(Some(Duration::from_secs(2)))?;
        let port = receiver.local_addr()?.port();

        let mut transport = DetectionBroadcaster::configure(0)?;
        assert!(transport.send(&[], "127.0.0.1", port));

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf)?;
        assert_eq!(len, 0);
        assert_eq!(transport.stats().datagrams_sent, 1);
        assert_eq!(transport.stats().bytes_sent, 0);
        Ok(())
    }
}
