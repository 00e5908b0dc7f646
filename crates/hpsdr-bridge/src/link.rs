//! Outbound side of the session: where replies and EP6 frames go.
//!
//! The link owns the shared UDP socket, the write half of the attached TCP
//! client (if any) and the UDP peer captured by the last start command. An
//! attached TCP client always wins: outbound frames go over it until it is
//! detached or a send fails.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::UdpSocket;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use hpsdr_core::error::{Error, Result};
use hpsdr_core::transport::FrameOutput;

/// Shared outbound link. Cloned into the frame generator as an
/// `Arc<dyn FrameOutput>`.
#[derive(Debug)]
pub struct Link {
    udp: Arc<UdpSocket>,
    tcp: Mutex<Option<OwnedWriteHalf>>,
    tcp_attached: AtomicBool,
    peer: Mutex<Option<SocketAddr>>,
    has_peer: AtomicBool,
}

impl Link {
    pub fn new(udp: Arc<UdpSocket>) -> Self {
        Self {
            udp,
            tcp: Mutex::new(None),
            tcp_attached: AtomicBool::new(false),
            peer: Mutex::new(None),
            has_peer: AtomicBool::new(false),
        }
    }

    /// Whether a TCP client currently owns the outbound path.
    pub fn tcp_attached(&self) -> bool {
        self.tcp_attached.load(Ordering::Acquire)
    }

    /// Make `writer` the outbound transport.
    pub async fn attach_tcp(&self, writer: OwnedWriteHalf) {
        *self.tcp.lock().await = Some(writer);
        self.tcp_attached.store(true, Ordering::Release);
    }

    /// Close the TCP client's write half. Returns `true` if one was attached.
    pub async fn detach_tcp(&self) -> bool {
        let writer = self.tcp.lock().await.take();
        self.tcp_attached.store(false, Ordering::Release);
        match writer {
            Some(mut writer) => {
                if let Err(e) = writer.shutdown().await {
                    tracing::debug!(error = %e, "TCP shutdown failed");
                }
                true
            }
            None => false,
        }
    }

    /// Set the UDP destination for outbound frames.
    pub async fn set_udp_peer(&self, peer: Option<SocketAddr>) {
        *self.peer.lock().await = peer;
        self.has_peer.store(peer.is_some(), Ordering::Release);
    }

    pub async fn udp_peer(&self) -> Option<SocketAddr> {
        *self.peer.lock().await
    }

    /// Send a datagram to `addr` regardless of the streaming peer.
    pub async fn send_udp(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        tracing::trace!(remote = %addr, bytes = data.len(), "Sending datagram");
        self.udp.send_to(data, addr).await.map_err(|e| {
            tracing::error!(remote = %addr, error = %e, "Failed to send datagram");
            Error::Io(e)
        })?;
        Ok(())
    }

    /// Write `data` to the TCP client. A failed write detaches the client.
    pub async fn send_tcp(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.tcp.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = writer.write_all(data).await {
            tracing::warn!(error = %e, "TCP send failed, closing client");
            *guard = None;
            self.tcp_attached.store(false, Ordering::Release);
            return Err(Error::ConnectionLost);
        }
        Ok(())
    }
}

#[async_trait]
impl FrameOutput for Link {
    async fn send_frame(&self, frame: &[u8]) -> Result<()> {
        if self.tcp_attached() {
            return self.send_tcp(frame).await;
        }
        let peer = self.udp_peer().await.ok_or(Error::NotConnected)?;
        self.send_udp(frame, peer).await
    }

    fn is_connected(&self) -> bool {
        self.tcp_attached() || self.has_peer.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_udp() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    #[tokio::test]
    async fn no_peer_is_not_connected() {
        let link = Link::new(loopback_udp().await);
        assert!(!link.is_connected());
        assert!(matches!(
            link.send_frame(&[0u8; 8]).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn frames_go_to_udp_peer() {
        let link = Link::new(loopback_udp().await);
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        link.set_udp_peer(Some(client.local_addr().unwrap())).await;
        assert!(link.is_connected());

        link.send_frame(b"frame").await.unwrap();
        let mut buf = [0u8; 16];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"frame");
    }

    #[tokio::test]
    async fn tcp_client_takes_precedence() {
        let link = Link::new(loopback_udp().await);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        let (_read, write) = server_side.into_split();

        link.attach_tcp(write).await;
        assert!(link.tcp_attached());
        link.send_frame(b"over-tcp").await.unwrap();

        let mut buf = [0u8; 8];
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"over-tcp");

        assert!(link.detach_tcp().await);
        assert!(!link.tcp_attached());
        assert!(!link.detach_tcp().await);
    }
}
