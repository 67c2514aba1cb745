use std::net::SocketAddr;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::net::UdpSocket;

/// Raw unreliable datagram channel bound to one local endpoint.
///
/// This trait decouples protocol logic from the socket so the handshake and the session layer
///  can be exercised against a scripted channel in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn local_addr(&self) -> anyhow::Result<SocketAddr>;

    async fn send(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()>;

    /// Receives one datagram into `buf`, returning its length and sender. A datagram longer
    ///  than `buf` is truncated by the OS; sizing `buf` to the configured maximum datagram
    ///  size avoids that.
    async fn recv(&self, buf: &mut [u8]) -> anyhow::Result<(usize, SocketAddr)>;
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<UdpTransport> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(UdpTransport { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn send(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        self.socket.send_to(buf, to).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> anyhow::Result<(usize, SocketAddr)> {
        let (len, from) = self.socket.recv_from(buf).await?;
        Ok((len, from))
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use super::*;

    async fn ephemeral() -> UdpTransport {
        UdpTransport::bind(SocketAddr::from_str("127.0.0.1:0").unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_loopback_send_recv() {
        let a = ephemeral().await;
        let b = ephemeral().await;

        a.send(b.local_addr().unwrap(), b"hello").await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, a.local_addr().unwrap());
    }
}
