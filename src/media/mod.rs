use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)] use mockall::automock;

pub mod demo;
pub mod sequence;

/// An uncompressed frame as produced by a source and consumed by a display: packed RGB,
///  row-major. This crate never looks inside `data` - it is the currency between the external
///  collaborators.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

/// Where the producer's frames come from - a camera, a file, a test pattern.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// the next raw frame, or `None` when the stream has ended
    async fn next_frame(&mut self) -> anyhow::Result<Option<RawFrame>>;
}

/// Compresses and decompresses frames. Real implementations are lossy; a failure to encode or
///  decode a single frame is reported to the caller and must not end the stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FrameCodec: Send + Sync + 'static {
    async fn encode(&self, frame: &RawFrame) -> anyhow::Result<Bytes>;

    async fn decode(&self, payload: &[u8]) -> anyhow::Result<RawFrame>;
}

/// Renders decoded frames, one surface per peer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DisplaySink: Send + Sync + 'static {
    async fn show(&self, peer: SocketAddr, frame: RawFrame) -> anyhow::Result<()>;
}
