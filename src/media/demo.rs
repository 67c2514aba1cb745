//! Stand-in media collaborators for demos and tests: a deterministic test pattern instead of a
//!  camera, an uncompressed codec instead of a lossy one, and a display that logs instead of
//!  rendering. Real deployments plug in their own implementations of the traits.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use bytes_varint::try_get_fixed::TryGetFixedSupport;
use tokio::time::sleep;
use tracing::debug;

use crate::media::{DisplaySink, FrameCodec, FrameSource, RawFrame};

/// Produces a fixed number of frames of a moving gradient pattern, paced at a configurable
///  interval.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    remaining: u64,
    frame_interval: Duration,
    next_seq: u32,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, frame_count: u64, frame_interval: Duration) -> TestPatternSource {
        TestPatternSource {
            width,
            height,
            remaining: frame_count,
            frame_interval,
            next_seq: 0,
        }
    }
}

#[async_trait]
impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> anyhow::Result<Option<RawFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        sleep(self.frame_interval).await;

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let mut data = BytesMut::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.put_u8((x.wrapping_add(seq) % 256) as u8);
                data.put_u8((y.wrapping_add(seq) % 256) as u8);
                data.put_u8((x.wrapping_add(y) % 256) as u8);
            }
        }

        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            data: data.freeze(),
        }))
    }
}

/// Stores frames as `[width][height][rgb bytes]` without any compression. Good enough to move
///  test patterns around; a real deployment wants an actual image codec here.
pub struct UncompressedCodec;

#[async_trait]
impl FrameCodec for UncompressedCodec {
    async fn encode(&self, frame: &RawFrame) -> anyhow::Result<Bytes> {
        let mut buf = BytesMut::with_capacity(8 + frame.data.len());
        buf.put_u32(frame.width);
        buf.put_u32(frame.height);
        buf.put_slice(&frame.data);
        Ok(buf.freeze())
    }

    async fn decode(&self, payload: &[u8]) -> anyhow::Result<RawFrame> {
        let mut buf = payload;
        let width = buf.try_get_u32()?;
        let height = buf.try_get_u32()?;

        let expected = width as usize * height as usize * 3;
        if buf.len() != expected {
            bail!("frame payload of {} bytes does not match {}x{} dimensions", buf.len(), width, height);
        }

        Ok(RawFrame {
            width,
            height,
            data: Bytes::copy_from_slice(buf),
        })
    }
}

/// Logs each frame instead of putting it on a screen.
pub struct TracingDisplay;

#[async_trait]
impl DisplaySink for TracingDisplay {
    async fn show(&self, peer: SocketAddr, frame: RawFrame) -> anyhow::Result<()> {
        debug!(?peer, width = frame.width, height = frame.height, bytes = frame.data.len(), "frame");
        Ok(())
    }
}
