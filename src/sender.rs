use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::{info, trace, warn};

use crate::clock::wall_clock_nanos;
use crate::handshake::initiator::HandshakeInitiator;
use crate::link_config::LinkConfig;
use crate::media::{FrameCodec, FrameSource};
use crate::transport::Transport;
use crate::wire::{Datagram, MediaFrame};

/// The producer endpoint: synchronizes clocks with one consumer, then streams frames until
///  the source is exhausted.
pub struct VideoSender {
    transport: Arc<dyn Transport>,
    peer: SocketAddr,
    config: Arc<LinkConfig>,
}

impl VideoSender {
    pub fn new(transport: Arc<dyn Transport>, peer: SocketAddr, config: Arc<LinkConfig>) -> VideoSender {
        VideoSender {
            transport,
            peer,
            config,
        }
    }

    /// Runs the handshake, then the media loop. Returns the number of frames handed to the
    ///  transport.
    pub async fn run(&self, source: &mut dyn FrameSource, codec: &dyn FrameCodec) -> anyhow::Result<u64> {
        let mut initiator = HandshakeInitiator::new(self.transport.as_ref(), self.peer, &self.config);
        initiator.run().await?;

        self.stream_frames(source, codec).await
    }

    /// The media loop on its own, for callers that already hold a synchronized link.
    ///
    /// Per-frame problems - encode failure, an encoded frame that does not fit into a
    ///  datagram - skip that frame and keep going; the skipped index shows up as a gap at the
    ///  consumer, which is the loss signal it handles anyway. Only a dead channel ends the
    ///  loop with an error.
    pub async fn stream_frames(&self, source: &mut dyn FrameSource, codec: &dyn FrameCodec) -> anyhow::Result<u64> {
        let mut sent = 0u64;
        let mut next_index = 0u64;

        while let Some(frame) = source.next_frame().await? {
            let index = next_index;
            next_index += 1;

            let payload = match codec.encode(&frame).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(index, "frame encode failed - skipping: {:#}", e);
                    continue;
                }
            };
            if payload.is_empty() {
                // an empty payload would make the record wire-identical to a handshake record
                warn!(index, "codec produced an empty payload - skipping");
                continue;
            }

            let mut buf = BytesMut::new();
            Datagram::MediaFrame(MediaFrame {
                index,
                send_timestamp_ns: wall_clock_nanos(),
                payload,
            }).ser(&mut buf);

            if buf.len() > self.config.max_datagram_bytes {
                warn!(index, bytes = buf.len(), max = self.config.max_datagram_bytes,
                    "encoded frame exceeds maximum datagram size - dropping");
                continue;
            }

            self.transport.send(self.peer, &buf).await?;
            sent += 1;
            trace!(index, bytes = buf.len(), "frame sent");
        }

        info!(sent, skipped = next_index - sent, "frame source exhausted - transmission complete");
        Ok(sent)
    }
}
