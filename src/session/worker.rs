use std::sync::Arc;

use bytes::BytesMut;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::handshake::responder::{HandshakeResponder, ResponderStep};
use crate::link_config::LinkConfig;
use crate::media::sequence::SequenceTracker;
use crate::media::{DisplaySink, FrameCodec};
use crate::metrics::{MetricsFact, MetricsSink};
use crate::session::{InboundDatagram, SessionHandle};
use crate::transport::Transport;
use crate::wire::{Datagram, MediaFrame};

/// Serializes all processing for one session: datagrams taken from the handoff slot feed the
///  handshake responder until the peer is synchronized, and the media path afterwards.
///
/// Slow collaborators (codec, display, metrics) stall only this worker; the shared receive
///  loop keeps depositing, overwriting what this worker has not consumed yet.
pub struct SessionWorker {
    handle: Arc<SessionHandle>,
    config: Arc<LinkConfig>,
    transport: Arc<dyn Transport>,
    frame_codec: Arc<dyn FrameCodec>,
    display: Arc<dyn DisplaySink>,
    metrics: Arc<dyn MetricsSink>,
    responder: HandshakeResponder,
    sequence: SequenceTracker,
}

impl SessionWorker {
    pub fn new(
        handle: Arc<SessionHandle>,
        config: Arc<LinkConfig>,
        transport: Arc<dyn Transport>,
        frame_codec: Arc<dyn FrameCodec>,
        display: Arc<dyn DisplaySink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> SessionWorker {
        SessionWorker {
            handle,
            config,
            transport,
            frame_codec,
            display,
            metrics,
            responder: HandshakeResponder::new(),
            sequence: SequenceTracker::new(),
        }
    }

    /// Runs until the peer falls silent for the configured idle timeout. The caller removes
    ///  the session from the registry afterwards.
    pub async fn run(mut self) {
        loop {
            let inbound = match timeout(self.config.session_idle_timeout, self.handle.slot.take()).await {
                Ok(inbound) => inbound,
                Err(_elapsed) => {
                    // NB: a datagram deposited between this expiry and the registry dropping
                    //  the handle is lost; the next one from the peer recreates the session
                    info!(peer = ?self.handle.peer, frames = self.sequence.frames_received(),
                        lost = self.sequence.frames_missing(), "peer idle - session worker shutting down");
                    return;
                }
            };

            if let Err(e) = self.process(inbound).await {
                warn!(peer = ?self.handle.peer, "dropping datagram: {:#}", e);
            }
        }
    }

    async fn process(&mut self, inbound: InboundDatagram) -> anyhow::Result<()> {
        if self.responder.state().is_synced() {
            self.on_media(inbound).await
        }
        else {
            self.on_handshake(inbound).await
        }
    }

    async fn on_handshake(&mut self, inbound: InboundDatagram) -> anyhow::Result<()> {
        // a malformed datagram is dropped here; the producer's retransmission covers the loss
        let datagram = Datagram::deser(&mut &inbound.payload[..])?;

        match self.responder.on_datagram(&datagram, inbound.recv_timestamp_ns)? {
            ResponderStep::Reply(reply) => {
                let mut buf = BytesMut::new();
                reply.ser(&mut buf);
                self.transport.send(self.handle.peer, &buf).await?;
                trace!(peer = ?self.handle.peer, state = ?self.responder.state(), "handshake reply sent");
            }
            ResponderStep::Complete(times) => {
                if self.metrics.on_handshake_complete(self.handle.peer, &times).await {
                    self.responder.confirm_synced()?;
                    info!(peer = ?self.handle.peer, "peer synchronized - accepting media");
                }
                else {
                    warn!(peer = ?self.handle.peer, "metrics backend did not acknowledge synchronization");
                }
            }
            ResponderStep::Ignored => {
                debug!(peer = ?self.handle.peer, state = ?self.responder.state(),
                    "datagram does not advance the handshake - ignoring");
            }
        }
        Ok(())
    }

    async fn on_media(&mut self, inbound: InboundDatagram) -> anyhow::Result<()> {
        // once synchronized, everything the peer sends is a media frame record
        let frame = MediaFrame::deser(&mut &inbound.payload[..])?;

        let newly_missing = self.sequence.on_frame(frame.index);
        if newly_missing > 0 {
            debug!(peer = ?self.handle.peer, newly_missing, index = frame.index,
                "gap in frame sequence - frames lost in transit");
        }

        match self.frame_codec.decode(&frame.payload).await {
            Ok(decoded) => {
                if let Err(e) = self.display.show(self.handle.peer, decoded).await {
                    warn!(peer = ?self.handle.peer, index = frame.index, "display rejected frame: {:#}", e);
                }
            }
            Err(e) => {
                warn!(peer = ?self.handle.peer, index = frame.index, "cannot decode frame payload: {:#}", e);
            }
        }

        self.metrics.on_frame(self.handle.peer, &MetricsFact {
            frame_index: frame.index,
            send_timestamp_ns: frame.send_timestamp_ns,
            recv_timestamp_ns: inbound.recv_timestamp_ns,
            payload_bytes: frame.payload.len(),
        }).await;

        Ok(())
    }
}
