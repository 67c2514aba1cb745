use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::clock::wall_clock_nanos;
use crate::link_config::LinkConfig;
use crate::media::{DisplaySink, FrameCodec};
use crate::metrics::MetricsSink;
use crate::session::registry::SessionRegistry;
use crate::transport::Transport;

/// The consumer endpoint: the single receive loop feeding the session registry.
///
/// Only this loop reads from the transport. It stamps each datagram's arrival time and hands
///  it off without ever waiting for a session's worker, so one stalled peer cannot hold up
///  the others.
pub struct VideoReceiver {
    transport: Arc<dyn Transport>,
    registry: SessionRegistry,
    config: Arc<LinkConfig>,
}

impl VideoReceiver {
    pub fn new(
        config: Arc<LinkConfig>,
        transport: Arc<dyn Transport>,
        frame_codec: Arc<dyn FrameCodec>,
        display: Arc<dyn DisplaySink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> VideoReceiver {
        let registry = SessionRegistry::new(config.clone(), transport.clone(), frame_codec, display, metrics);
        VideoReceiver {
            transport,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        info!(addr = ?self.transport.local_addr()?, "listening for producers");

        let mut buf = vec![0u8; self.config.max_datagram_bytes];
        loop {
            let (len, from) = match self.transport.recv(&mut buf).await {
                Ok(x) => x,
                Err(e) => {
                    error!("socket error: {:#}", e);
                    continue;
                }
            };
            let recv_timestamp_ns = wall_clock_nanos();

            if len == 0 {
                debug!(?from, "empty datagram - ignoring");
                continue;
            }

            self.registry
                .dispatch(from, Bytes::copy_from_slice(&buf[..len]), recv_timestamp_ns)
                .await;
        }
    }
}
