use std::collections::hash_map::Entry;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{info, trace};

use crate::link_config::LinkConfig;
use crate::media::{DisplaySink, FrameCodec};
use crate::metrics::MetricsSink;
use crate::session::worker::SessionWorker;
use crate::session::{InboundDatagram, SessionHandle};
use crate::transport::Transport;

type SessionMap = Arc<Mutex<FxHashMap<SocketAddr, Arc<SessionHandle>>>>;

/// Owns the peer address -> session mapping of one consumer endpoint.
///
/// A peer address maps to at most one session: the first datagram from an unknown address
///  creates the session and spawns its worker, every later one is handed into the existing
///  session's slot. Sessions disappear again when their worker shuts down after the idle
///  timeout.
pub struct SessionRegistry {
    config: Arc<LinkConfig>,
    transport: Arc<dyn Transport>,
    frame_codec: Arc<dyn FrameCodec>,
    display: Arc<dyn DisplaySink>,
    metrics: Arc<dyn MetricsSink>,
    sessions: SessionMap,
}

impl SessionRegistry {
    pub fn new(
        config: Arc<LinkConfig>,
        transport: Arc<dyn Transport>,
        frame_codec: Arc<dyn FrameCodec>,
        display: Arc<dyn DisplaySink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> SessionRegistry {
        SessionRegistry {
            config,
            transport,
            frame_codec,
            display,
            metrics,
            sessions: Arc::new(Mutex::new(Default::default())),
        }
    }

    /// Hands a datagram to its session's worker, creating session and worker on first contact
    ///  with a peer. Never waits for the worker: an unconsumed previous datagram for the same
    ///  peer is overwritten.
    pub async fn dispatch(&self, from: SocketAddr, payload: Bytes, recv_timestamp_ns: u64) {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            let (handle, created) = match sessions.entry(from) {
                Entry::Occupied(e) => (e.get().clone(), false),
                Entry::Vacant(e) => {
                    let handle = SessionHandle::new(from);
                    e.insert(handle.clone());
                    (handle, true)
                }
            };
            if created {
                info!(peer = ?from, active_sessions = sessions.len(), "first datagram from new peer - session created");
                self.spawn_worker(handle.clone());
            }
            handle
        };

        let overwritten = handle.slot.deposit(InboundDatagram { payload, recv_timestamp_ns }).await;
        if overwritten.is_some() {
            trace!(peer = ?from, "worker is lagging - overwrote its unconsumed datagram");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn spawn_worker(&self, handle: Arc<SessionHandle>) {
        let worker = SessionWorker::new(
            handle.clone(),
            self.config.clone(),
            self.transport.clone(),
            self.frame_codec.clone(),
            self.display.clone(),
            self.metrics.clone(),
        );

        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let peer = handle.peer;
            worker.run().await;

            let mut sessions = sessions.lock().await;
            if sessions.remove(&peer).is_some() {
                info!(?peer, active_sessions = sessions.len(), "session removed");
            }
        });
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use std::time::Duration;

    use bytes::BytesMut;
    use tokio::time::sleep;

    use crate::clock::wall_clock_nanos;
    use crate::media::{MockDisplaySink, MockFrameCodec};
    use crate::metrics::MockMetricsSink;
    use crate::transport::MockTransport;
    use crate::wire::Datagram;

    use super::*;

    fn sync_record() -> Bytes {
        let mut buf = BytesMut::new();
        Datagram::sync(1000).ser(&mut buf);
        buf.freeze()
    }

    fn registry_with_idle_timeout(idle: Duration) -> SessionRegistry {
        let mut transport = MockTransport::new();
        // workers answer inbound sync records with delay requests
        transport.expect_send().returning(|_, _| Ok(()));

        SessionRegistry::new(
            Arc::new(LinkConfig {
                session_idle_timeout: idle,
                ..LinkConfig::default()
            }),
            Arc::new(transport),
            Arc::new(MockFrameCodec::new()),
            Arc::new(MockDisplaySink::new()),
            Arc::new(MockMetricsSink::new()),
        )
    }

    #[tokio::test]
    async fn test_one_session_per_peer() {
        let registry = registry_with_idle_timeout(Duration::from_secs(30));

        let peer_a = SocketAddr::from_str("127.0.0.1:1111").unwrap();
        let peer_b = SocketAddr::from_str("127.0.0.1:2222").unwrap();

        registry.dispatch(peer_a, sync_record(), wall_clock_nanos()).await;
        assert_eq!(registry.session_count().await, 1);

        // repeated datagrams reuse the session
        registry.dispatch(peer_a, sync_record(), wall_clock_nanos()).await;
        registry.dispatch(peer_a, sync_record(), wall_clock_nanos()).await;
        assert_eq!(registry.session_count().await, 1);

        // a distinct peer gets a session of its own
        registry.dispatch(peer_b, sync_record(), wall_clock_nanos()).await;
        assert_eq!(registry.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_idle_session_is_evicted() {
        let registry = registry_with_idle_timeout(Duration::from_millis(20));

        let peer = SocketAddr::from_str("127.0.0.1:3333").unwrap();
        registry.dispatch(peer, sync_record(), wall_clock_nanos()).await;
        assert_eq!(registry.session_count().await, 1);

        for _ in 0..100 {
            if registry.session_count().await == 0 {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("session was not evicted after the idle timeout");
    }

    #[tokio::test]
    async fn test_eviction_does_not_block_new_sessions() {
        let registry = registry_with_idle_timeout(Duration::from_millis(20));

        let peer = SocketAddr::from_str("127.0.0.1:4444").unwrap();
        registry.dispatch(peer, sync_record(), wall_clock_nanos()).await;

        for _ in 0..100 {
            if registry.session_count().await == 0 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        // the same peer coming back gets a fresh session
        registry.dispatch(peer, sync_record(), wall_clock_nanos()).await;
        assert_eq!(registry.session_count().await, 1);
    }
}
