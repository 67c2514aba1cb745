use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::link_config::LinkConfig;
use crate::metrics::{MetricsFact, MetricsSink, SyncTimes};

/// The bundled metrics backend: per-peer clock offset from the handshake, a moving average and
///  variance of one-way frame latency, and windowed throughput, all reported through tracing.
///
/// Anything fancier (percentiles, export, dashboards) belongs in an application-provided
///  [MetricsSink] - the session layer only ever sees the trait.
pub struct LinkStatsSink {
    config: Arc<LinkConfig>,
    peers: Mutex<FxHashMap<SocketAddr, PeerStats>>,
}

impl LinkStatsSink {
    pub fn new(config: Arc<LinkConfig>) -> Arc<LinkStatsSink> {
        Arc::new(LinkStatsSink {
            config,
            peers: Mutex::new(Default::default()),
        })
    }

    pub async fn snapshot(&self, peer: SocketAddr) -> Option<LinkStatsSnapshot> {
        self.peers.lock().await
            .get(&peer)
            .map(|stats| LinkStatsSnapshot {
                clock_offset_ns: stats.clock_offset_ns,
                mean_latency_millis: stats.moving_mean_latency_millis,
                jitter_millis: stats.moving_variance_latency_millis_squared.sqrt(),
                frames_received: stats.frames_received,
                bytes_received: stats.bytes_received,
            })
    }
}

#[async_trait]
impl MetricsSink for LinkStatsSink {
    async fn on_handshake_complete(&self, peer: SocketAddr, times: &SyncTimes) -> bool {
        let offset_ns = times.clock_offset_ns();
        let delay_ns = times.path_delay_ns();

        info!(
            ?peer,
            clock_offset_ms = offset_ns as f64 / 1_000_000.0,
            path_delay_ms = delay_ns as f64 / 1_000_000.0,
            "peer clock synchronized"
        );

        self.peers.lock().await
            .insert(peer, PeerStats::new(offset_ns));
        true
    }

    async fn on_frame(&self, peer: SocketAddr, fact: &MetricsFact) {
        let mut peers = self.peers.lock().await;
        let stats = peers.entry(peer).or_insert_with(|| {
            debug!(?peer, "frame from peer without a recorded handshake - assuming zero clock offset");
            PeerStats::new(0)
        });

        stats.on_frame(fact, &self.config);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkStatsSnapshot {
    pub clock_offset_ns: i64,
    pub mean_latency_millis: Option<f64>,
    pub jitter_millis: f64,
    pub frames_received: u64,
    pub bytes_received: u64,
}

struct PeerStats {
    clock_offset_ns: i64,
    moving_mean_latency_millis: Option<f64>,
    moving_variance_latency_millis_squared: f64,
    frames_received: u64,
    bytes_received: u64,
    window_started: Instant,
    window_frames: u64,
    window_bytes: u64,
}

impl PeerStats {
    fn new(clock_offset_ns: i64) -> PeerStats {
        PeerStats {
            clock_offset_ns,
            moving_mean_latency_millis: None,
            moving_variance_latency_millis_squared: 0.0,
            frames_received: 0,
            bytes_received: 0,
            window_started: Instant::now(),
            window_frames: 0,
            window_bytes: 0,
        }
    }

    fn on_frame(&mut self, fact: &MetricsFact, config: &LinkConfig) {
        self.frames_received += 1;
        self.bytes_received += fact.payload_bytes as u64;
        self.window_frames += 1;
        self.window_bytes += fact.payload_bytes as u64;

        let latency_millis = self.one_way_latency_millis(fact);

        if let Some(prev) = self.moving_mean_latency_millis {
            let alpha = config.latency_moving_avg_new_weight;

            let mean = latency_millis * alpha + prev * (1.0 - alpha);
            self.moving_mean_latency_millis = Some(mean);

            let s = (mean - latency_millis).powi(2);
            self.moving_variance_latency_millis_squared =
                s * alpha + self.moving_variance_latency_millis_squared * (1.0 - alpha);
        }
        else {
            // first frame
            self.moving_mean_latency_millis = Some(latency_millis);
            self.moving_variance_latency_millis_squared = 0.0;
        }

        if self.window_frames >= config.stats_report_every_n_frames {
            self.report_window(fact.frame_index);
        }
    }

    /// frame latency on the consumer's clock, corrected by the handshake's offset estimate
    fn one_way_latency_millis(&self, fact: &MetricsFact) -> f64 {
        let raw_ns = fact.recv_timestamp_ns as i64 - fact.send_timestamp_ns as i64;
        (raw_ns - self.clock_offset_ns) as f64 / 1_000_000.0
    }

    fn report_window(&mut self, latest_index: u64) {
        let elapsed = self.window_started.elapsed().as_secs_f64();
        let fps = if elapsed > 0.0 { self.window_frames as f64 / elapsed } else { 0.0 };
        let kilobytes_per_sec = if elapsed > 0.0 { self.window_bytes as f64 / elapsed / 1000.0 } else { 0.0 };

        info!(
            latest_index,
            mean_latency_ms = self.moving_mean_latency_millis.unwrap_or(0.0),
            jitter_ms = self.moving_variance_latency_millis_squared.sqrt(),
            fps,
            kilobytes_per_sec,
            total_frames = self.frames_received,
            "link statistics"
        );

        self.window_started = Instant::now();
        self.window_frames = 0;
        self.window_bytes = 0;
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use rstest::rstest;
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from_str("127.0.0.1:40000").unwrap()
    }

    fn config() -> Arc<LinkConfig> {
        Arc::new(LinkConfig::default())
    }

    #[tokio::test]
    async fn test_handshake_records_offset() {
        let sink = LinkStatsSink::new(config());

        let times = SyncTimes {
            sync_sent_ns: 1000,
            sync_received_ns: 1110,
            delay_request_sent_ns: 1120,
            delay_response_sent_ns: 1030,
            delay_response_received_ns: 1140,
        };
        assert!(sink.on_handshake_complete(peer(), &times).await);

        let snapshot = sink.snapshot(peer()).await.unwrap();
        assert_eq!(snapshot.clock_offset_ns, 100);
        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.mean_latency_millis, None);
    }

    #[tokio::test]
    async fn test_first_frame_sets_the_latency_average() {
        let sink = LinkStatsSink::new(config());
        sink.peers.lock().await.insert(peer(), PeerStats::new(1_000_000));

        // raw latency 6ms, of which 1ms is clock offset
        sink.on_frame(peer(), &MetricsFact {
            frame_index: 0,
            send_timestamp_ns: 10_000_000,
            recv_timestamp_ns: 16_000_000,
            payload_bytes: 2000,
        }).await;

        let snapshot = sink.snapshot(peer()).await.unwrap();
        assert_eq!(snapshot.mean_latency_millis, Some(5.0));
        assert_eq!(snapshot.jitter_millis, 0.0);
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.bytes_received, 2000);
    }

    #[rstest]
    #[case::steady_latency(vec![5.0, 5.0, 5.0], 5.0)]
    #[case::rising_latency(vec![5.0, 15.0], 6.0)]
    fn test_moving_average(#[case] latencies_ms: Vec<f64>, #[case] expected_mean_ms: f64) {
        let config = config();
        let mut stats = PeerStats::new(0);

        for (n, latency_ms) in latencies_ms.iter().enumerate() {
            stats.on_frame(&MetricsFact {
                frame_index: n as u64,
                send_timestamp_ns: 0,
                recv_timestamp_ns: (latency_ms * 1_000_000.0) as u64,
                payload_bytes: 100,
            }, &config);
        }

        let mean = stats.moving_mean_latency_millis.unwrap();
        assert!((mean - expected_mean_ms).abs() < 1e-9, "mean {} != {}", mean, expected_mean_ms);
    }

    #[tokio::test]
    async fn test_frame_without_handshake_is_tolerated() {
        let sink = LinkStatsSink::new(config());

        sink.on_frame(peer(), &MetricsFact {
            frame_index: 3,
            send_timestamp_ns: 100,
            recv_timestamp_ns: 200,
            payload_bytes: 10,
        }).await;

        let snapshot = sink.snapshot(peer()).await.unwrap();
        assert_eq!(snapshot.clock_offset_ns, 0);
        assert_eq!(snapshot.frames_received, 1);
    }
}
