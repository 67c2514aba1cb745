use std::net::SocketAddr;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;

pub mod link_stats;

/// The timestamps captured during one handshake, in nanoseconds since the epoch. `*_sent_ns`
///  of producer records are producer wall clock; everything stamped on the consumer is
///  consumer wall clock.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SyncTimes {
    /// producer clock when the sync record was built (t1)
    pub sync_sent_ns: u64,
    /// consumer clock when the sync record arrived
    pub sync_received_ns: u64,
    /// consumer clock when the delay request went out (t2)
    pub delay_request_sent_ns: u64,
    /// producer clock when the delay response was built (t3)
    pub delay_response_sent_ns: u64,
    /// consumer clock when the delay response arrived (t4)
    pub delay_response_received_ns: u64,
}

impl SyncTimes {
    /// Consumer clock minus producer clock, positive if the consumer's clock runs ahead.
    ///
    /// Derived from the two timed legs assuming a symmetric path: the forward leg measures
    ///  `delay + offset`, the return leg `delay - offset` (plus the producer's turnaround
    ///  time, which the protocol cannot separate out and treats as negligible).
    pub fn clock_offset_ns(&self) -> i64 {
        (self.forward_leg_ns() - self.return_leg_ns()) / 2
    }

    /// estimated one-way path delay, same symmetry assumption as [Self::clock_offset_ns]
    pub fn path_delay_ns(&self) -> i64 {
        (self.forward_leg_ns() + self.return_leg_ns()) / 2
    }

    fn forward_leg_ns(&self) -> i64 {
        self.sync_received_ns as i64 - self.sync_sent_ns as i64
    }

    fn return_leg_ns(&self) -> i64 {
        self.delay_response_sent_ns as i64 - self.delay_request_sent_ns as i64
    }
}

/// The raw facts about one received media frame, forwarded to the metrics backend. Deriving
///  latency, jitter and throughput from these is the backend's business.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MetricsFact {
    pub frame_index: u64,
    /// producer clock when the frame was sent
    pub send_timestamp_ns: u64,
    /// consumer clock when the frame arrived
    pub recv_timestamp_ns: u64,
    pub payload_bytes: usize,
}

/// Consumer of timing and size facts, one instance shared by all sessions of an endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsSink: Send + Sync + 'static {
    /// Called once per completed handshake. The returned acknowledgment gates the session's
    ///  transition to `Synced` - a backend that cannot make sense of the timestamps may veto.
    async fn on_handshake_complete(&self, peer: SocketAddr, times: &SyncTimes) -> bool;

    async fn on_frame(&self, peer: SocketAddr, fact: &MetricsFact);
}
