use crate::clock::wall_clock_nanos;
use crate::handshake::sync_state::SyncState;
use crate::metrics::SyncTimes;
use crate::wire::{Datagram, HandshakeKind};

/// What the session worker should do with the responder's verdict on a datagram.
#[derive(Debug)]
pub enum ResponderStep {
    /// send this record back to the peer
    Reply(Datagram),
    /// the exchange is complete; the captured timestamps go to the metrics backend, whose
    ///  acknowledgment confirms the transition to `Synced`
    Complete(SyncTimes),
    /// the datagram does not advance the handshake
    Ignored,
}

/// Consumer side of the clock synchronization handshake: a step machine fed one datagram at a
///  time by the session worker.
///
/// The producer's retransmissions are tolerated at every step - a re-sent sync or delay
///  response refreshes the captured timestamps and triggers a fresh reply, so a lost reply
///  never wedges the exchange.
pub struct HandshakeResponder {
    state: SyncState,
    times: SyncTimes,
}

impl HandshakeResponder {
    pub fn new() -> HandshakeResponder {
        HandshakeResponder {
            state: SyncState::Unsynced,
            times: SyncTimes::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn on_datagram(&mut self, datagram: &Datagram, recv_timestamp_ns: u64) -> anyhow::Result<ResponderStep> {
        match (self.state, datagram) {
            (SyncState::Unsynced, Datagram::Handshake { timestamp_ns, kind: HandshakeKind::Sync }) => {
                self.record_sync(*timestamp_ns, recv_timestamp_ns);
                self.state.advance_to(SyncState::SyncSent)?;
                Ok(ResponderStep::Reply(self.delay_request()))
            }
            // the producer re-sent its sync record, so our delay request was lost - refresh and re-reply
            (SyncState::SyncSent, Datagram::Handshake { timestamp_ns, kind: HandshakeKind::Sync }) => {
                self.record_sync(*timestamp_ns, recv_timestamp_ns);
                Ok(ResponderStep::Reply(self.delay_request()))
            }
            (SyncState::SyncSent, Datagram::Handshake { timestamp_ns, kind: HandshakeKind::DelayResponse }) => {
                self.record_delay_response(*timestamp_ns, recv_timestamp_ns);
                self.state.advance_to(SyncState::DelaySent)?;
                Ok(ResponderStep::Reply(self.delay_ack()))
            }
            // delay response retransmitted, so our acknowledgment was lost - re-ack
            (SyncState::DelaySent, Datagram::Handshake { timestamp_ns, kind: HandshakeKind::DelayResponse }) => {
                self.record_delay_response(*timestamp_ns, recv_timestamp_ns);
                Ok(ResponderStep::Reply(self.delay_ack()))
            }
            (SyncState::DelaySent, Datagram::Terminate) => Ok(ResponderStep::Complete(self.times)),
            _ => Ok(ResponderStep::Ignored),
        }
    }

    /// confirms the metrics backend's acknowledgment of a completed exchange
    pub fn confirm_synced(&mut self) -> anyhow::Result<()> {
        self.state.advance_to(SyncState::Synced)
    }

    fn record_sync(&mut self, sent_ns: u64, received_ns: u64) {
        self.times.sync_sent_ns = sent_ns;
        self.times.sync_received_ns = received_ns;
    }

    fn record_delay_response(&mut self, sent_ns: u64, received_ns: u64) {
        self.times.delay_response_sent_ns = sent_ns;
        self.times.delay_response_received_ns = received_ns;
    }

    /// The delay request is a SYNC-shaped record: the wire protocol does not tag it, the
    ///  producer recognizes it by arrival. Its timestamp is our send time, the consumer-clock
    ///  anchor of the return leg.
    fn delay_request(&mut self) -> Datagram {
        let now = wall_clock_nanos();
        self.times.delay_request_sent_ns = now;
        Datagram::sync(now)
    }

    fn delay_ack(&self) -> Datagram {
        Datagram::sync(wall_clock_nanos())
    }
}

impl Default for HandshakeResponder {
    fn default() -> Self {
        Self::new()
    }
}
