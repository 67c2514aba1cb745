use std::net::SocketAddr;

use anyhow::bail;
use bytes::BytesMut;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::clock::wall_clock_nanos;
use crate::handshake::retry::RetryBackoff;
use crate::handshake::sync_state::SyncState;
use crate::link_config::LinkConfig;
use crate::transport::Transport;
use crate::wire::Datagram;

/// Producer side of the clock synchronization handshake.
///
/// Drives the four-step exchange against one consumer: send the sync record, await the delay
///  request, send the delay response, await its acknowledgment, then terminate the handshake.
///  The two inbound steps are recognized purely by arrival - their content is not inspected,
///  matching the wire protocol's untagged delay request.
pub struct HandshakeInitiator<'a> {
    transport: &'a dyn Transport,
    peer: SocketAddr,
    config: &'a LinkConfig,
    state: SyncState,
}

impl<'a> HandshakeInitiator<'a> {
    pub fn new(transport: &'a dyn Transport, peer: SocketAddr, config: &'a LinkConfig) -> HandshakeInitiator<'a> {
        HandshakeInitiator {
            transport,
            peer,
            config,
            state: SyncState::Unsynced,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Runs the exchange to completion. On success the peer has acknowledged both timed steps,
    ///  the terminate record is out, and media may flow.
    ///
    /// A send failure is passed up unchanged - a torn-down channel is not recoverable here. An
    ///  exhausted retry budget surfaces as an error as well, rather than retrying forever.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        debug!(peer = ?self.peer, "starting clock synchronization handshake");

        self.state.advance_to(SyncState::SyncSent)?;
        // fresh t1 per attempt: a re-sent sync record carries the current clock
        self.await_reply(|| Datagram::sync(wall_clock_nanos())).await?;
        self.state.advance_to(SyncState::DelayPending)?;

        // t3 is captured once: retransmissions of a lost delay response repeat the original
        let delay_response = Datagram::delay_response(wall_clock_nanos());
        self.state.advance_to(SyncState::DelaySent)?;
        self.await_reply(|| delay_response.clone()).await?;
        self.state.advance_to(SyncState::Synced)?;

        self.send(&Datagram::Terminate).await?;
        self.state.advance_to(SyncState::Terminated)?;

        info!(peer = ?self.peer, "handshake complete - ready for media transmission");
        Ok(())
    }

    async fn send(&self, datagram: &Datagram) -> anyhow::Result<()> {
        let mut buf = BytesMut::new();
        datagram.ser(&mut buf);
        self.transport.send(self.peer, &buf).await
    }

    /// Sends `make_record()` and waits for any non-empty datagram from the peer, re-sending
    ///  with a backed-off timeout until the retry budget is exhausted.
    async fn await_reply(&self, make_record: impl Fn() -> Datagram) -> anyhow::Result<()> {
        let mut backoff = RetryBackoff::new(
            self.config.handshake_attempt_timeout,
            self.config.handshake_backoff_factor_eighths,
            self.config.handshake_max_attempt_timeout,
        );
        let mut buf = vec![0u8; self.config.max_datagram_bytes];

        for attempt in 1..=self.config.handshake_max_attempts {
            self.send(&make_record()).await?;

            match timeout(backoff.current(), self.transport.recv(&mut buf)).await {
                Ok(Ok((len, from))) if from == self.peer && len > 0 => {
                    trace!(peer = ?self.peer, len, attempt, "handshake reply arrived");
                    return Ok(());
                }
                Ok(Ok((len, from))) => {
                    debug!(peer = ?self.peer, ?from, len, "datagram is no usable handshake reply - re-sending");
                }
                Ok(Err(e)) => {
                    return Err(e);
                }
                Err(_elapsed) => {
                    debug!(peer = ?self.peer, attempt, "no handshake reply within timeout - re-sending");
                }
            }
            backoff.advance();
        }

        bail!("peer {} did not answer within {} handshake attempts", self.peer, self.config.handshake_max_attempts);
    }
}
