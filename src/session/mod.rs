use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use crate::session::handoff::HandoffSlot;

pub mod handoff;
pub mod registry;
pub mod worker;

/// A raw datagram as picked up by the receive loop, stamped before any decoding.
#[derive(Debug)]
pub struct InboundDatagram {
    pub payload: Bytes,
    pub recv_timestamp_ns: u64,
}

/// The part of a session shared between the receive loop and the worker: the peer's identity
///  and the handoff slot. Everything else about a session - handshake progress, sequence
///  bookkeeping - is owned exclusively by its worker.
pub struct SessionHandle {
    pub peer: SocketAddr,
    pub slot: HandoffSlot<InboundDatagram>,
}

impl SessionHandle {
    pub fn new(peer: SocketAddr) -> Arc<SessionHandle> {
        Arc::new(SessionHandle {
            peer,
            slot: HandoffSlot::new(),
        })
    }
}
