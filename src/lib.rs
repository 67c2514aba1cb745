//! Transport for a live video stream from a single producer (a drone-mounted camera or a file)
//!  to one or more consumers over plain UDP, with a clock synchronization handshake per peer
//!  before any media is accepted.
//!
//! ## Design goals
//!
//! * One listening UDP socket per consumer handles all producers - sessions are multiplexed by
//!    peer address, there is no per-peer socket
//! * Media delivery is best-effort: frames carry sequence numbers so the consumer can *detect*
//!    loss, but there is no retransmission, no reordering and no congestion control
//!   * a dropped or late frame is worthless for a live stream, so the protocol skips it and
//!      continues with fresh data
//! * Clocks are synchronized per peer with a simplified two-way delay measurement (in the
//!    spirit of PTP) so the consumer can attribute one-way latency to each frame
//! * The shared receive loop is never blocked by a slow session: each session has a single-slot
//!    rendezvous where a fresh datagram overwrites an unconsumed one ("latest wins")
//! * Frame acquisition, image compression and on-screen rendering are collaborators behind
//!    traits - this crate moves bytes and timestamps
//!
//! ## Wire format
//!
//! All integers are in network byte order (BE). Datagram kinds are distinguished by length,
//!  not by a frame header:
//!
//! ```ascii
//! handshake record (16 bytes):
//! 0:  timestamp_ns: u64 - sender's wall clock when the record was built
//! 8:  type_code: u64 - 0x1 SYNC, 0x3 DELAY_RESPONSE
//!
//! terminate record (8 bytes):
//! 0:  the literal u64 0x5
//!
//! media frame record (> 16 bytes):
//! 0:  frame_index: u64 - increments by one per frame at the producer
//! 8:  send_timestamp_ns: u64
//! 16: compressed frame payload (remaining bytes, non-empty)
//! ```
//!
//! The delay request and the delay acknowledgment of the handshake are *not* tagged on the
//!  wire: each side recognizes them purely by protocol phase. This asymmetry is part of the
//!  protocol and kept for wire compatibility.
//!
//! ## Handshake
//!
//! Four steps, initiated by the producer:
//! * producer sends a SYNC record carrying `t1`, the consumer stamps `t2` on arrival
//! * consumer replies with a delay request (a SYNC-shaped record)
//! * producer sends a DELAY_RESPONSE carrying `t3`, the consumer stamps `t4` on arrival and
//!    acknowledges it
//! * producer sends the terminate record and starts streaming media
//!
//! From `t1..t4` the consumer's metrics backend derives clock offset and path delay. Every
//!  step the producer sends is retried with a bounded, backed-off receive timeout.

pub mod clock;
pub mod handshake;
pub mod link_config;
pub mod media;
pub mod metrics;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod transport;
pub mod wire;
