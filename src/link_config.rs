use std::time::Duration;

#[derive(Debug)]
pub struct LinkConfig {
    /// UDP port a consumer listens on
    pub listen_port: u16,

    /// upper bound for an outgoing datagram, and the size of the receive buffer. Defaults to
    ///  the largest payload a UDP/IPv4 datagram can carry; a frame that does not fit is
    ///  dropped at the producer
    pub max_datagram_bytes: usize,

    /// receive timeout for the first attempt of each handshake step
    pub handshake_attempt_timeout: Duration,
    /// factor by which the attempt timeout grows after each miss, expressed in eighths
    ///  (12 means x1.5). Must be >= 8
    pub handshake_backoff_factor_eighths: u32,
    /// cap for the backed-off attempt timeout
    pub handshake_max_attempt_timeout: Duration,
    /// number of attempts per handshake step before the initiator gives up
    pub handshake_max_attempts: u32,

    /// a session whose worker sees no datagram for this long is evicted from the registry
    pub session_idle_timeout: Duration,

    /// the bundled metrics backend logs a per-peer summary every n media frames
    pub stats_report_every_n_frames: u64,
    /// weight of the newest sample in the bundled backend's moving latency average, >0 and < 1
    pub latency_moving_avg_new_weight: f64,
}

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig {
            listen_port: 5060,
            max_datagram_bytes: 65507,
            handshake_attempt_timeout: Duration::from_millis(500),
            handshake_backoff_factor_eighths: 12,
            handshake_max_attempt_timeout: Duration::from_secs(5),
            handshake_max_attempts: 20,
            session_idle_timeout: Duration::from_secs(30),
            stats_report_every_n_frames: 120,
            latency_moving_avg_new_weight: 0.1,
        }
    }
}
