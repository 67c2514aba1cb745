use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock in nanoseconds since the UNIX epoch.
///
/// Handshake and media timestamps on both ends of a link share this time base; the handshake
///  measures the remaining offset between the two clocks.
pub fn wall_clock_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time is before UNIX epoch")
        .as_nanos() as u64
}
