use std::cmp::min;
use std::time::Duration;

/// Receive timeout that grows after every missed reply, replacing the tight retransmit loop a
///  naive implementation would run against an unresponsive peer.
///
/// The growth factor is expressed in eighths to stay in integer arithmetic: 12 means x1.5 per
///  miss. A factor below 8 would shrink the timeout.
pub struct RetryBackoff {
    current: Duration,
    factor_eighths: u32,
    max: Duration,
}

impl RetryBackoff {
    pub fn new(initial: Duration, factor_eighths: u32, max: Duration) -> RetryBackoff {
        assert!(factor_eighths >= 8);

        RetryBackoff {
            current: min(initial, max),
            factor_eighths,
            max,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn advance(&mut self) {
        self.current = min(self.current * self.factor_eighths / 8, self.max);
    }
}
