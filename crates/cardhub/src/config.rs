//! Connection pump configuration.

use std::time::Duration;

/// Settings for the per-connection read/write pumps.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Capacity of each connection's outbound queue. Envelopes beyond this
    /// are dropped with a warning.
    ///
    /// Default: 256.
    pub outbound_capacity: usize,

    /// How long the read side waits for any frame (data, ping or pong)
    /// before giving up on the peer.
    ///
    /// Default: 60 seconds.
    pub liveness_timeout: Duration,

    /// How often the write side pings the peer, whether or not data is
    /// flowing. Must be shorter than `liveness_timeout` or healthy peers
    /// that never send time out.
    ///
    /// Default: 54 seconds.
    pub keepalive_interval: Duration,

    /// Upper bound on any single write. A breach closes the connection.
    ///
    /// Default: 10 seconds.
    pub write_deadline: Duration,

    /// Most envelopes coalesced into one text frame.
    ///
    /// Default: 64.
    pub max_batch: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        let liveness_timeout = Duration::from_secs(60);
        Self {
            outbound_capacity: 256,
            liveness_timeout,
            keepalive_interval: liveness_timeout * 9 / 10,
            write_deadline: Duration::from_secs(10),
            max_batch: 64,
        }
    }
}
