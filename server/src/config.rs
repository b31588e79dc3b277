//! Startup configuration for the server
//!
//! Everything tunable lives here with its default. There is no persistent
//! on-disk state; a `Config` is built once at startup (partly from the
//! command line) and shared read-only for the life of the process.

use shared::Rarity;
use std::time::Duration;

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind the TCP listener to.
    pub host: String,
    /// TCP port the listener accepts on.
    pub port: u16,

    /// Number of independent inventory shards.
    pub shard_count: usize,
    /// Cards minted into the shards at startup, split across rarities by
    /// `rarity_weights`.
    pub initial_cards: usize,
    /// Cards per pack.
    pub pack_size: usize,
    /// Percent weights for rarity sampling, indexed as [C, U, R, L].
    /// Must sum to 100.
    pub rarity_weights: [u32; 4],
    /// Upper bound on packs a single BUY_PACK may request.
    pub max_packs_per_request: u32,

    /// Number of pack worker tasks consuming the pack-request queue.
    pub pack_workers: usize,
    /// Capacity of the bounded pack-request queue; a full queue rejects
    /// requests immediately instead of blocking the reader.
    pub pack_queue_capacity: usize,

    /// Per-session outbound mailbox capacity.
    pub mailbox_capacity: usize,
    /// How long a producer waits on a full mailbox before dropping the
    /// message.
    pub mailbox_send_timeout: Duration,
    /// Deadline for a single outbound write; bounds head-of-line blocking
    /// on a stalled peer.
    pub write_deadline: Duration,
    /// Deadline for reading the next inbound frame; the authoritative
    /// liveness signal for a session.
    pub read_deadline: Duration,
    /// Interval between keepalive probes.
    pub keepalive_interval: Duration,

    /// Maximum concurrently accepted connections.
    pub max_connections: usize,
    /// Interval between periodic status log lines.
    pub status_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: shared::DEFAULT_PORT,
            shard_count: 32,
            initial_cards: 50_000,
            pack_size: 5,
            rarity_weights: [70, 20, 9, 1],
            max_packs_per_request: 10,
            pack_workers: 1_000,
            pack_queue_capacity: 100_000,
            mailbox_capacity: 32,
            mailbox_send_timeout: Duration::from_millis(200),
            write_deadline: Duration::from_secs(5),
            read_deadline: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
            max_connections: 30_000,
            status_interval: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Samples table: the rarity selected by a roll in 0..100.
    ///
    /// Walks the cumulative weights in [C, U, R, L] order, so with the
    /// default weights a roll below 70 is Common and a roll of 99 is the
    /// one Legendary percent.
    pub fn rarity_for_roll(&self, roll: u32) -> Rarity {
        let mut cumulative = 0;
        for (i, weight) in self.rarity_weights.iter().enumerate() {
            cumulative += weight;
            if roll < cumulative {
                return Rarity::ALL[i];
            }
        }
        Rarity::Common
    }
}
