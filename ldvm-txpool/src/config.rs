//! Transaction pool configuration.

use serde::{Deserialize, Serialize};

/// Limits of the transaction pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoolConfig {
    /// Maximum number of queued entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Seconds a pending, rejected or included id is remembered after it
    /// leaves the queue.
    #[serde(default = "default_known_ttl_secs")]
    pub known_ttl_secs: u64,

    /// Buffered admissions per gossip subscriber.
    #[serde(default = "default_gossip_capacity")]
    pub gossip_capacity: usize,
}

const fn default_max_entries() -> usize {
    50_000
}

const fn default_known_ttl_secs() -> u64 {
    600
}

const fn default_gossip_capacity() -> usize {
    1024
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            known_ttl_secs: default_known_ttl_secs(),
            gossip_capacity: default_gossip_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TxPoolConfig::default();
        assert_eq!(config.max_entries, 50_000);
        assert_eq!(config.known_ttl_secs, 600);
        assert!(config.gossip_capacity > 0);
    }
}
