//! Mint session configuration

use std::time::Duration;

use cmk_common::{Commitment, PublicKey};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default confirmation timeout
pub const DEFAULT_TX_TIMEOUT_MS: u64 = 30_000;
/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Static configuration of a mint session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintConfig {
    /// Candy machine account
    pub candy_machine_id: PublicKey,
    /// Account receiving the mint payment
    pub treasury: PublicKey,
    /// RPC endpoint of the cluster
    pub rpc_endpoint: Url,
    /// How long to wait for confirmation before giving up, in ms
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
    /// Activation instant used until the machine has been read (unix seconds)
    #[serde(default)]
    pub start_date: u64,
    /// Commitment requested when polling
    #[serde(default)]
    pub commitment: Commitment,
    /// Interval between status polls, in ms
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_tx_timeout_ms() -> u64 {
    DEFAULT_TX_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl MintConfig {
    /// Create a config with default timings
    pub fn new(candy_machine_id: PublicKey, treasury: PublicKey, rpc_endpoint: Url) -> Self {
        Self {
            candy_machine_id,
            treasury,
            rpc_endpoint,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
            start_date: 0,
            commitment: Commitment::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Confirmation timeout
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }

    /// Poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
