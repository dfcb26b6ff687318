//! Types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a lamport amount to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Public key of an account (wallet, candy machine, treasury)
///
/// Kept in its base58 text form; the key bytes are never needed locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Shortened form for display, e.g. `7xKX..gAsU`
    pub fn shorten(&self, chars: usize) -> String {
        let key = &self.0;
        if key.len() <= chars * 2 {
            return key.clone();
        }
        format!("{}..{}", &key[..chars], &key[key.len() - chars..])
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(is_base58_char) {
            return Err(Error::InvalidPublicKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PublicKey::from_str(&value)
    }
}

impl From<PublicKey> for String {
    fn from(value: PublicKey) -> Self {
        value.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction signature returned on submission
///
/// Opaque to the client; only used to poll for status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(String);

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidSignature(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Signature {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Signature::from_str(&value)
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

/// Confirmation strength requested when polling a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node
    Processed,
    /// Voted on by a supermajority of the cluster
    #[default]
    #[serde(alias = "singlegossip")]
    Confirmed,
    /// Rooted
    Finalized,
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Commitment::Processed => write!(f, "processed"),
            Commitment::Confirmed => write!(f, "confirmed"),
            Commitment::Finalized => write!(f, "finalized"),
        }
    }
}

impl FromStr for Commitment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" | "recent" => Ok(Self::Processed),
            "confirmed" | "singlegossip" => Ok(Self::Confirmed),
            "finalized" | "max" => Ok(Self::Finalized),
            other => Err(Error::Custom(format!("Unknown commitment level: {other}"))),
        }
    }
}

/// Status of a submitted transaction at a given commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Not yet observed at the requested commitment
    Pending,
    /// Executed without error
    Succeeded,
    /// Executed and failed on chain
    Failed {
        /// Raw error reported by the runtime
        err: Option<String>,
    },
}

/// Raw machine state as reported by the remote resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Total items the machine can mint
    pub items_available: u64,
    /// Items already minted
    pub items_redeemed: u64,
    /// Unix timestamp at which minting opens
    pub go_live_date: u64,
}

/// Immutable snapshot of supply counts and activation instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySnapshot {
    /// Total items
    pub items_available: u64,
    /// Items minted
    pub items_redeemed: u64,
    /// Items left
    pub items_remaining: u64,
    /// Unix timestamp at which minting opens
    pub activation_instant: u64,
}

impl From<&MachineState> for SupplySnapshot {
    fn from(state: &MachineState) -> Self {
        Self {
            items_available: state.items_available,
            items_redeemed: state.items_redeemed,
            items_remaining: state.items_available.saturating_sub(state.items_redeemed),
            activation_instant: state.go_live_date,
        }
    }
}

impl SupplySnapshot {
    /// No items left
    pub fn is_sold_out(&self) -> bool {
        self.items_remaining == 0
    }

    /// `available == redeemed + remaining`
    ///
    /// Only false when the remote reported more redeemed than available.
    pub fn is_consistent(&self) -> bool {
        self.items_redeemed
            .checked_add(self.items_remaining)
            .is_some_and(|total| total == self.items_available)
    }
}
