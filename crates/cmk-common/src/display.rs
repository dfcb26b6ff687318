//! Display model
//!
//! The single surface through which the mint session talks to presentation
//! code. Only the session writes to it; presenters get a read-only view.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{lamports_to_sol, SupplySnapshot};

/// How long presenters should keep a notice on screen
pub const NOTICE_AUTO_HIDE: Duration = Duration::from_millis(6000);

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Success
    Success,
    /// Info
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// User facing notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotice {
    /// Whether the notice is shown
    pub visible: bool,
    /// Message
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl AlertNotice {
    /// Create a visible notice
    pub fn new<S>(message: S, severity: Severity) -> Self
    where
        S: Into<String>,
    {
        Self {
            visible: true,
            message: message.into(),
            severity,
        }
    }
}

/// Display model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayModel {
    /// Wallet connected
    pub connected: bool,
    /// Wallet balance in lamports
    pub balance: Option<u64>,
    /// Total items
    pub items_available: u64,
    /// Items minted
    pub items_redeemed: u64,
    /// Items left
    pub items_remaining: u64,
    /// Unix timestamp at which minting opens
    pub activation_instant: u64,
    /// Minting window open
    pub is_active: bool,
    /// No items left
    pub is_sold_out: bool,
    /// Mint attempt in flight
    pub is_minting: bool,
    /// Most recent notice
    pub current_notice: Option<AlertNotice>,
}

impl DisplayModel {
    /// Balance in SOL, zero when unknown
    pub fn balance_sol(&self) -> f64 {
        self.balance.map(lamports_to_sol).unwrap_or_default()
    }

    /// Copy supply counts from a snapshot
    pub fn apply_snapshot(&mut self, snapshot: &SupplySnapshot) {
        self.items_available = snapshot.items_available;
        self.items_redeemed = snapshot.items_redeemed;
        self.items_remaining = snapshot.items_remaining;
        self.activation_instant = snapshot.activation_instant;
    }

    /// Whether the mint affordance should be enabled
    pub fn can_mint(&self) -> bool {
        self.connected && self.is_active && !self.is_sold_out && !self.is_minting
    }
}
