//! Candy Mint Kit
//!
//! Client side lifecycle of a candy machine mint: supply refresh, the
//! activation countdown, submission, confirmation polling and failure
//! classification, surfaced through a single display model.
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod activation;
pub mod classify;
pub mod config;
pub mod mint;
pub mod supply;
pub mod wait;

#[cfg(test)]
mod test_utils;

#[doc(hidden)]
pub use cmk_common::{
    self as common, error::Error, AlertNotice, Commitment, DisplayModel, MachineConnector,
    PublicKey, Severity, Signature, SupplySnapshot,
};

pub use activation::{ActivationGate, Countdown};
pub use classify::{classify, Classification, FailureKind};
pub use config::MintConfig;
pub use mint::{AttemptOutcome, MintAttempt, MintController, MintState};
pub use wait::Confirmation;
