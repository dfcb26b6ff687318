//! Fake Machine Error

use cmk_common::{ProgramErrorCode, Signature};
use thiserror::Error;

/// Fake Machine Error
#[derive(Debug, Error)]
pub enum Error {
    /// Simulated outage
    #[error("Fake machine is offline")]
    Offline,
    /// Signature never submitted here
    #[error("Unknown signature `{0}`")]
    UnknownSignature(Signature),
    /// Payer cannot cover the price
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Payer balance
        have: u64,
        /// Mint price
        need: u64,
    },
}

impl From<Error> for cmk_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Offline => Self::RemoteUnavailable(Error::Offline.to_string()),
            Error::UnknownSignature(signature) => Self::UnknownSignature(signature.to_string()),
            // The runtime reports this one without a program message, only the hex code
            Error::InsufficientFunds { .. } => Self::TransactionFailed(format!(
                "Transaction simulation failed: Error processing Instruction 0: custom program error: {}",
                ProgramErrorCode::NotEnoughSol.to_hex()
            )),
        }
    }
}
