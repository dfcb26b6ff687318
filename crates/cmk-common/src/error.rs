//! Errors

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// CMK Error
#[derive(Debug, Error)]
pub enum Error {
    /// Remote channel could not be reached
    #[error("Remote unavailable: `{0}`")]
    RemoteUnavailable(String),
    /// Structured rejection from the on-chain program
    #[error(transparent)]
    Program(#[from] ProgramError),
    /// Unstructured failure reported by the remote execution environment
    #[error("Transaction failed: `{0}`")]
    TransactionFailed(String),
    /// Signature is not known to the remote channel
    #[error("Unknown signature `{0}`")]
    UnknownSignature(String),
    /// Wallet is not connected
    #[error("Wallet not connected")]
    NotConnected,
    /// Invalid public key
    #[error("Invalid public key: `{0}`")]
    InvalidPublicKey(String),
    /// Invalid transaction signature
    #[error("Invalid signature: `{0}`")]
    InvalidSignature(String),
    /// Timeout
    #[error("Timeout")]
    Timeout,
    /// Operation cancelled by teardown
    #[error("Operation cancelled")]
    Cancelled,
    /// Custom Error
    #[error("`{0}`")]
    Custom(String),
}

impl Error {
    /// Check if the error is a definitive failure
    ///
    /// A definitive failure means the remote side rejected the request and
    /// will not process it. Anything else (network trouble, timeouts) leaves
    /// the transaction state unknown.
    pub fn is_definitive_failure(&self) -> bool {
        match self {
            Self::Program(_)
            | Self::TransactionFailed(_)
            | Self::UnknownSignature(_)
            | Self::NotConnected
            | Self::InvalidPublicKey(_)
            | Self::InvalidSignature(_) => true,

            Self::RemoteUnavailable(_)
            | Self::Timeout
            | Self::Cancelled
            | Self::Custom(_) => false,
        }
    }

    /// Structured program code carried by this error, if any
    pub fn program_code(&self) -> Option<ProgramErrorCode> {
        match self {
            Self::Program(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Program error as returned by the remote execution environment
///
/// `msg` is the accompanying text the program attaches to its error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramError {
    /// Error code
    pub code: ProgramErrorCode,
    /// Human readable description
    #[serde(default)]
    pub msg: Option<String>,
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.msg {
            Some(msg) => write!(f, "code: {}, msg: {}", self.code, msg),
            None => write!(f, "code: {}", self.code),
        }
    }
}

impl std::error::Error for ProgramError {}

impl ProgramError {
    /// Create new [`ProgramError`]
    pub fn new(code: ProgramErrorCode, msg: Option<String>) -> Self {
        Self { code, msg }
    }
}

/// Candy machine program error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramErrorCode {
    /// Not enough tokens to pay for this minting (308)
    NotEnoughTokens,
    /// Not enough SOL to pay for this minting (309)
    NotEnoughSol,
    /// Token transfer failed (310)
    TokenTransferFailed,
    /// Candy machine is empty (311)
    CandyMachineEmpty,
    /// Candy machine is not live yet (312)
    CandyMachineNotLiveYet,
    /// Unknown error code
    Unknown(u32),
}

impl ProgramErrorCode {
    /// Error code from u32
    pub fn from_code(code: u32) -> Self {
        match code {
            308 => Self::NotEnoughTokens,
            309 => Self::NotEnoughSol,
            310 => Self::TokenTransferFailed,
            311 => Self::CandyMachineEmpty,
            312 => Self::CandyMachineNotLiveYet,
            _ => Self::Unknown(code),
        }
    }

    /// Error code to u32
    pub fn to_code(&self) -> u32 {
        match self {
            Self::NotEnoughTokens => 308,
            Self::NotEnoughSol => 309,
            Self::TokenTransferFailed => 310,
            Self::CandyMachineEmpty => 311,
            Self::CandyMachineNotLiveYet => 312,
            Self::Unknown(code) => *code,
        }
    }

    /// Hex form of the code as printed in runtime logs, e.g. `0x137`
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.to_code())
    }
}

impl Serialize for ProgramErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.to_code())
    }
}

impl<'de> Deserialize<'de> for ProgramErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u32::deserialize(deserializer)?;

        Ok(ProgramErrorCode::from_code(code))
    }
}

impl fmt::Display for ProgramErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}
