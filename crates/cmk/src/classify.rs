//! Failure classification
//!
//! Maps raw failures from submission or confirmation to the outcome shown to
//! the user. Structured program codes are always consulted first; message
//! inspection is only the fallback for failures that arrive as plain text.

use cmk_common::{AlertNotice, Error, ProgramErrorCode, Severity};

/// Notice for a confirmed mint
pub const MSG_SUCCEEDED: &str = "Congratulations! Mint succeeded!";
/// Notice for a transaction that landed but failed on chain
pub const MSG_FAILED_ON_CHAIN: &str = "Mint failed! Please try again!";
/// Generic failure notice
pub const MSG_GENERIC_FAILURE: &str = "Minting failed! Please try again!";
/// Sold out notice
pub const MSG_SOLD_OUT: &str = "SOLD OUT!";
/// Minting window not open on the remote clock
pub const MSG_NOT_YET_LIVE: &str = "Minting period hasn't started yet.";
/// Payer cannot cover the price
pub const MSG_INSUFFICIENT_FUNDS: &str = "Insufficient funds to mint. Please fund your wallet.";
/// Confirmation not observed in time
pub const MSG_TIMED_OUT: &str =
    "Mint outcome unknown. Please check your wallet before trying again.";
/// Remote channel unreachable
pub const MSG_REMOTE_UNAVAILABLE: &str = "Could not reach the network. Please try again.";

/// Outcome taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Remote channel could not be reached
    RemoteUnavailable,
    /// Supply exhausted
    SoldOut,
    /// Remote clock says the window is not open yet
    NotYetLive,
    /// Any other structured rejection
    ProgramRejected,
    /// Confirmation not observed before the deadline
    TimedOut,
    /// Could not be classified
    Unknown,
}

/// Local state change the caller must apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateInstruction {
    /// Set `is_sold_out`, overriding the last snapshot
    MarkSoldOut,
}

/// Classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Kind
    pub kind: FailureKind,
    /// User facing message
    pub message: String,
    /// Required local state change
    pub instruction: Option<StateInstruction>,
}

impl Classification {
    fn new<S>(kind: FailureKind, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            message: message.into(),
            instruction: None,
        }
    }

    /// Transaction landed and was rejected on chain
    pub fn failed_on_chain() -> Self {
        Self::new(FailureKind::ProgramRejected, MSG_FAILED_ON_CHAIN)
    }

    /// Confirmation deadline passed
    pub fn timed_out() -> Self {
        Self::new(FailureKind::TimedOut, MSG_TIMED_OUT)
    }

    /// Severity of the notice for this classification
    pub fn severity(&self) -> Severity {
        match self.kind {
            FailureKind::RemoteUnavailable | FailureKind::TimedOut => Severity::Warning,
            FailureKind::SoldOut
            | FailureKind::NotYetLive
            | FailureKind::ProgramRejected
            | FailureKind::Unknown => Severity::Error,
        }
    }

    /// Notice to show for this classification
    pub fn notice(&self) -> AlertNotice {
        AlertNotice::new(self.message.clone(), self.severity())
    }
}

/// Marker kinds found in unstructured failure text, in priority order
const MESSAGE_MARKERS: [(ProgramErrorCode, &str); 2] = [
    (ProgramErrorCode::CandyMachineEmpty, "sold out"),
    (ProgramErrorCode::NotEnoughSol, "insufficient funds"),
];

/// Classify a failure from submission or confirmation
pub fn classify(err: &Error) -> Classification {
    if let Error::Program(program) = err {
        return match program.code {
            ProgramErrorCode::CandyMachineEmpty => Classification {
                instruction: Some(StateInstruction::MarkSoldOut),
                ..Classification::new(FailureKind::SoldOut, MSG_SOLD_OUT)
            },
            ProgramErrorCode::CandyMachineNotLiveYet => {
                Classification::new(FailureKind::NotYetLive, MSG_NOT_YET_LIVE)
            }
            _ => Classification::new(
                FailureKind::ProgramRejected,
                program
                    .msg
                    .clone()
                    .filter(|msg| !msg.trim().is_empty())
                    .unwrap_or_else(|| MSG_GENERIC_FAILURE.to_string()),
            ),
        };
    }

    if let Some(classification) = classify_message(&err.to_string()) {
        return classification;
    }

    match err {
        Error::RemoteUnavailable(_) => {
            Classification::new(FailureKind::RemoteUnavailable, MSG_REMOTE_UNAVAILABLE)
        }
        Error::Timeout => Classification::timed_out(),
        _ => {
            tracing::warn!("Unclassified mint failure: {:?}", err);
            Classification::new(FailureKind::Unknown, MSG_GENERIC_FAILURE)
        }
    }
}

/// Inspect unstructured failure text for known markers
fn classify_message(message: &str) -> Option<Classification> {
    let message = message.to_lowercase();

    MESSAGE_MARKERS
        .iter()
        .find(|(code, phrase)| {
            contains_hex_code(&message, &code.to_hex()) || message.contains(phrase)
        })
        .map(|(code, _)| match code {
            ProgramErrorCode::CandyMachineEmpty => Classification {
                instruction: Some(StateInstruction::MarkSoldOut),
                ..Classification::new(FailureKind::SoldOut, MSG_SOLD_OUT)
            },
            _ => Classification::new(FailureKind::ProgramRejected, MSG_INSUFFICIENT_FUNDS),
        })
}

/// `hex` appears in `message` and is not the prefix of a longer hex number
fn contains_hex_code(message: &str, hex: &str) -> bool {
    message.match_indices(hex).any(|(start, found)| {
        !message[start + found.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_hexdigit())
    })
}
