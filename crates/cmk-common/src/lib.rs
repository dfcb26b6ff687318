//! CMK shared types and traits.
//!
//! This crate holds the types, errors and the remote connector trait shared by
//! the mint session, the fake machine and the CLI.

pub mod connector;
pub mod display;
pub mod error;
pub mod task;
pub mod types;
pub mod util;

pub use connector::MachineConnector;
pub use display::{AlertNotice, DisplayModel, Severity, NOTICE_AUTO_HIDE};
pub use error::{Error, ProgramError, ProgramErrorCode};
pub use types::{
    lamports_to_sol, Commitment, MachineState, PublicKey, Signature, SupplySnapshot,
    TransactionStatus, LAMPORTS_PER_SOL,
};
