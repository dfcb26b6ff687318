//! Machine connector

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{Commitment, MachineState, PublicKey, Signature, TransactionStatus};

/// Interface that connects a mint session to the remote ledger.
///
/// Implementations map transport failures to [`Error::RemoteUnavailable`] and
/// program rejections to [`Error::Program`] whenever the program code is
/// available.
#[async_trait]
pub trait MachineConnector: Debug {
    /// Read the candy machine account
    async fn get_machine_state(&self, machine_id: &PublicKey) -> Result<MachineState, Error>;

    /// Submit a mint-one transaction paying into `treasury`
    async fn submit_mint(
        &self,
        payer: &PublicKey,
        machine_id: &PublicKey,
        treasury: &PublicKey,
    ) -> Result<Signature, Error>;

    /// Status of a submitted transaction at the requested commitment
    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<TransactionStatus, Error>;

    /// Account balance in lamports
    async fn get_balance(&self, account: &PublicKey) -> Result<u64, Error>;
}
