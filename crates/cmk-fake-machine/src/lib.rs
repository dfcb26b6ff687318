//! CMK Fake Machine
//!
//! In-memory candy machine used for testing and demos. Mints settle after a
//! configurable delay; failures can be scripted per submission.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cmk_common::util::unix_time;
use cmk_common::{
    Commitment, MachineConnector, MachineState, ProgramError, ProgramErrorCode, PublicKey,
    Signature, TransactionStatus,
};
use error::Error;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::instrument;
use uuid::Uuid;

pub mod error;

/// How a submitted mint settles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FakeOutcome {
    /// Lands and succeeds
    #[default]
    Succeed,
    /// Lands and fails on chain
    FailOnChain,
    /// Never reaches the requested commitment
    NeverSettle,
}

/// Fake machine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeMachineConfig {
    /// Total items
    pub items_available: u64,
    /// Items already minted
    pub items_redeemed: u64,
    /// Unix timestamp at which minting opens
    pub go_live_date: u64,
    /// Mint price
    pub price_lamports: u64,
    /// Balance of payers seen for the first time
    pub starting_balance_lamports: u64,
    /// Time until a mint reaches `confirmed`
    pub confirm_delay_ms: u64,
    /// How submitted mints settle
    pub outcome: FakeOutcome,
}

impl Default for FakeMachineConfig {
    fn default() -> Self {
        Self {
            items_available: 100,
            items_redeemed: 0,
            go_live_date: 0,
            price_lamports: 330_000_000,
            starting_balance_lamports: 1_000_000_000,
            confirm_delay_ms: 1_500,
            outcome: FakeOutcome::Succeed,
        }
    }
}

#[derive(Debug)]
struct FakeTransaction {
    submitted_at: Instant,
    outcome: FakeOutcome,
}

/// Fake candy machine
#[derive(Debug)]
pub struct FakeMachine {
    price_lamports: u64,
    starting_balance_lamports: u64,
    confirm_delay: Duration,
    outcome: Mutex<FakeOutcome>,
    state: Mutex<MachineState>,
    balances: Mutex<HashMap<PublicKey, u64>>,
    transactions: Mutex<HashMap<Signature, FakeTransaction>>,
    scripted_errors: Mutex<VecDeque<ProgramError>>,
    offline: AtomicBool,
    submissions: AtomicUsize,
}

impl Default for FakeMachine {
    fn default() -> Self {
        Self::new(FakeMachineConfig::default())
    }
}

impl FakeMachine {
    /// Create new [`FakeMachine`]
    pub fn new(config: FakeMachineConfig) -> Self {
        Self {
            price_lamports: config.price_lamports,
            starting_balance_lamports: config.starting_balance_lamports,
            confirm_delay: Duration::from_millis(config.confirm_delay_ms),
            outcome: Mutex::new(config.outcome),
            state: Mutex::new(MachineState {
                items_available: config.items_available,
                items_redeemed: config.items_redeemed.min(config.items_available),
                go_live_date: config.go_live_date,
            }),
            balances: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
            scripted_errors: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
            submissions: AtomicUsize::new(0),
        }
    }

    /// Simulate an outage; every call fails while offline
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Change how later submissions settle
    pub fn set_outcome(&self, outcome: FakeOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Reject the next submission with a program error
    pub fn push_program_error(&self, err: ProgramError) {
        self.scripted_errors.lock().push_back(err);
    }

    /// Set the balance of a payer
    pub fn set_balance(&self, account: &PublicKey, lamports: u64) {
        self.balances.lock().insert(account.clone(), lamports);
    }

    /// Move the activation instant
    pub fn set_go_live_date(&self, go_live_date: u64) {
        self.state.lock().go_live_date = go_live_date;
    }

    /// Number of submissions received
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Current machine state
    pub fn machine_state(&self) -> MachineState {
        self.state.lock().clone()
    }

    fn ensure_online(&self) -> Result<(), Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Offline);
        }
        Ok(())
    }

    fn balance_of(&self, account: &PublicKey) -> u64 {
        *self
            .balances
            .lock()
            .entry(account.clone())
            .or_insert(self.starting_balance_lamports)
    }

    fn settle_delay(&self, commitment: Commitment) -> Duration {
        match commitment {
            Commitment::Processed => self.confirm_delay / 2,
            Commitment::Confirmed => self.confirm_delay,
            Commitment::Finalized => self.confirm_delay.saturating_mul(2),
        }
    }

    /// Apply the program's checks and effects for one mint
    fn process_mint(&self, payer: &PublicKey) -> Result<FakeOutcome, cmk_common::Error> {
        if let Some(err) = self.scripted_errors.lock().pop_front() {
            return Err(err.into());
        }

        let mut state = self.state.lock();

        if unix_time() < state.go_live_date {
            return Err(ProgramError::new(
                ProgramErrorCode::CandyMachineNotLiveYet,
                Some("Candy machine is not live yet!".to_string()),
            )
            .into());
        }

        if state.items_redeemed >= state.items_available {
            return Err(ProgramError::new(
                ProgramErrorCode::CandyMachineEmpty,
                Some("Candy machine is empty!".to_string()),
            )
            .into());
        }

        let have = self.balance_of(payer);
        if have < self.price_lamports {
            return Err(Error::InsufficientFunds {
                have,
                need: self.price_lamports,
            }
            .into());
        }

        let outcome = *self.outcome.lock();
        if outcome == FakeOutcome::Succeed {
            state.items_redeemed += 1;
            self.balances
                .lock()
                .insert(payer.clone(), have - self.price_lamports);
        }

        Ok(outcome)
    }
}

#[async_trait]
impl MachineConnector for FakeMachine {
    async fn get_machine_state(
        &self,
        _machine_id: &PublicKey,
    ) -> Result<MachineState, cmk_common::Error> {
        self.ensure_online()?;
        Ok(self.machine_state())
    }

    #[instrument(skip(self))]
    async fn submit_mint(
        &self,
        payer: &PublicKey,
        machine_id: &PublicKey,
        _treasury: &PublicKey,
    ) -> Result<Signature, cmk_common::Error> {
        self.ensure_online()?;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let outcome = self.process_mint(payer)?;

        let signature: Signature = format!("fake{}", Uuid::new_v4().simple()).parse()?;
        self.transactions.lock().insert(
            signature.clone(),
            FakeTransaction {
                submitted_at: Instant::now(),
                outcome,
            },
        );

        tracing::debug!("Fake machine accepted mint {} from {}", signature, payer);

        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<TransactionStatus, cmk_common::Error> {
        self.ensure_online()?;

        let transactions = self.transactions.lock();
        let transaction = transactions
            .get(signature)
            .ok_or_else(|| Error::UnknownSignature(signature.clone()))?;

        if transaction.submitted_at.elapsed() < self.settle_delay(commitment) {
            return Ok(TransactionStatus::Pending);
        }

        Ok(match transaction.outcome {
            FakeOutcome::Succeed => TransactionStatus::Succeeded,
            FakeOutcome::FailOnChain => TransactionStatus::Failed {
                err: Some(format!(
                    "custom program error: {}",
                    ProgramErrorCode::TokenTransferFailed.to_hex()
                )),
            },
            FakeOutcome::NeverSettle => TransactionStatus::Pending,
        })
    }

    async fn get_balance(&self, account: &PublicKey) -> Result<u64, cmk_common::Error> {
        self.ensure_online()?;
        Ok(self.balance_of(account))
    }
}
