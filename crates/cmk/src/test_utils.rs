#![cfg(test)]
#![allow(missing_docs)]

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cmk_common::{
    Commitment, Error, MachineConnector, MachineState, PublicKey, Signature, TransactionStatus,
};
use url::Url;

use crate::config::MintConfig;
use crate::mint::MintController;

pub fn test_identity() -> PublicKey {
    PublicKey::from_str("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap()
}

pub fn test_machine_id() -> PublicKey {
    PublicKey::from_str("GrVSy3ZRbuw5ACbwSEMsj9gULk9MW7QPK1TUYcP6nLM").unwrap()
}

pub fn test_treasury() -> PublicKey {
    PublicKey::from_str("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM").unwrap()
}

pub fn test_signature() -> Signature {
    Signature::from_str("5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW")
        .unwrap()
}

pub fn test_config() -> MintConfig {
    let mut config = MintConfig::new(
        test_machine_id(),
        test_treasury(),
        Url::parse("https://api.devnet.solana.com").unwrap(),
    );
    config.tx_timeout_ms = 10_000;
    config.poll_interval_ms = 500;
    config
}

/// Controller over a mock connector with the given identity
pub fn create_test_controller(
    connector: Arc<MockMachineConnector>,
    identity: Option<PublicKey>,
) -> MintController {
    MintController::new(test_config(), connector, identity)
}

/// Mock MachineConnector with scripted responses
#[derive(Debug)]
pub struct MockMachineConnector {
    machine_state: Mutex<Option<MachineState>>,
    submit_responses: Mutex<VecDeque<Result<Signature, Error>>>,
    status_responses: Mutex<VecDeque<Result<TransactionStatus, Error>>>,
    final_status: Mutex<TransactionStatus>,
    balance: Mutex<Option<u64>>,
    pub machine_state_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

impl MockMachineConnector {
    pub fn new() -> Self {
        Self {
            machine_state: Mutex::new(Some(MachineState {
                items_available: 100,
                items_redeemed: 10,
                go_live_date: 0,
            })),
            submit_responses: Mutex::new(VecDeque::new()),
            status_responses: Mutex::new(VecDeque::new()),
            final_status: Mutex::new(TransactionStatus::Succeeded),
            balance: Mutex::new(Some(2_000_000_000)),
            machine_state_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_machine_state(&self, state: MachineState) {
        *self.machine_state.lock().unwrap() = Some(state);
    }

    pub fn set_machine_unavailable(&self) {
        *self.machine_state.lock().unwrap() = None;
    }

    pub fn push_submit_response(&self, response: Result<Signature, Error>) {
        self.submit_responses.lock().unwrap().push_back(response);
    }

    pub fn push_status_response(&self, response: Result<TransactionStatus, Error>) {
        self.status_responses.lock().unwrap().push_back(response);
    }

    /// Status returned once the scripted responses are used up
    pub fn set_final_status(&self, status: TransactionStatus) {
        *self.final_status.lock().unwrap() = status;
    }

    pub fn set_balance(&self, balance: Option<u64>) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MachineConnector for MockMachineConnector {
    async fn get_machine_state(&self, _machine_id: &PublicKey) -> Result<MachineState, Error> {
        self.machine_state_calls.fetch_add(1, Ordering::SeqCst);
        self.machine_state
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::RemoteUnavailable("connection refused".to_string()))
    }

    async fn submit_mint(
        &self,
        _payer: &PublicKey,
        _machine_id: &PublicKey,
        _treasury: &PublicKey,
    ) -> Result<Signature, Error> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(test_signature()))
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<TransactionStatus, Error> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.status_responses.lock().unwrap().pop_front();
        match scripted {
            Some(response) => response,
            None => Ok(self.final_status.lock().unwrap().clone()),
        }
    }

    async fn get_balance(&self, _account: &PublicKey) -> Result<u64, Error> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balance
            .lock()
            .unwrap()
            .ok_or_else(|| Error::RemoteUnavailable("connection refused".to_string()))
    }
}
