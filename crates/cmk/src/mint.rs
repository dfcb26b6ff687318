//! Mint controller
//!
//! Owns one mint session: the display model, the activation gate and the
//! re-entrancy guard that allows at most one mint attempt in flight.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cmk_common::util::unix_time;
use cmk_common::{
    AlertNotice, DisplayModel, Error, MachineConnector, PublicKey, Severity, Signature,
    SupplySnapshot,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::activation::{ActivationGate, ActivationSubscription, Countdown};
use crate::classify::{classify, Classification, FailureKind, StateInstruction, MSG_SUCCEEDED};
use crate::config::MintConfig;
use crate::supply;
use crate::wait::{await_confirmation, Confirmation};

/// Mint controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MintState {
    /// No attempt in flight
    #[default]
    Idle,
    /// Transaction being submitted
    Submitting,
    /// Submitted, waiting for settlement
    AwaitingConfirmation,
    /// Confirmed without error
    Succeeded,
    /// Rejected before or after inclusion
    Rejected,
    /// Outcome unknown at the deadline
    TimedOut,
}

impl fmt::Display for MintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintState::Idle => write!(f, "IDLE"),
            MintState::Submitting => write!(f, "SUBMITTING"),
            MintState::AwaitingConfirmation => write!(f, "AWAITING_CONFIRMATION"),
            MintState::Succeeded => write!(f, "SUCCEEDED"),
            MintState::Rejected => write!(f, "REJECTED"),
            MintState::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Outcome of a mint attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Not terminated yet
    Pending,
    /// Confirmed without error
    Confirmed,
    /// Rejected, with the classified reason
    Rejected(FailureKind),
    /// Confirmation not observed in time
    TimedOut,
    /// Session torn down while the attempt was in flight
    Cancelled,
}

/// One end to end mint attempt
#[derive(Debug, Clone)]
pub struct MintAttempt {
    /// Attempt id, for log correlation
    pub id: Uuid,
    /// Payer
    pub identity: PublicKey,
    /// Signature once submitted
    pub signature: Option<Signature>,
    /// Outcome
    pub outcome: AttemptOutcome,
}

impl MintAttempt {
    fn new(identity: PublicKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            signature: None,
            outcome: AttemptOutcome::Pending,
        }
    }
}

/// Held for the duration of one attempt
///
/// Releases the in-flight flag on drop. Unless the session was torn down it
/// also clears `is_minting` and returns the controller to `Idle`, so an
/// attempt whose future is dropped midway does not leave the display stuck.
struct InFlightGuard<'a> {
    controller: &'a MintController,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(controller: &'a MintController) -> Option<Self> {
        controller
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { controller })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let controller = self.controller;

        if !controller.cancel.is_cancelled() {
            controller.display.send_if_modified(|model| {
                let was_minting = model.is_minting;
                model.is_minting = false;
                was_minting
            });

            if controller.state() != MintState::Idle {
                controller.set_state(MintState::Idle);
            }
        }

        controller.in_flight.store(false, Ordering::Release);
    }
}

/// Mint controller
#[derive(Debug)]
pub struct MintController {
    config: MintConfig,
    connector: Arc<dyn MachineConnector + Send + Sync>,
    identity: Option<PublicKey>,
    display: Arc<watch::Sender<DisplayModel>>,
    state: Mutex<MintState>,
    in_flight: AtomicBool,
    sold_out_signalled: AtomicBool,
    gate: ActivationGate,
    gate_subscription: Mutex<Option<(u64, ActivationSubscription)>>,
    cancel: CancellationToken,
}

impl MintController {
    /// Create a new controller
    ///
    /// `identity` is the connected wallet, `None` when no wallet is connected.
    /// It is fixed for the lifetime of the controller; an identity change
    /// means a new controller.
    pub fn new(
        config: MintConfig,
        connector: Arc<dyn MachineConnector + Send + Sync>,
        identity: Option<PublicKey>,
    ) -> Self {
        let display = DisplayModel {
            connected: identity.is_some(),
            activation_instant: config.start_date,
            ..Default::default()
        };
        let (display, _) = watch::channel(display);

        Self {
            config,
            connector,
            identity,
            display: Arc::new(display),
            state: Mutex::new(MintState::Idle),
            in_flight: AtomicBool::new(false),
            sold_out_signalled: AtomicBool::new(false),
            gate: ActivationGate::new(),
            gate_subscription: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Read-only view of the display model
    pub fn subscribe_display(&self) -> watch::Receiver<DisplayModel> {
        self.display.subscribe()
    }

    /// Current display model
    pub fn display(&self) -> DisplayModel {
        self.display.borrow().clone()
    }

    /// Current controller state
    pub fn state(&self) -> MintState {
        *self.state.lock()
    }

    /// Connected identity
    pub fn identity(&self) -> Option<&PublicKey> {
        self.identity.as_ref()
    }

    /// Config
    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    /// Minting window open
    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Time left until the minting window opens
    pub fn countdown(&self) -> Option<Countdown> {
        if self.gate.is_active() {
            return None;
        }
        Countdown::until(self.display.borrow().activation_instant, unix_time())
    }

    /// Initial refresh: balance, supply and activation
    ///
    /// Background refresh failures are logged and leave the display as is.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        if self.identity.is_none() {
            tracing::debug!("No wallet connected, skipping refresh");
            self.arm_gate(self.config.start_date);
            return;
        }

        if let Err(err) = self.refresh_balance().await {
            tracing::warn!("Could not refresh balance: {}", err);
        }

        if let Err(err) = self.refresh_supply().await {
            tracing::warn!("Could not refresh supply: {}", err);
            let instant = self.display.borrow().activation_instant;
            self.arm_gate(instant);
        }
    }

    /// Tear the session down
    ///
    /// Pending activation callbacks are suppressed and in-flight polling stops.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.gate_subscription.lock().take();
    }

    /// Refresh the supply counts from the remote machine
    #[instrument(skip(self))]
    pub async fn refresh_supply(&self) -> Result<SupplySnapshot, Error> {
        let identity = self.identity.as_ref().ok_or(Error::NotConnected)?;

        let snapshot = supply::refresh(
            identity,
            &self.config.candy_machine_id,
            self.connector.as_ref(),
        )
        .await?;

        if self.cancel.is_cancelled() {
            return Ok(snapshot);
        }

        let sold_out = snapshot.is_sold_out() || self.sold_out_signalled.load(Ordering::Acquire);
        self.display.send_modify(|model| {
            model.apply_snapshot(&snapshot);
            model.is_sold_out = sold_out;
        });
        self.arm_gate(snapshot.activation_instant);

        Ok(snapshot)
    }

    /// Refresh the wallet balance
    #[instrument(skip(self))]
    pub async fn refresh_balance(&self) -> Result<u64, Error> {
        let identity = self.identity.as_ref().ok_or(Error::NotConnected)?;

        let balance = self.connector.get_balance(identity).await?;

        if !self.cancel.is_cancelled() {
            self.display
                .send_modify(|model| model.balance = Some(balance));
        }

        Ok(balance)
    }

    /// Dismiss the current notice
    pub fn dismiss_notice(&self) {
        self.display.send_modify(|model| {
            if let Some(notice) = model.current_notice.as_mut() {
                notice.visible = false;
            }
        });
    }

    /// Run one mint attempt
    ///
    /// Returns `None` without doing anything when minting is not possible:
    /// no wallet, window closed, sold out or another attempt in flight.
    #[instrument(skip(self))]
    pub async fn mint(&self) -> Option<MintAttempt> {
        let identity = match &self.identity {
            Some(identity) => identity.clone(),
            None => {
                tracing::debug!("Mint ignored, no wallet connected");
                return None;
            }
        };

        if !self.gate.is_active() {
            tracing::debug!("Mint ignored, minting is not active yet");
            return None;
        }

        if self.display.borrow().is_sold_out {
            tracing::debug!("Mint ignored, sold out");
            return None;
        }

        let Some(_guard) = InFlightGuard::acquire(self) else {
            tracing::debug!("Mint ignored, attempt already in flight");
            return None;
        };

        let mut attempt = MintAttempt::new(identity);
        tracing::info!("Starting mint attempt {}", attempt.id);

        self.display.send_modify(|model| model.is_minting = true);

        let notice = match self.execute(&mut attempt).await {
            Ok(notice) => notice,
            Err(err) => {
                tracing::info!("Mint attempt {} abandoned: {}", attempt.id, err);
                attempt.outcome = AttemptOutcome::Cancelled;
                self.set_state(MintState::Idle);
                return Some(attempt);
            }
        };

        self.close_attempt(notice).await;

        Some(attempt)
    }

    /// Submit, confirm and classify; errors only on teardown
    async fn execute(&self, attempt: &mut MintAttempt) -> Result<AlertNotice, Error> {
        self.set_state(MintState::Submitting);

        let submitted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            res = self.connector.submit_mint(
                &attempt.identity,
                &self.config.candy_machine_id,
                &self.config.treasury,
            ) => res,
        };

        let signature = match submitted {
            Ok(signature) => signature,
            Err(err) => {
                tracing::warn!("Mint submission failed: {}", err);
                return Ok(self.reject(attempt, classify(&err)));
            }
        };

        tracing::info!("Mint transaction submitted: {}", signature);
        attempt.signature = Some(signature.clone());
        self.set_state(MintState::AwaitingConfirmation);

        let confirmation = await_confirmation(
            self.connector.as_ref(),
            &signature,
            self.config.tx_timeout(),
            self.config.poll_interval(),
            self.config.commitment,
            &self.cancel,
        )
        .await;

        match confirmation {
            Ok(Confirmation::Settled {
                error_present: false,
            }) => {
                attempt.outcome = AttemptOutcome::Confirmed;
                self.set_state(MintState::Succeeded);
                Ok(AlertNotice::new(MSG_SUCCEEDED, Severity::Success))
            }
            Ok(Confirmation::Settled {
                error_present: true,
            }) => Ok(self.reject(attempt, Classification::failed_on_chain())),
            Ok(Confirmation::TimedOut) => {
                attempt.outcome = AttemptOutcome::TimedOut;
                self.set_state(MintState::TimedOut);
                Ok(Classification::timed_out().notice())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                tracing::warn!("Confirmation of {} failed: {}", signature, err);
                Ok(self.reject(attempt, classify(&err)))
            }
        }
    }

    fn reject(&self, attempt: &mut MintAttempt, classification: Classification) -> AlertNotice {
        if classification.instruction == Some(StateInstruction::MarkSoldOut) {
            self.sold_out_signalled.store(true, Ordering::Release);
            self.display.send_modify(|model| model.is_sold_out = true);
        }

        if classification.kind == FailureKind::TimedOut {
            attempt.outcome = AttemptOutcome::TimedOut;
            self.set_state(MintState::TimedOut);
        } else {
            attempt.outcome = AttemptOutcome::Rejected(classification.kind);
            self.set_state(MintState::Rejected);
        }

        classification.notice()
    }

    /// Publish the notice and refresh balance and supply
    ///
    /// Refresh failures are logged and never replace the attempt's notice.
    async fn close_attempt(&self, notice: AlertNotice) {
        self.display
            .send_modify(|model| model.current_notice = Some(notice));

        if let Err(err) = self.refresh_balance().await {
            tracing::warn!("Could not refresh balance after mint: {}", err);
        }

        self.display.send_modify(|model| model.is_minting = false);

        if let Err(err) = self.refresh_supply().await {
            tracing::warn!("Could not refresh supply after mint: {}", err);
        }

        self.set_state(MintState::Idle);
    }

    fn set_state(&self, next: MintState) {
        let mut state = self.state.lock();
        tracing::debug!("Mint state {} -> {}", *state, next);
        *state = next;
    }

    /// Schedule the activation switch for `activation_instant`
    fn arm_gate(&self, activation_instant: u64) {
        if self.gate.is_active() || self.cancel.is_cancelled() {
            return;
        }

        if let Some((armed, _)) = self.gate_subscription.lock().as_ref() {
            if *armed == activation_instant {
                return;
            }
        }

        let display = Arc::clone(&self.display);
        let subscription = self.gate.subscribe(activation_instant, move || {
            tracing::info!("Minting is now active");
            display.send_modify(|model| model.is_active = true);
        });

        *self.gate_subscription.lock() = Some((activation_instant, subscription));
    }
}

impl Drop for MintController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cmk_common::{MachineState, ProgramError, ProgramErrorCode, TransactionStatus};

    use super::*;
    use crate::classify::{MSG_FAILED_ON_CHAIN, MSG_SOLD_OUT};
    use crate::test_utils::{create_test_controller, test_identity, MockMachineConnector};

    fn live_machine(remaining: u64) -> MachineState {
        MachineState {
            items_available: 100,
            items_redeemed: 100 - remaining,
            go_live_date: 0,
        }
    }

    async fn started(connector: &Arc<MockMachineConnector>) -> MintController {
        let controller = create_test_controller(Arc::clone(connector), Some(test_identity()));
        controller.start().await;
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_mint_refreshes_supply() {
        let connector = Arc::new(MockMachineConnector::new());
        connector.set_machine_state(live_machine(10));
        let controller = started(&connector).await;
        assert!(controller.display().can_mint());

        connector.push_status_response(Ok(TransactionStatus::Pending));
        connector.set_final_status(TransactionStatus::Succeeded);
        connector.set_machine_state(live_machine(9));
        let supply_reads = connector.machine_state_calls.load(Ordering::SeqCst);

        let attempt = controller.mint().await.expect("attempt ran");

        assert_eq!(attempt.outcome, AttemptOutcome::Confirmed);
        assert!(attempt.signature.is_some());

        let display = controller.display();
        let notice = display.current_notice.expect("notice");
        assert_eq!(notice.severity, Severity::Success);
        assert!(notice.message.contains("succeeded"));
        assert_eq!(display.items_remaining, 9);
        assert!(!display.is_minting);
        assert_eq!(
            connector.machine_state_calls.load(Ordering::SeqCst),
            supply_reads + 1
        );
        assert_eq!(controller.state(), MintState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_trigger_submits_once() {
        let connector = Arc::new(MockMachineConnector::new());
        connector.set_machine_state(live_machine(10));
        let controller = started(&connector).await;

        connector.push_status_response(Ok(TransactionStatus::Pending));
        connector.push_status_response(Ok(TransactionStatus::Pending));
        connector.set_final_status(TransactionStatus::Succeeded);

        let (first, second) = tokio::join!(controller.mint(), controller.mint());

        let attempts: Vec<_> = [first, second].into_iter().flatten().collect();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Confirmed);
        assert_eq!(connector.submits(), 1);

        // guard is released once the attempt closed
        assert!(controller.mint().await.is_some());
        assert_eq!(connector.submits(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_structured_sold_out_forces_sold_out() {
        let connector = Arc::new(MockMachineConnector::new());
        connector.set_machine_state(live_machine(5));
        let controller = started(&connector).await;

        connector.push_submit_response(Err(Error::Program(ProgramError::new(
            ProgramErrorCode::CandyMachineEmpty,
            Some("Candy machine is empty!".to_string()),
        ))));

        let attempt = controller.mint().await.expect("attempt ran");

        assert_eq!(
            attempt.outcome,
            AttemptOutcome::Rejected(FailureKind::SoldOut)
        );
        let display = controller.display();
        // stale snapshot still says 5 remaining
        assert_eq!(display.items_remaining, 5);
        assert!(display.is_sold_out);
        assert_eq!(
            display.current_notice.expect("notice").message,
            MSG_SOLD_OUT
        );

        // later triggers are ignored
        assert!(controller.mint().await.is_none());
        assert_eq!(connector.submits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_chain_failure_is_rejected() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;

        connector.set_final_status(TransactionStatus::Failed { err: None });

        let attempt = controller.mint().await.expect("attempt ran");

        assert_eq!(
            attempt.outcome,
            AttemptOutcome::Rejected(FailureKind::ProgramRejected)
        );
        let notice = controller.display().current_notice.expect("notice");
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(notice.message, MSG_FAILED_ON_CHAIN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_reported_as_failure() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;

        connector.set_final_status(TransactionStatus::Pending);

        let attempt = controller.mint().await.expect("attempt ran");

        assert_eq!(attempt.outcome, AttemptOutcome::TimedOut);
        let notice = controller.display().current_notice.expect("notice");
        assert_ne!(notice.severity, Severity::Error);
        assert!(!notice.message.contains("Mint failed"));
        assert!(notice.message.contains("check your wallet"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failures_do_not_override_notice() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;
        let before = controller.display();

        connector.set_balance(None);
        connector.set_machine_unavailable();

        let attempt = controller.mint().await.expect("attempt ran");

        assert_eq!(attempt.outcome, AttemptOutcome::Confirmed);
        let display = controller.display();
        assert_eq!(
            display.current_notice.expect("notice").severity,
            Severity::Success
        );
        assert_eq!(display.balance, before.balance);
        assert_eq!(display.items_remaining, before.items_remaining);
        assert!(!display.is_minting);
        assert_eq!(controller.state(), MintState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_ignored_without_identity_or_before_activation() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = create_test_controller(Arc::clone(&connector), None);
        controller.start().await;
        assert!(!controller.display().connected);
        assert!(controller.mint().await.is_none());

        let now = unix_time();
        connector.set_machine_state(MachineState {
            items_available: 10,
            items_redeemed: 0,
            go_live_date: now + 3_600,
        });
        let controller = started(&connector).await;
        assert!(!controller.is_active());
        assert!(controller.countdown().is_some());
        assert!(controller.mint().await.is_none());
        assert_eq!(connector.submits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_poll_stops_side_effects() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;
        connector.set_final_status(TransactionStatus::Pending);

        let mint = controller.mint();
        let teardown = async {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            controller.shutdown();
        };
        let (attempt, _) = tokio::join!(mint, teardown);

        let attempt = attempt.expect("attempt ran");
        assert_eq!(attempt.outcome, AttemptOutcome::Cancelled);

        let polls = connector.status_calls.load(Ordering::SeqCst);
        let balance_reads = connector.balance_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.status_calls.load(Ordering::SeqCst), polls);
        assert_eq!(connector.balance_calls.load(Ordering::SeqCst), balance_reads);
        assert!(controller.display().current_notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_attempt_returns_to_idle() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;
        connector.set_final_status(TransactionStatus::Pending);

        let res = tokio::time::timeout(Duration::from_millis(1_200), controller.mint()).await;
        assert!(res.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;

        let display = controller.display();
        assert!(!display.is_minting);
        assert!(display.can_mint());
        assert_eq!(controller.state(), MintState::Idle);

        connector.set_final_status(TransactionStatus::Succeeded);
        let attempt = controller.mint().await.expect("attempt ran");
        assert_eq!(attempt.outcome, AttemptOutcome::Confirmed);
        assert_eq!(connector.submits(), 2);
    }

    #[tokio::test]
    async fn test_dismiss_notice() {
        let connector = Arc::new(MockMachineConnector::new());
        let controller = started(&connector).await;
        connector.push_submit_response(Err(Error::Custom("boom".to_string())));

        controller.mint().await.expect("attempt ran");
        assert!(controller.display().current_notice.expect("notice").visible);

        controller.dismiss_notice();
        let notice = controller.display().current_notice.expect("notice");
        assert!(!notice.visible);
        assert_eq!(notice.severity, Severity::Error);
    }
}
