//! Activation gate
//!
//! One-shot switch that opens the minting window at the activation instant.
//! The delay is computed once when subscribing and then waited on the
//! runtime's monotonic clock, so later wall-clock adjustments on the client
//! do not move the switch.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cmk_common::task::spawn;
use cmk_common::util::unix_time;
use tokio_util::sync::CancellationToken;

/// Whether minting is open at `now` (both unix seconds)
pub fn evaluate(activation_instant: u64, now: u64) -> bool {
    now >= activation_instant
}

/// Monotonic activation switch shared by all of its subscriptions
#[derive(Debug, Clone, Default)]
pub struct ActivationGate {
    active: Arc<AtomicBool>,
}

impl ActivationGate {
    /// Create a new inactive gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate has fired
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Schedule `on_activate` for `activation_instant`
    ///
    /// Fires immediately when the instant has already passed. The callback is
    /// invoked at most once per gate: once the gate is active, later
    /// subscriptions never call their callback.
    pub fn subscribe<F>(&self, activation_instant: u64, on_activate: F) -> ActivationSubscription
    where
        F: FnOnce() + Send + 'static,
    {
        self.subscribe_at(activation_instant, unix_time(), on_activate)
    }

    /// [`ActivationGate::subscribe`] with an explicit notion of `now`
    pub fn subscribe_at<F>(
        &self,
        activation_instant: u64,
        now: u64,
        on_activate: F,
    ) -> ActivationSubscription
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();

        if self.is_active() {
            return ActivationSubscription { cancel };
        }

        if evaluate(activation_instant, now) {
            self.fire(on_activate);
            return ActivationSubscription { cancel };
        }

        let delay = Duration::from_secs(activation_instant - now);
        tracing::debug!("Activation scheduled in {}s", delay.as_secs());

        let gate = self.clone();
        let cancel_clone = cancel.clone();
        spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_clone.cancelled() => {
                    tracing::debug!("Activation subscription cancelled before firing");
                }
                _ = tokio::time::sleep(delay) => {
                    gate.fire(on_activate);
                }
            }
        });

        ActivationSubscription { cancel }
    }

    fn fire<F>(&self, on_activate: F)
    where
        F: FnOnce(),
    {
        if !self.active.swap(true, Ordering::AcqRel) {
            on_activate();
        }
    }
}

/// Pending activation callback
///
/// Dropping the subscription suppresses a callback that has not fired yet.
#[derive(Debug)]
pub struct ActivationSubscription {
    cancel: CancellationToken,
}

impl ActivationSubscription {
    /// Suppress the callback if it has not fired
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ActivationSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Time left until activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Hours, days folded in
    pub hours: u64,
    /// Minutes
    pub minutes: u64,
    /// Seconds
    pub seconds: u64,
}

impl Countdown {
    /// Countdown to `activation_instant`, `None` once it is reached
    pub fn until(activation_instant: u64, now: u64) -> Option<Self> {
        if evaluate(activation_instant, now) {
            return None;
        }
        let left = activation_instant - now;
        Some(Self {
            hours: left / 3600,
            minutes: (left % 3600) / 60,
            seconds: left % 60,
        })
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hours, {} minutes, {} seconds",
            self.hours, self.minutes, self.seconds
        )
    }
}
