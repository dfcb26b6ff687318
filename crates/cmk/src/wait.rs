//! Confirmation waiting

use std::time::Duration;

use cmk_common::{Commitment, Error, MachineConnector, Signature, TransactionStatus};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Lower bound on the poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settlement outcome of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Terminal status observed
    Settled {
        /// The transaction failed on chain
        error_present: bool,
    },
    /// No terminal status before the deadline; the outcome is unknown
    TimedOut,
}

/// Poll the status of `signature` until it settles, the deadline passes or
/// `cancel` fires
///
/// Ambiguous poll errors are logged and polling continues. A definitive poll
/// error ends the wait and is returned. Cancellation returns
/// [`Error::Cancelled`] and no further requests are issued.
#[instrument(skip(connector, cancel))]
pub async fn await_confirmation<C>(
    connector: &C,
    signature: &Signature,
    timeout_duration: Duration,
    poll_interval: Duration,
    commitment: Commitment,
    cancel: &CancellationToken,
) -> Result<Confirmation, Error>
where
    C: MachineConnector + Sync + ?Sized,
{
    let poll = async {
        let mut ticker = interval(poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match connector.get_signature_status(signature, commitment).await {
                Ok(TransactionStatus::Pending) => {
                    tracing::trace!("Transaction {} still pending", signature);
                }
                Ok(TransactionStatus::Succeeded) => {
                    return Ok(Confirmation::Settled {
                        error_present: false,
                    });
                }
                Ok(TransactionStatus::Failed { err }) => {
                    tracing::info!(
                        "Transaction {} failed on chain: {}",
                        signature,
                        err.as_deref().unwrap_or("no detail")
                    );
                    return Ok(Confirmation::Settled {
                        error_present: true,
                    });
                }
                Err(err) if err.is_definitive_failure() => return Err(err),
                Err(err) => {
                    tracing::warn!("Could not get status of {}: {}", signature, err);
                }
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("Stopped waiting for {}", signature);
            Err(Error::Cancelled)
        }
        res = timeout(timeout_duration, poll) => match res {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(
                    "Transaction {} not confirmed within {}ms",
                    signature,
                    timeout_duration.as_millis()
                );
                Ok(Confirmation::TimedOut)
            }
        },
    }
}
