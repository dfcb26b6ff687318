//! Supply state

use cmk_common::{Error, MachineConnector, PublicKey, SupplySnapshot};
use tracing::instrument;

/// Read the current supply counts and activation instant of a candy machine
///
/// The returned snapshot is advisory: the remote counter keeps moving and a
/// mint may still be rejected as sold out.
#[instrument(skip(connector))]
pub async fn refresh<C>(
    identity: &PublicKey,
    machine_id: &PublicKey,
    connector: &C,
) -> Result<SupplySnapshot, Error>
where
    C: MachineConnector + Sync + ?Sized,
{
    let state = connector.get_machine_state(machine_id).await?;
    let snapshot = SupplySnapshot::from(&state);

    if !snapshot.is_consistent() {
        tracing::warn!(
            "Machine {} reports {} redeemed of {} available",
            machine_id,
            state.items_redeemed,
            state.items_available
        );
    }

    tracing::debug!(
        "Supply: {} available, {} redeemed, {} remaining",
        snapshot.items_available,
        snapshot.items_redeemed,
        snapshot.items_remaining
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use cmk_common::MachineState;

    use super::*;
    use crate::test_utils::{test_identity, test_machine_id, MockMachineConnector};

    #[tokio::test]
    async fn test_refresh_keeps_invariant() {
        let connector = MockMachineConnector::new();
        connector.set_machine_state(MachineState {
            items_available: 500,
            items_redeemed: 123,
            go_live_date: 1_700_000_000,
        });

        let snapshot = refresh(&test_identity(), &test_machine_id(), &connector)
            .await
            .expect("snapshot");

        assert_eq!(
            snapshot.items_available,
            snapshot.items_redeemed + snapshot.items_remaining
        );
        assert_eq!(snapshot.items_remaining, 377);
        assert_eq!(snapshot.activation_instant, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_refresh_remote_unavailable() {
        let connector = MockMachineConnector::new();
        connector.set_machine_unavailable();

        let result = refresh(&test_identity(), &test_machine_id(), &connector).await;

        assert!(matches!(result, Err(Error::RemoteUnavailable(_))));
    }
}
