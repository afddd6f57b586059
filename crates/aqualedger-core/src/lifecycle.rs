//! Inventory lifecycle: `caught -> on_ice -> listed -> sold`.
//!
//! Transitions are strictly checked against [`allowed_transitions`]. Moving a
//! record outside the table is only possible through
//! [`Lifecycle::force_transition`], which needs a reason and leaves an audit
//! trail in both the log and the queued operation.

use serde_json::json;

use crate::models::{CatchId, CatchPatch, CatchRecord, InventoryStatus};
use crate::services::RecordStore;
use crate::{Error, Result};

/// Legal next states for `current`.
pub const fn allowed_transitions(current: InventoryStatus) -> &'static [InventoryStatus] {
    match current {
        InventoryStatus::Caught => &[InventoryStatus::OnIce, InventoryStatus::Sold],
        InventoryStatus::OnIce => &[InventoryStatus::Listed, InventoryStatus::Sold],
        InventoryStatus::Listed => &[InventoryStatus::Sold, InventoryStatus::OnIce],
        InventoryStatus::Sold => &[],
    }
}

/// Whether `current -> next` is in the transition table.
pub fn can_transition(current: InventoryStatus, next: InventoryStatus) -> bool {
    allowed_transitions(current).contains(&next)
}

/// Applies inventory transitions through the record store.
#[derive(Clone)]
pub struct Lifecycle {
    store: RecordStore,
}

impl Lifecycle {
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Move a catch to `next`, rejecting pairs outside the table.
    ///
    /// On success the change is stamped and queued for upload.
    pub async fn apply_transition(&self, id: CatchId, next: InventoryStatus) -> Result<CatchRecord> {
        let (previous, updated) = self
            .store
            .record_local_change_with(id, |current| {
                let from = current.inventory_status;
                if !can_transition(from, next) {
                    return Err(Error::IllegalTransition { from, to: next });
                }
                Ok((CatchPatch::default().inventory_status(next), None))
            })
            .await
            .inspect_err(|error| {
                if let Error::IllegalTransition { from, to } = error {
                    tracing::debug!("Rejected inventory transition for catch {id}: {from} -> {to}");
                }
            })?;
        tracing::info!("Catch {id} moved {} -> {next}", previous.inventory_status);
        Ok(updated)
    }

    /// Administrative override: move a catch to `next` regardless of the table.
    pub async fn force_transition(
        &self,
        id: CatchId,
        next: InventoryStatus,
        reason: &str,
    ) -> Result<CatchRecord> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::InvalidInput(
                "a reason is required to override the inventory lifecycle".into(),
            ));
        }

        let (previous, updated) = self
            .store
            .record_local_change_with(id, |current| {
                let audit = json!({
                    "override": true,
                    "from": current.inventory_status,
                    "to": next,
                    "reason": reason,
                });
                Ok((CatchPatch::default().inventory_status(next), Some(audit)))
            })
            .await?;
        let current = previous.inventory_status;
        tracing::warn!(
            target: "aqualedger::audit",
            catch = %id,
            from = %current,
            to = %next,
            reason,
            allowed = can_transition(current, next),
            "Inventory lifecycle override"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCatch, SyncState, SyncStatus};
    use pretty_assertions::assert_eq;

    async fn setup() -> (Lifecycle, RecordStore, CatchId) {
        let store = RecordStore::open_in_memory().await.unwrap();
        let record = store.create(NewCatch::new("Mackerel", 3.2)).await.unwrap();
        (Lifecycle::new(store.clone()), store, record.id)
    }

    #[test]
    fn table_matches_lifecycle_graph() {
        use InventoryStatus::{Caught, Listed, OnIce, Sold};

        let legal = [
            (Caught, OnIce),
            (Caught, Sold),
            (OnIce, Listed),
            (OnIce, Sold),
            (Listed, Sold),
            (Listed, OnIce),
        ];
        for from in InventoryStatus::ALL {
            for to in InventoryStatus::ALL {
                assert_eq!(
                    can_transition(from, to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        assert!(allowed_transitions(Sold).is_empty());
    }

    #[tokio::test]
    async fn legal_transition_requeues_record() {
        let (lifecycle, store, id) = setup().await;
        store
            .update(id, crate::models::CatchPatch::default().sync(SyncState::Synced))
            .await
            .unwrap();

        let updated = lifecycle
            .apply_transition(id, InventoryStatus::OnIce)
            .await
            .unwrap();
        assert_eq!(updated.inventory_status, InventoryStatus::OnIce);
        assert_eq!(updated.sync_status(), SyncStatus::Pending);
    }

    #[tokio::test]
    async fn caught_to_listed_is_rejected() {
        let (lifecycle, store, id) = setup().await;

        let result = lifecycle.apply_transition(id, InventoryStatus::Listed).await;
        assert!(matches!(
            result,
            Err(Error::IllegalTransition {
                from: InventoryStatus::Caught,
                to: InventoryStatus::Listed
            })
        ));
        let record = store.require(id).await.unwrap();
        assert_eq!(record.inventory_status, InventoryStatus::Caught);
        assert_eq!(store.operations_for(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sold_is_terminal() {
        let (lifecycle, _, id) = setup().await;
        lifecycle
            .apply_transition(id, InventoryStatus::Sold)
            .await
            .unwrap();

        for next in InventoryStatus::ALL {
            assert!(matches!(
                lifecycle.apply_transition(id, next).await,
                Err(Error::IllegalTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (lifecycle, _, _) = setup().await;
        let result = lifecycle
            .apply_transition(CatchId::new(999), InventoryStatus::OnIce)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn override_requires_reason_and_is_audited() {
        let (lifecycle, store, id) = setup().await;
        lifecycle
            .apply_transition(id, InventoryStatus::Sold)
            .await
            .unwrap();

        assert!(matches!(
            lifecycle
                .force_transition(id, InventoryStatus::OnIce, "  ")
                .await,
            Err(Error::InvalidInput(_))
        ));

        let updated = lifecycle
            .force_transition(id, InventoryStatus::OnIce, "buyer cancelled")
            .await
            .unwrap();
        assert_eq!(updated.inventory_status, InventoryStatus::OnIce);
        assert_eq!(updated.sync_status(), SyncStatus::Pending);

        let ops = store.operations_for(id).await.unwrap();
        let last = ops.last().unwrap();
        assert_eq!(last.payload["audit"]["reason"], "buyer cancelled");
        assert_eq!(last.payload["audit"]["from"], "sold");
        assert_eq!(last.payload["audit"]["to"], "on_ice");
    }
}
