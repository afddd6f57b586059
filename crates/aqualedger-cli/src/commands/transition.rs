use std::path::Path;

use aqualedger_core::lifecycle::{allowed_transitions, Lifecycle};
use aqualedger_core::models::{CatchId, InventoryStatus};
use aqualedger_core::Error;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_transition(
    id: CatchId,
    next: InventoryStatus,
    force_reason: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let lifecycle = Lifecycle::new(store.clone());

    let result = match force_reason {
        Some(reason) => lifecycle.force_transition(id, next, reason).await,
        None => lifecycle.apply_transition(id, next).await,
    };

    let record = match result {
        Ok(record) => record,
        Err(error) => {
            if let Error::IllegalTransition { from, .. } = &error {
                eprintln!("Hint: {}", transition_hint(*from));
            }
            store.close().await?;
            return Err(error.into());
        }
    };

    println!(
        "{} is now {} ({})",
        record.id,
        record.inventory_status,
        record.inventory_status.label()
    );
    store.close().await?;
    Ok(())
}

/// Human readable list of the stages reachable from `current`.
pub fn transition_hint(current: InventoryStatus) -> String {
    let allowed = allowed_transitions(current);
    if allowed.is_empty() {
        format!("'{current}' is final; use --force with --reason to override")
    } else {
        let names = allowed
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("from '{current}' a catch can move to: {names}")
    }
}
