use std::path::Path;

use aqualedger_core::db::{CatchFilter, CatchOrder};
use aqualedger_core::models::{InventoryStatus, SyncStatus};

use crate::commands::common::{catch_to_list_item, format_catch_lines, open_store, CatchListItem};
use crate::error::CliError;

pub async fn run_list(
    status: Option<SyncStatus>,
    inventory: Option<InventoryStatus>,
    limit: Option<usize>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let mut filter = status
        .map_or_else(CatchFilter::all, CatchFilter::with_status)
        .order(CatchOrder::NewestFirst);
    if let Some(inventory) = inventory {
        filter = filter.inventory(inventory);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }

    let store = open_store(db_path).await?;
    let records = store.list(&filter).await?;
    let now = store.now();

    if as_json {
        let json_items = records
            .iter()
            .map(|record| catch_to_list_item(record, now))
            .collect::<Vec<CatchListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No catches recorded.");
    } else {
        for line in format_catch_lines(&records, now) {
            println!("{line}");
        }
    }

    store.close().await?;
    Ok(())
}
