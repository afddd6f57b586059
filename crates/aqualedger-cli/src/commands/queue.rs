use std::path::Path;

use aqualedger_core::models::OperationStatus;

use crate::commands::common::{format_queue_lines, open_store};
use crate::error::CliError;

pub async fn run_queue(
    status: Option<OperationStatus>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let operations = store.list_operations(status, limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&operations)?);
    } else if operations.is_empty() {
        println!("Sync queue is empty.");
    } else {
        for line in format_queue_lines(&operations) {
            println!("{line}");
        }
    }

    store.close().await?;
    Ok(())
}
