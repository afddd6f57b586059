use std::path::Path;

use aqualedger_core::models::CatchId;

use crate::commands::common::{format_catch_detail, open_store};
use crate::error::CliError;

pub async fn run_show(id: CatchId, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let record = store.require(id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        for line in format_catch_detail(&record) {
            println!("{line}");
        }
    }

    store.close().await?;
    Ok(())
}
