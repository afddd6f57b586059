use std::path::Path;

use aqualedger_core::enrichment::{Enricher, LocalAnalyzer};
use aqualedger_core::models::ParsingStatus;

use crate::commands::common::{format_weight, normalize_text, open_store};
use crate::error::CliError;

pub async fn run_log(text_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let text = normalize_text(text_parts).ok_or(CliError::EmptyText)?;

    let store = open_store(db_path).await?;
    let enricher = Enricher::new(store.clone(), LocalAnalyzer);
    let record = enricher.log_text(&text).await?;

    println!(
        "{} {} {}",
        record.id,
        record.species,
        format_weight(record.weight)
    );
    if record.enrichment.parsing_status == Some(ParsingStatus::Draft) {
        eprintln!("No weight recognized; saved as a draft for review.");
    }
    store.close().await?;
    Ok(())
}
