use std::path::Path;

use aqualedger_core::enrichment::{Enricher, LocalAnalyzer};
use aqualedger_core::models::NewCatch;

use crate::commands::common::{format_weight, open_store};
use crate::error::CliError;

pub async fn run_add(species: &str, weight: f64, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let enricher = Enricher::new(store.clone(), LocalAnalyzer);
    let record = enricher.create(NewCatch::new(species, weight)).await?;

    println!(
        "{} {} {}",
        record.id,
        record.species,
        format_weight(record.weight)
    );
    store.close().await?;
    Ok(())
}
