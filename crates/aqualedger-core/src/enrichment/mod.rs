//! Catch enrichment: free-text parsing and sustainability scoring.
//!
//! An [`Analyzer`] (for example a hosted model) is consulted first; when it
//! fails, the offline parser and heuristic fill in. Enrichment problems are
//! logged and never prevent a catch from being stored.

mod parser;
mod scoring;

use std::future::Future;

use thiserror::Error;

pub use parser::{parse_catch_text, ParsedCatch};
pub use scoring::{local_sustainability, SustainabilityReport};

use crate::db::RecordGuard;
use crate::models::{CatchId, CatchPatch, CatchRecord, Enrichment, NewCatch, ParsingStatus};
use crate::services::RecordStore;
use crate::{Error, Result};

const MAX_ENRICH_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("Analyzer returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// External text/sustainability analysis capability.
pub trait Analyzer: Send + Sync {
    fn parse_text(
        &self,
        text: &str,
    ) -> impl Future<Output = std::result::Result<ParsedCatch, AnalysisError>> + Send;

    fn check_sustainability(
        &self,
        species: &str,
    ) -> impl Future<Output = std::result::Result<SustainabilityReport, AnalysisError>> + Send;
}

/// Analyzer backed only by the offline parser and heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAnalyzer;

impl Analyzer for LocalAnalyzer {
    async fn parse_text(&self, text: &str) -> std::result::Result<ParsedCatch, AnalysisError> {
        Ok(parse_catch_text(text))
    }

    async fn check_sustainability(
        &self,
        species: &str,
    ) -> std::result::Result<SustainabilityReport, AnalysisError> {
        Ok(local_sustainability(species))
    }
}

/// Fills in enrichment fields on stored catches.
pub struct Enricher<A> {
    store: RecordStore,
    analyzer: A,
}

impl<A: Analyzer> Enricher<A> {
    pub const fn new(store: RecordStore, analyzer: A) -> Self {
        Self { store, analyzer }
    }

    /// Create a catch with its sustainability fields already filled in.
    pub async fn create(&self, mut new: NewCatch) -> Result<CatchRecord> {
        let report = self.sustainability(&new.species).await;
        apply_report(&mut new.enrichment, report);
        self.store.create(new).await
    }

    /// Parse a free-text entry and store it.
    ///
    /// Entries without a recognizable weight are stored as `draft` with a
    /// weight of zero for the user to complete.
    pub async fn log_text(&self, text: &str) -> Result<CatchRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("catch text cannot be empty".into()));
        }

        let (parsed, parsing_status) = self.parse(text).await;
        let enrichment = Enrichment {
            parsing_status: Some(parsing_status),
            ai_confidence: Some(parsed.confidence),
            ..Enrichment::default()
        };
        let new = NewCatch::new(parsed.species, parsed.weight.unwrap_or(0.0))
            .with_enrichment(enrichment);
        self.create(new).await
    }

    /// Re-run analysis for a stored catch, optionally re-parsing `text`.
    ///
    /// The result is written as a local change, so it is uploaded on the next
    /// sync and refused while the catch is in conflict. If the catch changes
    /// while the analyzer runs, analysis is repeated against the new values.
    pub async fn enrich(&self, id: CatchId, text: Option<&str>) -> Result<CatchRecord> {
        let text = text.map(str::trim).filter(|text| !text.is_empty());
        let mut attempt = 1;
        loop {
            match self.enrich_once(id, text).await {
                Err(Error::ConcurrentModification(_)) if attempt < MAX_ENRICH_ATTEMPTS => {
                    tracing::debug!("Catch {id} changed during analysis, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn enrich_once(&self, id: CatchId, text: Option<&str>) -> Result<CatchRecord> {
        let record = self.store.require(id).await?;
        let seen = RecordGuard::from(&record);
        let mut enrichment = record.enrichment.clone();

        if let Some(text) = text {
            let (parsed, parsing_status) = self.parse(text).await;
            enrichment.parsing_status = Some(parsing_status);
            enrichment.ai_confidence = Some(parsed.confidence);
        }
        let report = self.sustainability(&record.species).await;
        apply_report(&mut enrichment, report);

        self.store
            .record_local_change_with(id, |current| {
                if RecordGuard::from(current) != seen {
                    return Err(Error::ConcurrentModification(id));
                }
                Ok((CatchPatch::default().enrichment(enrichment), None))
            })
            .await
            .map(|(_, updated)| updated)
    }

    async fn parse(&self, text: &str) -> (ParsedCatch, ParsingStatus) {
        match self.analyzer.parse_text(text).await {
            Ok(parsed) => {
                let status = if parsed.is_draft() {
                    ParsingStatus::Draft
                } else {
                    ParsingStatus::Clean
                };
                (parsed, status)
            }
            Err(error) => {
                tracing::warn!("Text analysis failed, using offline parser: {error}");
                let parsed = parse_catch_text(text);
                let status = if parsed.is_draft() {
                    ParsingStatus::Draft
                } else {
                    ParsingStatus::AiPending
                };
                (parsed, status)
            }
        }
    }

    async fn sustainability(&self, species: &str) -> SustainabilityReport {
        match self.analyzer.check_sustainability(species).await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!("Sustainability check failed for {species}, using heuristic: {error}");
                local_sustainability(species)
            }
        }
    }
}

fn apply_report(enrichment: &mut Enrichment, report: SustainabilityReport) {
    enrichment.score = Some(report.score.min(100));
    enrichment.compliance_warning = Some(report.warning);
    enrichment.compliance_details = report.warning.then(|| report.rationale.clone());
    enrichment.rationale = Some(report.rationale);
}
