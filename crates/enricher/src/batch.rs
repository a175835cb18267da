use crate::enricher::{EnrichmentOutcome, EnrichmentSummary, RecordEnricher};
use crate::error::EnrichError;
use core_types::{DataWarning, EventRecord, PriceSeries};
use rayon::prelude::*;

/// One record together with the series a collaborator fetched for it.
///
/// The job owns its series; nothing is shared between jobs.
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub record: EventRecord,
    pub stock_series: Option<PriceSeries>,
    pub token_series: Option<PriceSeries>,
    /// Warnings raised while obtaining the series, prepended to the outcome.
    pub source_warnings: Vec<DataWarning>,
}

impl EnrichmentJob {
    pub fn new(record: EventRecord) -> Self {
        Self {
            record,
            stock_series: None,
            token_series: None,
            source_warnings: Vec::new(),
        }
    }

    pub fn with_stock_series(mut self, series: PriceSeries) -> Self {
        self.stock_series = Some(series);
        self
    }

    pub fn with_token_series(mut self, series: PriceSeries) -> Self {
        self.token_series = Some(series);
        self
    }
}

/// Enriches a batch on at most `worker_limit` threads.
///
/// Outcomes come back in input order. `on_done` is called once per record as
/// it finishes (from worker threads), which is where a progress bar hooks in.
pub fn enrich_batch<F>(
    enricher: &RecordEnricher,
    jobs: Vec<EnrichmentJob>,
    worker_limit: usize,
    on_done: F,
) -> Result<Vec<EnrichmentOutcome>, EnrichError>
where
    F: Fn(&EnrichmentOutcome) + Sync,
{
    if worker_limit == 0 {
        return Err(EnrichError::InvalidWorkerLimit);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_limit)
        .thread_name(|i| format!("enrich-{i}"))
        .build()?;

    let outcomes: Vec<EnrichmentOutcome> = pool.install(|| {
        jobs.into_par_iter()
            .map(|job| {
                let mut outcome = enricher.enrich(
                    job.record,
                    job.stock_series.as_ref(),
                    job.token_series.as_ref(),
                );
                if !job.source_warnings.is_empty() {
                    let mut warnings = job.source_warnings;
                    warnings.append(&mut outcome.warnings);
                    outcome.warnings = warnings;
                }
                on_done(&outcome);
                outcome
            })
            .collect()
    });

    let summary = EnrichmentSummary::from_outcomes(&outcomes);
    tracing::info!(
        records = summary.records,
        ineligible = summary.ineligible,
        default_anchor = summary.default_anchor,
        with_warnings = summary.with_warnings,
        workers = worker_limit,
        "Enrichment batch complete."
    );

    Ok(outcomes)
}
