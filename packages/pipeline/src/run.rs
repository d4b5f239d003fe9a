//! End-to-end enrichment run over one dataset.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use prospektor_dataset::{Dataset, ResolvedColumns, apply_results, prepare, records};
use prospektor_lookup::PhoneLookup;
use prospektor_pipeline_models::{EnrichmentResult, Record};

use crate::PipelineError;
use crate::progress::ProgressTracker;
use crate::rate::TokenBucket;
use crate::select::working_set;
use crate::settings::PipelineSettings;
use crate::worker::enrich_row;

/// One enrichment run: a prepared dataset plus its working set.
pub struct PipelineRun {
    dataset: Dataset,
    columns: ResolvedColumns,
    working: Vec<Record>,
    settings: PipelineSettings,
}

impl PipelineRun {
    /// Prepares `dataset` for enrichment and selects the working set.
    ///
    /// # Errors
    ///
    /// Returns an error when the dataset is missing a resolvable company
    /// or person column.
    pub fn new(mut dataset: Dataset, settings: PipelineSettings) -> Result<Self, PipelineError> {
        let columns = prepare(&mut dataset)?;
        let working = working_set(records(&dataset, &columns));
        Ok(Self {
            dataset,
            columns,
            working,
            settings,
        })
    }

    /// Number of records in the working set.
    #[must_use]
    pub fn total(&self) -> usize {
        self.working.len()
    }

    /// Runs every working-set record through lookup and writes the
    /// annotations back, reporting progress per completed row.
    ///
    /// Rows run concurrently up to the configured limit. Completions are
    /// consumed in whatever order they finish and folded back in by row
    /// index. Progress publication failures are logged, not fatal; the
    /// enriched dataset matters more than a missed snapshot.
    pub async fn execute(
        mut self,
        lookup: Arc<dyn PhoneLookup>,
        tracker: &mut ProgressTracker,
    ) -> Result<Dataset, PipelineError> {
        let total = self.working.len();
        log::info!("enriching {total} rows");
        if let Err(err) = tracker.start().await {
            log::warn!("failed to publish initial progress: {err}");
        }

        let bucket = TokenBucket::new(self.settings.rate_budget());
        let row_timeout = self.settings.row_timeout();
        let concurrency = self.settings.concurrency.max(1);

        let mut results: Vec<EnrichmentResult> = Vec::with_capacity(total);
        {
            let bucket = &bucket;
            let lookup = lookup.as_ref();
            let mut completions = stream::iter(self.working.drain(..).map(|record| {
                async move { enrich_row(&record, lookup, bucket, row_timeout).await }
            }))
            .buffer_unordered(concurrency);

            while let Some(result) = completions.next().await {
                if let Err(err) = tracker.record().await {
                    log::warn!("failed to publish progress: {err}");
                }
                results.push(result);
            }
        }

        apply_results(&mut self.dataset, &self.columns, &results);
        log::info!("run complete: {} rows annotated", results.len());
        Ok(self.dataset)
    }
}
