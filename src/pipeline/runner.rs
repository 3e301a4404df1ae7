use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::metrics::RunMetrics;
use crate::pipeline::stage::Chain;
use crate::types::{Item, PipelineResult};

const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Drives items through the ordered stage chain.
///
/// A failing item is dropped and logged with its ordinal position; one
/// item's failure never aborts the batch. The emitted result sequence
/// preserves the generation order of surviving items.
pub struct PipelineRunner {
    chain: Chain,
    stage_timeout: Duration,
    max_concurrent: usize,
    metrics: Arc<RunMetrics>,
}

/// Results of one pipeline run plus the per-batch failure diagnostic.
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<PipelineResult>,
    pub failed: usize,
}

impl PipelineRunner {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            metrics: RunMetrics::new(),
        }
    }

    pub fn with_stage_timeout(mut self, timeout_secs: u64) -> Self {
        self.stage_timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Reference sequential path: items are processed one at a time, in
    /// generation order, each threaded through the full chain.
    pub async fn run(&self, items: Vec<Item>) -> RunOutcome {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut failed = 0usize;

        for item in items {
            debug!(item = item.index, of = total, "Processing item");
            match process_item(&self.chain, self.stage_timeout, &self.metrics, &item).await {
                Ok(final_text) => {
                    self.metrics.record_item(true);
                    results.push(PipelineResult {
                        source: item,
                        final_text,
                    });
                }
                Err(e) => {
                    failed += 1;
                    self.metrics.record_item(false);
                    warn!(item = item.index, error = %e, "Item dropped after stage failure");
                }
            }
        }

        info!(
            completed = results.len(),
            failed = failed,
            "Pipeline run complete"
        );
        RunOutcome { results, failed }
    }

    /// Semaphore-bounded fan-out across items. Within an item the chain is
    /// still strictly sequential; handles are awaited in spawn order so the
    /// output re-imposes generation order.
    pub async fn run_concurrent(&self, items: Vec<Item>) -> RunOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let chain = self.chain.clone();
            let sem = Arc::clone(&semaphore);
            let timeout = self.stage_timeout;
            let metrics = Arc::clone(&self.metrics);

            let handle = tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(item = item.index, "Semaphore closed before item was processed");
                        return None;
                    }
                };

                match process_item(&chain, timeout, &metrics, &item).await {
                    Ok(final_text) => Some(PipelineResult {
                        source: item,
                        final_text,
                    }),
                    Err(e) => {
                        warn!(item = item.index, error = %e, "Item dropped after stage failure");
                        None
                    }
                }
            });
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok(Some(result)) => {
                    self.metrics.record_item(true);
                    results.push(result);
                }
                Ok(None) => {
                    failed += 1;
                    self.metrics.record_item(false);
                }
                Err(e) => {
                    failed += 1;
                    self.metrics.record_item(false);
                    warn!(error = %e, "Item task panicked");
                }
            }
        }

        info!(
            completed = results.len(),
            failed = failed,
            "Pipeline run complete"
        );
        RunOutcome { results, failed }
    }
}

/// Thread one item's text through every stage in order. Each external call
/// runs under the stage timeout.
async fn process_item(
    chain: &Chain,
    stage_timeout: Duration,
    metrics: &RunMetrics,
    item: &Item,
) -> Result<String, Error> {
    let mut current = item.text.clone();
    for stage in chain.stages() {
        metrics.record_stage_call();
        current = match tokio::time::timeout(stage_timeout, stage.apply(&current)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::stage(
                    stage.name(),
                    format!("timed out after {}s", stage_timeout.as_secs()),
                ))
            }
        };
    }
    Ok(current)
}
