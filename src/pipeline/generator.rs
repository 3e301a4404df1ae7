use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::metrics::RunMetrics;
use crate::service::TextService;
use crate::types::Item;

const STREAM_BUFFER: usize = 16;

/// Produces the batch of source sentences that seed the pipeline.
///
/// Items come from the text service in batches no larger than the
/// configured batch size; blank lines are discarded and over-delivery is
/// truncated, so the delivered count always equals the request exactly.
/// The produced sequence is forward-only and not restartable; a second
/// call is a fresh request and may yield different text.
#[derive(Clone)]
pub struct ItemGenerator {
    service: Arc<dyn TextService>,
    role_instruction: String,
    batch_size: usize,
    max_retries: u32,
    min_words: usize,
    max_words: usize,
    metrics: Arc<RunMetrics>,
}

impl ItemGenerator {
    pub fn new(service: Arc<dyn TextService>, config: &Config) -> Self {
        let role_instruction = format!(
            "You are a creative sentence generator. Generate diverse, grammatically correct \
             English sentences inspired by the themes, style, and tone of Isaac Asimov's \
             'Foundation' series. Each sentence must be between {}-{} words long. Output ONLY \
             the sentences, one per line, with no numbering, explanations, or additional text.",
            config.min_words, config.max_words
        );
        Self {
            service,
            role_instruction,
            batch_size: config.generation_batch_size,
            max_retries: config.generation_max_retries,
            min_words: config.min_words,
            max_words: config.max_words,
            metrics: RunMetrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Generate exactly `count` items, or fail with a generation error.
    ///
    /// Never returns a short sequence: downstream pairing depends on the
    /// delivered count matching the request.
    pub async fn generate(&self, count: usize) -> Result<Vec<Item>, Error> {
        let mut items = Vec::with_capacity(count);
        let mut stream = self.stream(count);
        while let Some(item) = stream.next().await {
            items.push(item?);
        }
        info!(count = items.len(), "Generation complete");
        Ok(items)
    }

    /// Lazy, forward-only form of [`generate`](Self::generate).
    ///
    /// Items are yielded as each service batch arrives, so a consumer may
    /// begin processing item 1 before item N exists. A terminal
    /// `Err(Error::Generation { .. })` is yielded if the retry budget runs
    /// out before `count` items were delivered.
    pub fn stream(&self, count: usize) -> ReceiverStream<Result<Item, Error>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let generator = self.clone();

        tokio::spawn(async move {
            let mut delivered = 0usize;
            let mut failed_attempts = 0u32;

            while delivered < count {
                let remaining = count - delivered;
                let want = remaining.min(generator.batch_size);
                let lines = generator.fetch_batch(want).await;

                if lines.is_empty() {
                    failed_attempts += 1;
                    if failed_attempts > generator.max_retries {
                        let _ = tx
                            .send(Err(Error::Generation {
                                requested: count,
                                delivered,
                                attempts: failed_attempts,
                            }))
                            .await;
                        return;
                    }
                    warn!(
                        attempt = failed_attempts,
                        max_retries = generator.max_retries,
                        delivered = delivered,
                        requested = count,
                        "Generation batch yielded no usable lines, retrying"
                    );
                    continue;
                }

                failed_attempts = 0;
                generator.metrics.record_generated(lines.len().min(remaining));
                for text in lines.into_iter().take(remaining) {
                    if tx.send(Ok(Item::new(delivered, text))).await.is_err() {
                        // Receiver dropped; the sequence is forward-only and
                        // cannot be resumed, so stop requesting.
                        return;
                    }
                    delivered += 1;
                }
            }
        });

        ReceiverStream::new(rx)
    }

    async fn fetch_batch(&self, want: usize) -> Vec<String> {
        let request = format!(
            "Generate exactly {want} diverse English sentences inspired by 'Foundation' by \
             Isaac Asimov. Each sentence must be between {}-{} words.",
            self.min_words, self.max_words
        );

        self.metrics.record_generation_request();
        debug!(want = want, "Requesting generation batch");

        match self.service.complete(&self.role_instruction, &request).await {
            Ok(response) => response
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Generation batch request failed");
                Vec::new()
            }
        }
    }
}
