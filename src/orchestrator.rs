use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Error;
use crate::evaluation::QualityEvaluator;
use crate::metrics::{MetricsSnapshot, RunMetrics};
use crate::pipeline::{Chain, ItemGenerator, PipelineRunner};
use crate::service::{EmbeddingService, TextService};
use crate::types::BatchReport;

/// Ties one batch together: generation, the translation chain, evaluation.
///
/// Long-lived service handles are injected at construction; the
/// orchestrator never reads ambient configuration mid-run.
pub struct Orchestrator {
    text_service: Arc<dyn TextService>,
    embedder: Arc<dyn EmbeddingService>,
    config: Config,
    metrics: Arc<RunMetrics>,
}

impl Orchestrator {
    pub fn new(
        text_service: Arc<dyn TextService>,
        embedder: Arc<dyn EmbeddingService>,
        config: Config,
    ) -> Self {
        Self {
            text_service,
            embedder,
            config,
            metrics: RunMetrics::new(),
        }
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run one full batch: generate `count` items, drive them through the
    /// English → Spanish → Hebrew → English chain, evaluate the survivors.
    ///
    /// Generation, evaluation, and configuration failures abort the run;
    /// per-item stage failures only shrink it.
    pub async fn run_batch(&self, count: usize) -> Result<BatchReport, Error> {
        self.config.validate()?;
        if count == 0 {
            return Err(Error::Configuration(
                "requested item count must be positive".into(),
            ));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %run_id, count = count, "Starting batch run");

        // Generation is materialized in full before the first stage call, so
        // an under-delivering service aborts the run without spending any
        // transformation quota.
        let generator = ItemGenerator::new(Arc::clone(&self.text_service), &self.config)
            .with_metrics(Arc::clone(&self.metrics));
        let items = generator.generate(count).await?;

        let chain = Chain::english_spanish_hebrew_english(Arc::clone(&self.text_service));
        let runner = PipelineRunner::new(chain)
            .with_stage_timeout(self.config.stage_timeout_secs)
            .with_metrics(Arc::clone(&self.metrics));
        let outcome = runner.run(items).await;

        let evaluator = QualityEvaluator::new(Arc::clone(&self.embedder));
        let evaluation = evaluator.evaluate(&outcome.results).await?;

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            requested: count,
            completed: outcome.results.len(),
            failed: outcome.failed,
            results: outcome.results,
            records: evaluation.records,
            summary: evaluation.summary,
        };

        info!(
            run_id = %run_id,
            completed = report.completed,
            failed = report.failed,
            mean_distance = report.summary.mean,
            "Batch run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::service::TextService;
    use async_trait::async_trait;

    /// Serves both roles: generation requests get the scripted sentence
    /// list, translation requests echo the prompt back.
    struct IdentityPipelineService {
        sentences: Vec<&'static str>,
    }

    #[async_trait]
    impl TextService for IdentityPipelineService {
        async fn complete(&self, role_instruction: &str, prompt: &str) -> Result<String, Error> {
            if role_instruction.contains("sentence generator") {
                Ok(self.sentences.join("\n"))
            } else {
                Ok(prompt.to_string())
            }
        }
    }

    /// Same, except translation fails when the prompt mentions a dog.
    struct DogHatingService {
        sentences: Vec<&'static str>,
    }

    #[async_trait]
    impl TextService for DogHatingService {
        async fn complete(&self, role_instruction: &str, prompt: &str) -> Result<String, Error> {
            if role_instruction.contains("sentence generator") {
                Ok(self.sentences.join("\n"))
            } else if prompt.contains("dog") {
                Err(Error::service("claude", "HTTP 500: internal error"))
            } else {
                Ok(prompt.to_string())
            }
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl crate::service::EmbeddingService for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![1.0f32; 8];
                    for (i, b) in text.bytes().enumerate() {
                        v[i % 8] += b as f32;
                    }
                    v
                })
                .collect())
        }
    }

    fn test_config() -> Config {
        Config::default().with_api_key("sk-test")
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_identity_batch_end_to_end() {
        init_tracing();
        let service = Arc::new(IdentityPipelineService {
            sentences: vec!["A cat sleeps.", "A dog runs.", "A bird flies."],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let report = orchestrator.run_batch(3).await.expect("should run");

        assert_eq!(report.requested, 3);
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed, 0);
        for result in &report.results {
            assert_eq!(result.final_text, result.source.text);
        }
        for record in &report.records {
            assert!(record.distance.abs() < 1e-9);
        }
        assert!(report.summary.mean.abs() < 1e-9);
        assert!(report.summary.variance.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_partial_failure_still_produces_report() {
        let service = Arc::new(DogHatingService {
            sentences: vec!["A cat sleeps.", "A dog runs.", "A bird flies."],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let report = orchestrator.run_batch(3).await.expect("should run");

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        let indices: Vec<usize> = report.results.iter().map(|r| r.source.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.summary.count, 2);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_generation() {
        let service = Arc::new(IdentityPipelineService {
            sentences: vec!["unused"],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), Config::default());

        let err = orchestrator.run_batch(3).await.expect_err("should fail");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_zero_count_is_rejected() {
        let service = Arc::new(IdentityPipelineService {
            sentences: vec!["unused"],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let err = orchestrator.run_batch(0).await.expect_err("should fail");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_all_items_failing_surfaces_evaluation_error() {
        // Every sentence mentions a dog, so every item is dropped and the
        // evaluator sees zero pairs.
        let service = Arc::new(DogHatingService {
            sentences: vec!["A dog runs.", "Another dog barks."],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let err = orchestrator.run_batch(2).await.expect_err("should fail");
        assert!(matches!(err, Error::Evaluation(_)));
    }

    #[tokio::test]
    async fn test_generation_shortfall_aborts_run() {
        // A service that never produces a usable line exhausts the retry
        // budget before any stage call happens.
        let service = Arc::new(IdentityPipelineService { sentences: vec![] });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let err = orchestrator.run_batch(5).await.expect_err("should fail");
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[tokio::test]
    async fn test_report_serializes_for_adapters() {
        let service = Arc::new(IdentityPipelineService {
            sentences: vec!["A cat sleeps.", "A bird flies."],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        let report = orchestrator.run_batch(2).await.expect("should run");
        let json = serde_json::to_value(&report).expect("should serialize");

        assert_eq!(json["requested"], 2);
        assert_eq!(json["summary"]["count"], 2);
        assert!(json["records"].as_array().expect("records array").len() == 2);
    }

    #[tokio::test]
    async fn test_metrics_accumulate_across_run() {
        let service = Arc::new(IdentityPipelineService {
            sentences: vec!["A cat sleeps.", "A bird flies."],
        });
        let orchestrator = Orchestrator::new(service, Arc::new(StubEmbedder), test_config());

        orchestrator.run_batch(2).await.expect("should run");
        let snap = orchestrator.metrics_snapshot();

        assert_eq!(snap.items_generated, 2);
        assert_eq!(snap.items_completed, 2);
        assert_eq!(snap.stage_calls, 6); // 2 items x 3 stages
    }
}
