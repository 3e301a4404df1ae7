use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Error;
use crate::service::EmbeddingService;
use crate::types::{EvaluationRecord, EvaluationSummary, PipelineResult};

/// Distance metric applied to each embedded pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    /// 1 minus the cosine similarity. 0 means identical direction, 1 means
    /// orthogonal, values above 1 mean opposed.
    #[default]
    Cosine,
    /// Straight-line distance in embedding space.
    Euclidean,
}

impl DistanceMetric {
    fn compute(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    // A zero-norm vector makes this non-finite; the caller rejects it.
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Per-pair distances plus the aggregate summary.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub records: Vec<EvaluationRecord>,
    pub summary: EvaluationSummary,
}

impl Evaluation {
    pub fn distances(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.distance).collect()
    }
}

/// Scores how much meaning the chain lost, pair by pair.
///
/// Batch, not streaming: the full pair set is embedded at once, sources and
/// finals through the same embedding service so the vectors are comparable.
/// Holds no state between calls.
pub struct QualityEvaluator {
    embedder: Arc<dyn EmbeddingService>,
    metric: DistanceMetric,
}

impl QualityEvaluator {
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub async fn evaluate(&self, pairs: &[PipelineResult]) -> Result<Evaluation, Error> {
        if pairs.is_empty() {
            return Err(Error::Evaluation("no pairs to evaluate".into()));
        }

        let sources: Vec<String> = pairs.iter().map(|p| p.source.text.clone()).collect();
        let finals: Vec<String> = pairs.iter().map(|p| p.final_text.clone()).collect();

        debug!(count = sources.len(), "Embedding source texts");
        let source_vecs = self.embedder.embed(&sources).await?;
        debug!(count = finals.len(), "Embedding final texts");
        let final_vecs = self.embedder.embed(&finals).await?;

        if source_vecs.len() != pairs.len() || final_vecs.len() != pairs.len() {
            return Err(Error::Evaluation(format!(
                "embedding service returned {} source and {} final vectors for {} pairs",
                source_vecs.len(),
                final_vecs.len(),
                pairs.len()
            )));
        }

        let mut distances = Vec::with_capacity(pairs.len());
        for (i, (source_vec, final_vec)) in source_vecs.iter().zip(final_vecs.iter()).enumerate() {
            if source_vec.len() != final_vec.len() {
                return Err(Error::Evaluation(format!(
                    "vector dimension mismatch at index {i}: {} vs {}",
                    source_vec.len(),
                    final_vec.len()
                )));
            }
            let distance = self.metric.compute(source_vec, final_vec);
            if !distance.is_finite() {
                return Err(Error::Evaluation(format!(
                    "non-finite distance at index {i} (unusable embedding vector)"
                )));
            }
            distances.push(distance);
        }

        let summary = summarize(&distances)?;
        let records = pairs
            .iter()
            .zip(distances.iter())
            .map(|(pair, distance)| EvaluationRecord {
                source: pair.source.text.clone(),
                final_text: pair.final_text.clone(),
                distance: *distance,
            })
            .collect();

        info!(
            count = summary.count,
            mean = summary.mean,
            std_dev = summary.std_dev,
            "Evaluation complete"
        );

        Ok(Evaluation { records, summary })
    }
}

/// Population statistics (divide by N, not N-1) over the distance sequence.
fn summarize(distances: &[f64]) -> Result<EvaluationSummary, Error> {
    let count = distances.len();
    if count == 0 {
        return Err(Error::Evaluation("no distances to summarize".into()));
    }

    let n = count as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let max = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(EvaluationSummary {
        count,
        mean,
        variance,
        std_dev,
        min,
        max,
    })
}
