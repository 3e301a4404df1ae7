use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One source sentence with its ordinal position in the batch.
///
/// Items are created by the generator and consumed once by the runner;
/// the text is never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub index: usize,
    pub text: String,
}

impl Item {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// A source item paired with the chain's final output.
///
/// Invariant: `final_text` was produced by passing `source` through every
/// stage of the chain in declared order. Failed items never become results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineResult {
    pub source: Item,
    pub final_text: String,
}

/// Per-pair evaluation output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub source: String,
    pub final_text: String,
    pub distance: f64,
}

/// Aggregate statistics over all per-pair distances.
///
/// Variance and standard deviation use the population formula (divide by N).
/// Never constructed for an empty distance set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Everything one batch run produced, as plain structured data.
///
/// The reporting adapter (JSON/CSV persistence, plotting) consumes this;
/// the core has no file-format or UI coupling.
#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requested: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<PipelineResult>,
    pub records: Vec<EvaluationRecord>,
    pub summary: EvaluationSummary,
}
