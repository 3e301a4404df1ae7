pub mod evaluator;

pub use evaluator::{DistanceMetric, Evaluation, QualityEvaluator};
