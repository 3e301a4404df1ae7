use thiserror::Error;

/// Error taxonomy for a batch run.
///
/// `Generation`, `Evaluation`, and `Configuration` are batch-fatal.
/// `Stage` is recovered locally by the runner: the failing item is dropped
/// and processing continues with the next item.
#[derive(Debug, Error)]
pub enum Error {
    /// The generation service delivered fewer usable items than requested
    /// after the retry budget was exhausted.
    #[error(
        "generation delivered {delivered} of {requested} items after {attempts} failed attempts"
    )]
    Generation {
        requested: usize,
        delivered: usize,
        attempts: u32,
    },

    /// A single stage call failed for one item.
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// The evaluator was given zero pairs, or the embedding service violated
    /// its contract (count mismatch, unusable vectors).
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Required configuration is missing or invalid. Detected at startup,
    /// before any item is generated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport or protocol failure from an external service.
    #[error("{service} request failed: {message}")]
    Service { service: String, message: String },
}

impl Error {
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = Error::Generation {
            requested: 100,
            delivered: 42,
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "generation delivered 42 of 100 items after 3 failed attempts"
        );
    }

    #[test]
    fn test_stage_error_display() {
        let err = Error::stage("english-spanish", "connection reset");
        assert_eq!(
            err.to_string(),
            "stage 'english-spanish' failed: connection reset"
        );
    }

    #[test]
    fn test_service_error_display() {
        let err = Error::service("claude", "HTTP 429: rate limited");
        assert_eq!(err.to_string(), "claude request failed: HTTP 429: rate limited");
    }
}
