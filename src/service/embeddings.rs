use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::service::EmbeddingService;

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Hugging Face inference client for sentence-transformers models.
///
/// The feature-extraction pipeline returns one pooled vector per input
/// sentence; the token is optional for public models.
pub struct HfEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [String],
    options: EmbeddingOptions,
}

#[derive(Serialize)]
struct EmbeddingOptions {
    wait_for_model: bool,
}

impl HfEmbeddingClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                Error::service("embeddings", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", HF_INFERENCE_BASE, config.embedding_model),
            api_token: config.hf_api_token.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingService for HfEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        debug!(count = texts.len(), endpoint = %self.endpoint, "Requesting embeddings");

        let body = EmbeddingRequest {
            inputs: texts,
            options: EmbeddingOptions {
                wait_for_model: true,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| Error::service("embeddings", format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::service(
                "embeddings",
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        let vectors: Vec<Vec<f32>> = resp
            .json()
            .await
            .map_err(|e| Error::service("embeddings", format!("failed to parse response: {e}")))?;

        if vectors.len() != texts.len() {
            return Err(Error::service(
                "embeddings",
                format!(
                    "requested {} vectors, received {}",
                    texts.len(),
                    vectors.len()
                ),
            ));
        }

        if let Some(first) = vectors.first() {
            let dim = first.len();
            if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
                return Err(Error::service(
                    "embeddings",
                    "vectors do not share a fixed dimension".to_string(),
                ));
            }
        }

        Ok(vectors)
    }
}
