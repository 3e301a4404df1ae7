use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::service::TextService;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Messages API client. One long-lived instance is shared by every stage
/// and the generator; construction fails without an API key.
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Configuration("ANTHROPIC_API_KEY is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::service("claude", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[async_trait]
impl TextService for ClaudeClient {
    async fn complete(&self, role_instruction: &str, prompt: &str) -> Result<String, Error> {
        debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending messages request"
        );

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: role_instruction,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::service("claude", format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::service(
                "claude",
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    truncate_chars(&body, MAX_ERROR_BODY_CHARS)
                ),
            ));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| Error::service("claude", format!("failed to parse response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::service("claude", "empty completion".to_string()));
        }

        Ok(text)
    }
}
