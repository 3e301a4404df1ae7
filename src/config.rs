use crate::error::Error;

const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_GENERATION_BATCH_SIZE: usize = 50;
const DEFAULT_GENERATION_MAX_RETRIES: u32 = 3;
const DEFAULT_MIN_WORDS: usize = 10;
const DEFAULT_MAX_WORDS: usize = 20;
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 60;

/// Run configuration. Built once at startup and injected into the
/// components that need it; nothing reads the environment mid-run.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub embedding_model: String,
    pub hf_api_token: Option<String>,
    pub generation_batch_size: usize,
    pub generation_max_retries: u32,
    pub min_words: usize,
    pub max_words: usize,
    pub stage_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("SEMDRIFT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            max_tokens: env_parse("SEMDRIFT_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            embedding_model: std::env::var("SEMDRIFT_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.into()),
            hf_api_token: std::env::var("HF_API_TOKEN").ok(),
            generation_batch_size: env_parse(
                "SEMDRIFT_GENERATION_BATCH_SIZE",
                DEFAULT_GENERATION_BATCH_SIZE,
            ),
            generation_max_retries: env_parse(
                "SEMDRIFT_GENERATION_MAX_RETRIES",
                DEFAULT_GENERATION_MAX_RETRIES,
            ),
            min_words: env_parse("SEMDRIFT_MIN_WORDS", DEFAULT_MIN_WORDS),
            max_words: env_parse("SEMDRIFT_MAX_WORDS", DEFAULT_MAX_WORDS),
            stage_timeout_secs: env_parse("SEMDRIFT_STAGE_TIMEOUT_SECS", DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_word_policy(mut self, min_words: usize, max_words: usize) -> Self {
        self.min_words = min_words;
        self.max_words = max_words;
        self
    }

    pub fn with_generation_batch_size(mut self, size: usize) -> Self {
        self.generation_batch_size = size;
        self
    }

    pub fn with_generation_max_retries(mut self, retries: u32) -> Self {
        self.generation_max_retries = retries;
        self
    }

    pub fn with_stage_timeout(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    /// Validate once at startup. Fatal for the entire run on failure.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Configuration(
                "ANTHROPIC_API_KEY is not set".into(),
            ));
        }
        if self.generation_batch_size == 0 {
            return Err(Error::Configuration(
                "generation batch size must be positive".into(),
            ));
        }
        if self.min_words == 0 || self.min_words > self.max_words {
            return Err(Error::Configuration(format!(
                "invalid word-length policy: {}-{}",
                self.min_words, self.max_words
            )));
        }
        if self.stage_timeout_secs == 0 {
            return Err(Error::Configuration(
                "stage timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            hf_api_token: None,
            generation_batch_size: DEFAULT_GENERATION_BATCH_SIZE,
            generation_max_retries: DEFAULT_GENERATION_MAX_RETRIES,
            min_words: DEFAULT_MIN_WORDS,
            max_words: DEFAULT_MAX_WORDS,
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
