use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::service::TextService;

/// One text-to-text transformation with a fixed single responsibility.
///
/// Stages are immutable and stateless; the same stage may serve any number
/// of items. The service response is returned unmodified; the stage does
/// not verify that the output is actually in the target representation.
#[derive(Clone)]
pub struct TranslationStage {
    name: String,
    role_instruction: String,
    service: Arc<dyn TextService>,
}

impl TranslationStage {
    pub fn new(
        name: impl Into<String>,
        role_instruction: impl Into<String>,
        service: Arc<dyn TextService>,
    ) -> Self {
        Self {
            name: name.into(),
            role_instruction: role_instruction.into(),
            service,
        }
    }

    /// Build a translation stage between two named languages.
    pub fn translator(
        service: Arc<dyn TextService>,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        let name = format!(
            "{}-{}",
            source_lang.to_lowercase(),
            target_lang.to_lowercase()
        );
        let role_instruction = format!(
            "You are a translation agent. Your ONLY task is to translate from {source_lang} \
             to {target_lang}. Output ONLY the translated {target_lang} text with no \
             explanations, comments, or additional text whatsoever."
        );
        Self::new(name, role_instruction, service)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role_instruction(&self) -> &str {
        &self.role_instruction
    }

    pub async fn apply(&self, text: &str) -> Result<String, Error> {
        debug!(stage = %self.name, input_len = text.len(), "Applying stage");
        self.service
            .complete(&self.role_instruction, text)
            .await
            .map_err(|e| Error::stage(&self.name, e.to_string()))
    }
}

impl fmt::Debug for TranslationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationStage")
            .field("name", &self.name)
            .finish()
    }
}

/// An ordered sequence of stages, output of one feeding the next.
///
/// Order is significant and fixed for a pipeline run; the chain holds no
/// state beyond its stage list.
#[derive(Clone, Debug)]
pub struct Chain {
    stages: Vec<TranslationStage>,
}

impl Chain {
    pub fn new(stages: Vec<TranslationStage>) -> Self {
        Self { stages }
    }

    /// The canonical three-hop round trip: English → Spanish → Hebrew → English.
    pub fn english_spanish_hebrew_english(service: Arc<dyn TextService>) -> Self {
        Self::new(vec![
            TranslationStage::translator(Arc::clone(&service), "English", "Spanish"),
            TranslationStage::translator(Arc::clone(&service), "Spanish", "Hebrew"),
            TranslationStage::translator(service, "Hebrew", "English"),
        ])
    }

    pub fn stages(&self) -> &[TranslationStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Thread text through every stage in declared order.
    pub async fn apply(&self, text: &str) -> Result<String, Error> {
        let mut current = text.to_string();
        for stage in &self.stages {
            current = stage.apply(&current).await?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoService;

    #[async_trait]
    impl TextService for EchoService {
        async fn complete(&self, _role_instruction: &str, prompt: &str) -> Result<String, Error> {
            Ok(prompt.to_string())
        }
    }

    struct UppercaseService;

    #[async_trait]
    impl TextService for UppercaseService {
        async fn complete(&self, _role_instruction: &str, prompt: &str) -> Result<String, Error> {
            Ok(prompt.to_uppercase())
        }
    }

    struct FailingService;

    #[async_trait]
    impl TextService for FailingService {
        async fn complete(&self, _role_instruction: &str, _prompt: &str) -> Result<String, Error> {
            Err(Error::service("claude", "HTTP 529: overloaded"))
        }
    }

    #[test]
    fn test_translator_stage_instruction() {
        let stage = TranslationStage::translator(Arc::new(EchoService), "English", "Spanish");
        assert_eq!(stage.name(), "english-spanish");
        assert!(stage.role_instruction().contains("translate from English to Spanish"));
        assert!(stage
            .role_instruction()
            .contains("Output ONLY the translated Spanish text"));
    }

    #[test]
    fn test_canonical_chain_order() {
        let chain = Chain::english_spanish_hebrew_english(Arc::new(EchoService));
        let names: Vec<&str> = chain.stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["english-spanish", "spanish-hebrew", "hebrew-english"]
        );
    }

    #[test]
    fn test_stage_apply_returns_raw_response() {
        let stage = TranslationStage::translator(Arc::new(UppercaseService), "English", "Spanish");
        let out = tokio_test::block_on(stage.apply("a cat sleeps")).expect("should apply");
        assert_eq!(out, "A CAT SLEEPS");
    }

    #[test]
    fn test_stage_failure_names_stage() {
        let stage = TranslationStage::translator(Arc::new(FailingService), "Spanish", "Hebrew");
        let err = tokio_test::block_on(stage.apply("un gato")).expect_err("should fail");
        match err {
            Error::Stage { stage, message } => {
                assert_eq!(stage, "spanish-hebrew");
                assert!(message.contains("HTTP 529"));
            }
            other => panic!("expected stage error, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_apply_sequences_stages() {
        let chain = Chain::new(vec![
            TranslationStage::new("upper", "uppercase", Arc::new(UppercaseService)),
            TranslationStage::new("echo", "echo", Arc::new(EchoService)),
        ]);
        let out = tokio_test::block_on(chain.apply("quiet")).expect("should apply");
        assert_eq!(out, "QUIET");
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = Chain::new(Vec::new());
        assert!(chain.is_empty());
        let out = tokio_test::block_on(chain.apply("unchanged")).expect("should apply");
        assert_eq!(out, "unchanged");
    }
}
