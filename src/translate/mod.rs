// Translation gateway
//
// The synchronizer consumes translation as an injected capability with a
// single method. Implementations are selected through a factory:
// - Ollama: translate each changed value through an Ollama model
// - Passthrough: copy source values unchanged (offline mode)

pub mod ollama;
pub mod passthrough;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::config::{GatewayMode, TranslateConfig};
use crate::error::Result;

/// A single text translation between two languages. Implementations may fail
/// with timeouts or transport errors; callers treat any failure as "use the
/// original text" and never propagate it as fatal.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator based on the configured gateway mode
    pub fn create(config: &TranslateConfig) -> Box<dyn Translator> {
        match config.mode {
            GatewayMode::Ollama => Box::new(ollama::OllamaTranslator::new(config.clone())),
            GatewayMode::Passthrough => Box::new(passthrough::PassthroughTranslator),
        }
    }
}

/// Check if Ollama is available and the model is loaded
pub async fn check_ollama_availability(endpoint: &str, model: &str) -> Result<()> {
    ollama::check_availability(endpoint, model).await
}
