use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, LocsyncError};

// Default values for gateway configuration
fn default_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory containing the per-language catalog files
    pub dir: PathBuf,
    /// Language tag of the source catalog (e.g. "en")
    pub source_language: String,
    /// Target language tags, synchronized in this order
    pub target_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Translation gateway mode
    pub mode: GatewayMode,
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Per-request timeout in seconds; an expired request is treated as a
    /// failure for that key only
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatewayMode {
    /// Ollama: translate each changed value through an Ollama model
    Ollama,
    /// Passthrough: copy source values unchanged (offline mode)
    Passthrough,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                dir: PathBuf::from("locales"),
                source_language: "en".to_string(),
                target_languages: Vec::new(),
            },
            translate: TranslateConfig {
                mode: GatewayMode::Ollama,
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                timeout_secs: 5,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocsyncError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LocsyncError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LocsyncError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LocsyncError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
