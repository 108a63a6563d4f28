//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Card harvesting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Path to the Scryfall "Unique Artwork" bulk-data JSON export
    pub cards_path: PathBuf,

    /// Directory receiving `<stem>.jpg` and `<stem>.txt` pairs
    pub output_dir: PathBuf,

    /// Base URL of the card image API
    pub api_base: String,

    /// Image version requested from the API ("art_crop", "large", ...)
    pub image_version: String,

    /// Pause before the resolving request, in milliseconds
    pub resolve_delay_ms: u64,

    /// Pause before the image download request, in milliseconds
    pub fetch_delay_ms: u64,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            cards_path: PathBuf::from("unique-artwork.json"),
            output_dir: PathBuf::from("images"),
            api_base: "https://api.scryfall.com".to_string(),
            image_version: "art_crop".to_string(),
            resolve_delay_ms: 500,
            fetch_delay_ms: 500,
            user_agent: concat!("artdeck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Default image file or directory to caption
    pub img_dir: PathBuf,

    /// Image extensions picked up by discovery (case-insensitive)
    pub supported_formats: Vec<String>,

    /// Generation budget for one caption
    pub max_new_tokens: u32,

    /// Extension of the tag companion written by the harvester
    pub tag_extension: String,

    /// Extension of the caption record
    pub caption_extension: String,

    /// Never place the model on a GPU
    pub force_cpu: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            img_dir: PathBuf::from("output"),
            supported_formats: ["jpg", "png", "jpeg", "bmp", "jfif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_new_tokens: 24,
            tag_extension: "txt".to_string(),
            caption_extension: "yaml".to_string(),
            force_cpu: false,
        }
    }
}

/// Caption model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend identifier ("ollama" or "openai")
    pub backend: String,

    /// Model identifier passed to the backend
    pub model: String,

    /// Instruction sent alongside the image
    pub prompt: String,

    /// Ollama (local) configuration
    pub ollama: OllamaConfig,

    /// OpenAI-compatible endpoint configuration
    pub openai: OpenAiConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            model: "salesforce/blip2-opt-6.7b".to_string(),
            prompt: "Write a short caption describing this image.".to_string(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

/// OpenAI-compatible endpoint configuration (vLLM, TGI, hosted APIs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax, empty for unauthenticated servers)
    pub api_key: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
