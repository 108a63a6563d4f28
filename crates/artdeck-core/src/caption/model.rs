//! Caption model trait and request types.
//!
//! Defines the interface every captioning backend implements, plus the
//! factory that builds the configured backend once per run.

use async_trait::async_trait;
use base64::Engine;
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

use super::device::DeviceSelection;
use crate::config::ModelConfig;
use crate::error::{PipelineError, PipelineResult};

/// Base64-encoded image ready to send to a model backend.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Encode bytes already in a format the backends accept.
    pub fn from_bytes(bytes: &[u8], format: ImageFormat) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: format.to_mime_type().to_string(),
        }
    }

    /// Load and decode an image file.
    ///
    /// JPEG, PNG and WebP are passed through untouched; anything else the
    /// `image` crate can read (BMP, ...) is re-encoded as PNG.
    pub async fn load(path: &Path) -> PipelineResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        let path_owned = path.to_path_buf();

        tokio::task::spawn_blocking(move || Self::from_file_bytes(bytes, &path_owned))
            .await
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            })?
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn from_file_bytes(bytes: Vec<u8>, path: &Path) -> PipelineResult<Self> {
        let decode_error = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let format = image::guess_format(&bytes)
            .map_err(|e| decode_error(format!("Cannot detect image format: {e}")))?;
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| decode_error(e.to_string()))?;

        match format {
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => {
                Ok(Self::from_bytes(&bytes, format))
            }
            other => {
                tracing::debug!("Re-encoding {:?} image {:?} as PNG", other, path);
                let mut png = Vec::new();
                image
                    .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                    .map_err(|e| decode_error(format!("PNG re-encode failed: {e}")))?;
                Ok(Self::from_bytes(&png, ImageFormat::Png))
            }
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request for one caption.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// The image to caption
    pub image: ImageInput,
    /// Instruction for chat-style backends
    pub prompt: String,
    /// Generation budget
    pub max_new_tokens: u32,
}

/// Trait that all caption backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CaptionModel>` for dynamic dispatch).
#[async_trait]
pub trait CaptionModel: Send + Sync {
    /// Backend name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Model identifier served by the backend.
    fn model(&self) -> &str;

    /// Check whether the backend is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate one short caption. The returned text is trimmed.
    async fn generate(&self, request: &CaptionRequest) -> PipelineResult<String>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured backend.
pub struct CaptionModelFactory;

impl CaptionModelFactory {
    /// Create a caption model from config and the selected device.
    ///
    /// `config.backend` picks the backend ("ollama" or "openai");
    /// `config.model` is the model identifier it serves.
    pub fn create(
        config: &ModelConfig,
        device: DeviceSelection,
    ) -> PipelineResult<Box<dyn CaptionModel>> {
        match config.backend.as_str() {
            "ollama" => Ok(Box::new(super::ollama::OllamaCaptioner::new(
                &config.ollama.endpoint,
                &config.model,
                device,
            ))),
            "openai" => {
                let api_key = resolve_env_var(&config.openai.api_key);
                if api_key.is_none() {
                    tracing::debug!("No API key for OpenAI-compatible endpoint, sending none");
                }
                Ok(Box::new(super::openai::OpenAiCaptioner::new(
                    &config.openai.endpoint,
                    api_key.as_deref(),
                    &config.model,
                )))
            }
            other => Err(PipelineError::Model {
                message: format!("Unknown caption backend: {other}"),
                status_code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(path: &Path) {
        image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg);
        assert_eq!(input.media_type, "image/jpeg");
        assert!(!input.data.is_empty());
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], ImageFormat::Png);
        assert!(input.data_url().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_load_passes_png_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_image(&path);

        let input = ImageInput::load(&path).await.unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode(std::fs::read(&path).unwrap());
        assert_eq!(input.media_type, "image/png");
        assert_eq!(input.data, expected);
    }

    #[tokio::test]
    async fn test_load_reencodes_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bmp");
        write_image(&path);

        let input = ImageInput::load(&path).await.unwrap();
        assert_eq!(input.media_type, "image/png");
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = ImageInput::load(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_builds_configured_backend() {
        let device = DeviceSelection::select(true, false);
        let mut config = ModelConfig::default();

        let model = CaptionModelFactory::create(&config, device).unwrap();
        assert_eq!(model.name(), "ollama");
        assert_eq!(model.model(), "salesforce/blip2-opt-6.7b");

        config.backend = "openai".to_string();
        config.model = "blip2".to_string();
        let model = CaptionModelFactory::create(&config, device).unwrap();
        assert_eq!(model.name(), "openai");
        assert_eq!(model.model(), "blip2");
    }

    #[test]
    fn test_factory_rejects_unknown_backend() {
        let config = ModelConfig {
            backend: "torch".to_string(),
            ..ModelConfig::default()
        };
        let result = CaptionModelFactory::create(&config, DeviceSelection::select(false, false));
        assert!(matches!(result, Err(PipelineError::Model { .. })));
    }
}
