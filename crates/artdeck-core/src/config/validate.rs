//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const BACKENDS: &[&str] = &["ollama", "openai"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.max_new_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "caption.max_new_tokens must be > 0".into(),
            ));
        }
        if self.caption.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "caption.supported_formats must not be empty".into(),
            ));
        }
        if self.caption.tag_extension == self.caption.caption_extension {
            return Err(ConfigError::ValidationError(
                "caption.tag_extension and caption.caption_extension must differ".into(),
            ));
        }
        if self.harvest.image_version.is_empty() {
            return Err(ConfigError::ValidationError(
                "harvest.image_version must not be empty".into(),
            ));
        }
        if !self.harvest.api_base.starts_with("http://")
            && !self.harvest.api_base.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "harvest.api_base must be an http(s) URL, got '{}'",
                self.harvest.api_base
            )));
        }
        if !BACKENDS.contains(&self.model.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "model.backend must be one of {}, got '{}'",
                BACKENDS.join(", "),
                self.model.backend
            )));
        }
        Ok(())
    }
}
