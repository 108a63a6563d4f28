//! Ollama caption backend for local vision models.
//!
//! Talks to a local Ollama instance via its HTTP API.
//! No authentication; it only needs Ollama running locally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::device::{DeviceSelection, Precision};
use super::model::{CaptionModel, CaptionRequest};
use crate::error::{PipelineError, PipelineResult};

/// Ollama backend for local vision model inference.
pub struct OllamaCaptioner {
    endpoint: String,
    model: String,
    device: DeviceSelection,
    client: reqwest::Client,
}

impl OllamaCaptioner {
    pub fn new(endpoint: &str, model: &str, device: DeviceSelection) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            device,
            client: reqwest::Client::new(),
        }
    }

    fn options(&self, max_new_tokens: u32) -> OllamaOptions {
        OllamaOptions {
            temperature: 0.0,
            num_predict: max_new_tokens,
            num_gpu: if self.device.is_gpu() { None } else { Some(0) },
            f16_kv: self.device.precision == Precision::Half,
        }
    }
}

/// Ollama /api/generate request body.
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    /// Layers offloaded to the GPU; 0 keeps the model on the CPU
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<u32>,
    f16_kv: bool,
}

/// Ollama /api/generate response.
#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Ollama /api/tags response: the locally installed models.
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Deserialize)]
struct InstalledModel {
    name: String,
}

impl TagsResponse {
    /// Whether `model` is installed. A name without a tag matches `:latest`.
    fn serves(&self, model: &str) -> bool {
        let wanted = if model.contains(':') {
            model.to_string()
        } else {
            format!("{model}:latest")
        };
        self.models
            .iter()
            .any(|installed| installed.name == model || installed.name == wanted)
    }
}

#[async_trait]
impl CaptionModel for OllamaCaptioner {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        let resp = match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!("Ollama health check returned HTTP {}", resp.status());
                return false;
            }
            Err(e) => {
                tracing::debug!("Ollama unreachable at {}: {e}", self.endpoint);
                return false;
            }
        };

        match resp.json::<TagsResponse>().await {
            Ok(tags) if tags.serves(&self.model) => true,
            Ok(_) => {
                tracing::debug!("Ollama at {} has no model '{}'", self.endpoint, self.model);
                false
            }
            Err(e) => {
                tracing::debug!("Unreadable Ollama model list: {e}");
                false
            }
        }
    }

    async fn generate(&self, request: &CaptionRequest) -> PipelineResult<String> {
        let url = format!("{}/api/generate", self.endpoint);

        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            images: vec![request.image.data.clone()],
            stream: false,
            options: self.options(request.max_new_tokens),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Model {
                message: format!("Ollama request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Model {
                message: format!("Ollama HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let ollama_resp: OllamaResponse =
            resp.json().await.map_err(|e| PipelineError::Model {
                message: format!("Failed to parse Ollama response: {e}"),
                status_code: None,
            })?;

        Ok(ollama_resp.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_selection_disables_gpu_offload() {
        let captioner = OllamaCaptioner::new(
            "http://localhost:11434/",
            "llava",
            DeviceSelection::select(true, true),
        );
        let json = serde_json::to_value(captioner.options(24)).unwrap();
        assert_eq!(json["num_gpu"], 0);
        assert_eq!(json["f16_kv"], false);
        assert_eq!(json["num_predict"], 24);
        assert_eq!(captioner.endpoint, "http://localhost:11434");
    }

    fn tags(json: &str) -> TagsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_model_list_matches_exact_and_latest_names() {
        let installed = tags(r#"{"models":[{"name":"llava:latest"},{"name":"moondream:1.8b"}]}"#);
        assert!(installed.serves("llava"));
        assert!(installed.serves("llava:latest"));
        assert!(installed.serves("moondream:1.8b"));
        assert!(!installed.serves("moondream"));
    }

    #[test]
    fn test_model_list_without_requested_model() {
        let installed = tags(r#"{"models":[{"name":"llava:latest"}]}"#);
        assert!(!installed.serves("salesforce/blip2-opt-6.7b"));
        assert!(!tags("{}").serves("llava"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let captioner = OllamaCaptioner::new(
            "http://127.0.0.1:9",
            "llava",
            DeviceSelection::select(true, false),
        );
        assert!(!captioner.is_available().await);
    }

    #[test]
    fn test_gpu_selection_uses_half_precision() {
        let captioner =
            OllamaCaptioner::new("http://localhost:11434", "llava", DeviceSelection::select(false, true));
        let json = serde_json::to_value(captioner.options(24)).unwrap();
        assert!(json.get("num_gpu").is_none());
        assert_eq!(json["f16_kv"], true);
    }
}
