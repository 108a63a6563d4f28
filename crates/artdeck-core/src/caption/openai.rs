//! OpenAI-compatible caption backend using the Chat Completions API.
//!
//! Works with hosted APIs and self-hosted servers (vLLM, TGI) that expose
//! `/chat/completions`. The image is sent as a data URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::model::{CaptionModel, CaptionRequest};
use crate::error::{PipelineError, PipelineResult};

/// OpenAI-compatible backend.
pub struct OpenAiCaptioner {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiCaptioner {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            api_key: api_key.map(String::from),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CaptionModel for OpenAiCaptioner {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let models = self.endpoint.replace("/chat/completions", "/models");
        let mut req = self.client.get(&models);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        matches!(req.send().await, Ok(resp) if resp.status().is_success())
    }

    async fn generate(&self, request: &CaptionRequest) -> PipelineResult<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_new_tokens,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                    ChatContent::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| PipelineError::Model {
            message: format!("Chat completions request failed: {e}"),
            status_code: None,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Model {
                message: format!("Chat completions HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| PipelineError::Model {
            message: format!("Failed to parse chat completions response: {e}"),
            status_code: None,
        })?;

        chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| PipelineError::Model {
                message: "Empty choices array, no caption generated".to_string(),
                status_code: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_chat_completions() {
        let captioner = OpenAiCaptioner::new("http://localhost:8000/v1/", None, "blip2");
        assert_eq!(captioner.endpoint, "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_parse_response_content() {
        let json = r#"{"choices":[{"message":{"content":"  a dragon over a castle \n"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref().map(str::trim),
            Some("a dragon over a castle")
        );
    }

    #[test]
    fn test_request_serializes_image_first() {
        let content = vec![
            ChatContent::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAA".to_string(),
                },
            },
            ChatContent::Text {
                text: "caption".to_string(),
            },
        ];
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json[0]["type"], "image_url");
        assert_eq!(json[1]["type"], "text");
    }
}
